//! Microphone input through cpal, delivering fixed-size 16 kHz mono i16 blocks.
//!
//! Devices rarely offer exactly the recognizer's format, so the stream is
//! opened with the best supported configuration and converted on the reading
//! side: first channel only, resampled, then re-chunked.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::error::AdapterError;
use crate::services::audio::{extract_channel, f32_to_i16, BlockChunker, MonoResampler};
use crate::services::stt::{AudioSource, SourceFactory};
use crate::types::AudioFormat;

const ADAPTER: &str = "microphone";

/// No samples for this long means the device has stalled
const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Live capture from the default input device. The stream stops when this
/// value is dropped.
pub struct MicrophoneSource {
    _stream: cpal::Stream,
    samples: Receiver<Vec<f32>>,
    resampler: MonoResampler,
    chunker: BlockChunker,
}

impl MicrophoneSource {
    pub fn open(format: AudioFormat) -> Result<Self, AdapterError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AdapterError::unavailable(ADAPTER, "no default input device found"))?;
        log::info!("🎤 Using input device: {:?}", device.name());

        let (config, sample_format) = find_best_config(&device, format.sample_rate)?;
        let (tx, samples) = crossbeam_channel::unbounded();
        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, tx)?,
            SampleFormat::F32 => build_stream::<f32>(&device, &config, tx)?,
            other => {
                return Err(AdapterError::unavailable(
                    ADAPTER,
                    format!("unsupported sample format {:?}", other),
                ))
            }
        };
        stream
            .play()
            .map_err(|e| AdapterError::unavailable(ADAPTER, e.to_string()))?;

        log::info!(
            "🎤 Audio capture configured: {:?} {} channel(s) @ {}Hz, delivering {}Hz mono in {} sample blocks",
            sample_format,
            config.channels,
            config.sample_rate.0,
            format.sample_rate,
            format.block_size
        );

        Ok(Self {
            _stream: stream,
            samples,
            resampler: MonoResampler::new(config.sample_rate.0, format.sample_rate)?,
            chunker: BlockChunker::new(format.block_size),
        })
    }

    /// Factory suitable for `VoiceCapture`
    pub fn factory() -> SourceFactory {
        Box::new(
            |format: AudioFormat| -> Result<Box<dyn AudioSource>, AdapterError> {
                Ok(Box::new(MicrophoneSource::open(format)?))
            },
        )
    }
}

impl AudioSource for MicrophoneSource {
    fn read_block(&mut self) -> Result<Option<Vec<i16>>, AdapterError> {
        loop {
            if let Some(block) = self.chunker.next_block() {
                return Ok(Some(block));
            }
            match self.samples.recv_timeout(READ_TIMEOUT) {
                Ok(data) => {
                    let resampled = self.resampler.process(&data)?;
                    self.chunker.push(&f32_to_i16(&resampled));
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(AdapterError::invocation(
                        ADAPTER,
                        format!("no audio received for {:?}", READ_TIMEOUT),
                    ))
                }
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

/// Pick a supported input configuration: the target rate if the device has
/// it, otherwise 48kHz or 44.1kHz for resampling. i16 is preferred over f32.
fn find_best_config(
    device: &Device,
    target_rate: u32,
) -> Result<(StreamConfig, SampleFormat), AdapterError> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| AdapterError::unavailable(ADAPTER, format!("failed to get configs: {}", e)))?;

    let mut best = None;
    let mut best_score = 0i32;
    let mut seen = Vec::new();
    for candidate in supported {
        let min_rate = candidate.min_sample_rate().0;
        let max_rate = candidate.max_sample_rate().0;
        let sample_format = candidate.sample_format();
        seen.push(format!(
            "{:?} {}ch {}-{}Hz",
            sample_format,
            candidate.channels(),
            min_rate,
            max_rate
        ));

        let mut score = match sample_format {
            SampleFormat::I16 => 50,
            SampleFormat::F32 => 25,
            _ => continue,
        };
        let rate = if (min_rate..=max_rate).contains(&target_rate) {
            score += 1000;
            target_rate
        } else if (min_rate..=max_rate).contains(&48000) {
            score += 500;
            48000
        } else if (min_rate..=max_rate).contains(&44100) {
            score += 400;
            44100
        } else {
            continue;
        };
        if candidate.channels() == 1 {
            score += 10;
        }

        if score > best_score {
            best_score = score;
            best = Some(candidate.with_sample_rate(cpal::SampleRate(rate)));
        }
    }

    log::debug!("Available input configurations: {}", seen.join(", "));
    let best = best.ok_or_else(|| {
        AdapterError::unavailable(
            ADAPTER,
            format!("no usable input configuration among: {}", seen.join(", ")),
        )
    })?;
    Ok((best.config(), best.sample_format()))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    tx: Sender<Vec<f32>>,
) -> Result<cpal::Stream, AdapterError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
                // Receiver gone means the capture finished
                let _ = tx.send(extract_channel(&converted, channels, 0));
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AdapterError::unavailable(ADAPTER, e.to_string()))
}
