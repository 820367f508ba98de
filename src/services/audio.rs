//! Sample conversion between what an input device delivers and what the
//! recognizer expects: channel extraction, resampling and fixed-size blocks.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::AdapterError;

const ADAPTER: &str = "audio conversion";

/// Frames handed to the resampler per call
const RESAMPLER_CHUNK_SIZE: usize = 1024;

/// Keep only `channel` from interleaved frames
pub fn extract_channel(data: &[f32], channels: usize, channel: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .filter_map(|frame| frame.get(channel).copied())
        .collect()
}

pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Mono sample rate converter; a passthrough when the rates already match
pub struct MonoResampler {
    resampler: Option<SincFixedIn<f32>>,
    input: Vec<f32>,
}

impl MonoResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self, AdapterError> {
        if input_rate == output_rate {
            return Ok(Self {
                resampler: None,
                input: Vec::new(),
            });
        }

        log::info!(
            "🔄 Resampling microphone input from {}Hz to {}Hz",
            input_rate,
            output_rate
        );
        let params = SincInterpolationParameters {
            sinc_len: 32,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        };
        let resampler = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            2.0,
            params,
            RESAMPLER_CHUNK_SIZE,
            1,
        )
        .map_err(|e| {
            AdapterError::unavailable(ADAPTER, format!("failed to create resampler: {}", e))
        })?;

        Ok(Self {
            resampler: Some(resampler),
            input: Vec::with_capacity(RESAMPLER_CHUNK_SIZE * 2),
        })
    }

    /// Feed samples; returns whatever output is ready. Input that does not yet
    /// fill a resampler chunk is kept for the next call.
    pub fn process(&mut self, samples: &[f32]) -> Result<Vec<f32>, AdapterError> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(samples.to_vec());
        };

        self.input.extend_from_slice(samples);
        let mut output = Vec::new();
        while self.input.len() >= resampler.input_frames_next() {
            let needed = resampler.input_frames_next();
            let chunk: Vec<f32> = self.input.drain(..needed).collect();
            let mut resampled = resampler
                .process(&[chunk], None)
                .map_err(|e| AdapterError::invocation(ADAPTER, e.to_string()))?;
            if let Some(channel) = resampled.pop() {
                output.extend(channel);
            }
        }
        Ok(output)
    }
}

/// Re-chunks a sample stream into blocks of exactly `block_size`
#[derive(Debug, Clone)]
pub struct BlockChunker {
    pending: Vec<i16>,
    block_size: usize,
}

impl BlockChunker {
    pub fn new(block_size: usize) -> Self {
        Self {
            pending: Vec::with_capacity(block_size * 2),
            block_size,
        }
    }

    pub fn push(&mut self, samples: &[i16]) {
        self.pending.extend_from_slice(samples);
    }

    /// Next full block, if enough samples have arrived
    pub fn next_block(&mut self) -> Option<Vec<i16>> {
        if self.pending.len() < self.block_size {
            return None;
        }
        let rest = self.pending.split_off(self.block_size);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
