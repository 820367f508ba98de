//! Terminal chat front end.
//!
//! Owns the conversation log and renders it. Input lines arrive over a
//! channel from a reader thread; turns are handed to the [`TurnWorker`].

use std::io::Write;

use crossbeam_channel::{select, Receiver};

use crate::conversation::{render_bubble, ConversationLog};
use crate::error::{AssistantError, Result};
use crate::worker::{Job, TurnWorker, WorkerEvent};

pub const BUSY_NOTICE: &str = "Alfred is still working on the last request, one moment.";
pub const VOICE_DISABLED_NOTICE: &str = "Voice input is not available.";

const HELP: &str = "Type a message and press Enter.\n  /listen  speak instead of typing\n  /help    show this help\n  /quit    exit\n";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Listen,
    Help,
    Quit,
    Nothing,
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" => Command::Nothing,
        "/listen" | "/voice" => Command::Listen,
        "/help" | "/?" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        text => Command::Say(text.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Frontend<W: Write> {
    out: W,
    log: ConversationLog,
    voice_enabled: bool,
}

impl<W: Write> Frontend<W> {
    pub fn new(out: W, voice_enabled: bool) -> Self {
        Self {
            out,
            log: ConversationLog::new(),
            voice_enabled,
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Main loop: interleave user input and worker events until the user
    /// quits or input ends.
    pub fn run(&mut self, worker: &TurnWorker, input: Receiver<String>) -> Result<()> {
        self.print_prompt()?;
        loop {
            let flow = select! {
                recv(input) -> line => match line {
                    Ok(line) => self.handle_input(&line, worker)?,
                    Err(_) => {
                        log::info!("Input closed");
                        Flow::Quit
                    }
                },
                recv(worker.events()) -> event => match event {
                    Ok(event) => {
                        self.handle_event(event)?;
                        Flow::Continue
                    }
                    Err(_) => {
                        log::error!("Turn worker stopped unexpectedly");
                        return Err(AssistantError::WorkerGone);
                    }
                },
            };
            if flow == Flow::Quit {
                break;
            }
        }
        writeln!(self.out, "Goodbye!")?;
        Ok(())
    }

    pub fn handle_input(&mut self, line: &str, worker: &TurnWorker) -> Result<Flow> {
        let job = match parse_command(line) {
            Command::Nothing => return Ok(Flow::Continue),
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                write!(self.out, "{}", HELP)?;
                self.print_prompt()?;
                return Ok(Flow::Continue);
            }
            Command::Listen if !self.voice_enabled => {
                self.notice(VOICE_DISABLED_NOTICE)?;
                self.print_prompt()?;
                return Ok(Flow::Continue);
            }
            Command::Listen => Job::Listen,
            Command::Say(text) => Job::Text(text),
        };

        match worker.submit(job) {
            Ok(()) => Ok(Flow::Continue),
            Err(AssistantError::Busy) => {
                self.notice(BUSY_NOTICE)?;
                Ok(Flow::Continue)
            }
            Err(e) => Err(e),
        }
    }

    pub fn handle_event(&mut self, event: WorkerEvent) -> Result<()> {
        match event {
            WorkerEvent::Record(record) => {
                let record = self.log.append(record);
                write!(self.out, "{}", render_bubble(record))?;
                writeln!(self.out)?;
            }
            WorkerEvent::Notice(text) => self.notice(&text)?,
            WorkerEvent::Finished { .. } => self.print_prompt()?,
        }
        self.out.flush()?;
        Ok(())
    }

    fn notice(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "  ({})", text)?;
        self.out.flush()?;
        Ok(())
    }

    fn print_prompt(&mut self) -> Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  "), Command::Nothing);
        assert_eq!(parse_command("/listen"), Command::Listen);
        assert_eq!(parse_command("/quit\n"), Command::Quit);
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(
            parse_command("  what time is it \n"),
            Command::Say("what time is it".to_string())
        );
    }
}
