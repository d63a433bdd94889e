//! Recognizer backed by an external speech-to-text command.
//!
//! The command runs through the platform shell. Each non-empty stdout line
//! is a hypothesis; the last one is the final result once the process exits
//! successfully. Works with any wrapper that prints text, e.g. a
//! `whisper.cpp` stream script.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::warn;

use super::{RecognitionError, RecognitionEvent, SpeechRecognizer};

pub struct CommandRecognizer {
    command: String,
}

impl CommandRecognizer {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }

    fn shell(&self) -> Command {
        if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", &self.command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &self.command]);
            c
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for CommandRecognizer {
    fn is_available(&self) -> bool {
        !self.command.trim().is_empty()
    }

    /// Device access belongs to the external command; a refusal there
    /// surfaces as a failed exit status.
    fn has_microphone_permission(&self) -> bool {
        true
    }

    async fn recognize(&self, events: mpsc::UnboundedSender<RecognitionEvent>) -> Result<(), RecognitionError> {
        let mut child = self
            .shell()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(error = %e, command = %self.command, "stt command failed to spawn");
                RecognitionError::Client
            })?;
        let _ = events.send(RecognitionEvent::ReadyForSpeech);

        let stdout = child.stdout.take().ok_or(RecognitionError::Client)?;
        let mut lines = BufReader::new(stdout).lines();
        let mut last: Option<String> = None;
        while let Some(line) = lines.next_line().await.map_err(|_| RecognitionError::Audio)? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if last.is_none() {
                let _ = events.send(RecognitionEvent::BeginningOfSpeech);
            }
            let _ = events.send(RecognitionEvent::Partial(line.to_string()));
            last = Some(line.to_string());
        }

        let status = child.wait().await.map_err(|_| RecognitionError::Client)?;
        if last.is_some() {
            let _ = events.send(RecognitionEvent::EndOfSpeech);
        }
        if !status.success() {
            warn!(code = ?status.code(), "stt command exited unsuccessfully");
            return Err(RecognitionError::Client);
        }

        let text = last.ok_or(RecognitionError::NoMatch)?;
        let _ = events.send(RecognitionEvent::Results(vec![text]));
        Ok(())
    }
}

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;
