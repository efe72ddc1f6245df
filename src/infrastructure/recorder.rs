//! Microphone capture through an external recording command.

use crate::config::Settings;
use crate::core::traits::{AudioRecorder, Recording};
use crate::error::RecorderError;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, info};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Runs a capture command (e.g. `arecord ... -`) and buffers whatever it writes to stdout.
pub struct CommandRecorder {
    command: String,
}

#[injectable(AudioRecorder)]
impl CommandRecorder {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> CommandRecorder {
        CommandRecorder::new(settings.record_command.clone())
    }
}

impl CommandRecorder {
    pub fn new(command: impl Into<String>) -> Self {
        CommandRecorder {
            command: command.into(),
        }
    }
}

pub struct CommandRecording {
    child: Child,
    reader: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

#[async_trait]
impl AudioRecorder for CommandRecorder {
    async fn start(&self) -> Result<Box<dyn Recording>, RecorderError> {
        let parts: Vec<&str> = self.command.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return Err(RecorderError::Unavailable(
                "no recording command configured".to_owned(),
            ));
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => RecorderError::PermissionDenied(e.to_string()),
                _ => RecorderError::Unavailable(format!("{program}: {e}")),
            })?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(RecorderError::Unavailable(
                "capture command has no stdout".to_owned(),
            ));
        };

        let reader = tokio::spawn(async move {
            let mut audio = Vec::new();
            stdout.read_to_end(&mut audio).await?;
            Ok::<_, std::io::Error>(audio)
        });
        info!("started capture with {program}");

        Ok(Box::new(CommandRecording {
            child,
            reader: Some(reader),
        }))
    }
}

#[async_trait]
impl Recording for CommandRecording {
    async fn stop(&mut self) -> Result<Vec<u8>, RecorderError> {
        if let Err(e) = self.child.start_kill() {
            debug!("capture process already exited: {e}");
        }
        self.child.wait().await?;

        let Some(reader) = self.reader.take() else {
            return Err(RecorderError::EmptyRecording);
        };
        let audio = reader
            .await
            .map_err(|e| RecorderError::Unavailable(e.to_string()))??;

        if audio.is_empty() {
            return Err(RecorderError::EmptyRecording);
        }
        debug!("captured {} bytes of audio", audio.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_returns_buffered_output() {
        let recorder = CommandRecorder::new("echo RIFF");

        let mut recording = recorder.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let audio = recording.stop().await.unwrap();
        assert_eq!(audio, b"RIFF\n");
    }

    #[tokio::test]
    async fn test_silent_capture_is_empty() {
        let recorder = CommandRecorder::new("true");

        let mut recording = recorder.start().await.unwrap();
        let result = recording.stop().await;
        assert!(matches!(result, Err(RecorderError::EmptyRecording)));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let recorder = CommandRecorder::new("definitely-not-a-recorder-binary --wav");

        let result = recorder.start().await;
        assert!(matches!(result, Err(RecorderError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_blank_command_is_unavailable() {
        let recorder = CommandRecorder::new("   ");

        let result = recorder.start().await;
        assert!(matches!(result, Err(RecorderError::Unavailable(_))));
    }
}
