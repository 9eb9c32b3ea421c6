//! Voice answer recording
//!
//! `VoiceRecorder` drives an `AudioSource`, writes each answer to a WAV file
//! and hands back a `VoiceRecording` that the interview session can send.

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::audio::{AudioSource, CapturedAudio};
use crate::error::{Error, Result};

/// Whether the microphone may be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// A finished recording on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRecording {
    pub path: PathBuf,
    /// Playable `file://` URL
    pub url: String,
    /// Whole seconds recorded
    pub duration_secs: u32,
}

impl VoiceRecording {
    /// Chat log text standing in for the audio
    pub fn label(&self) -> String {
        format!("[Voice message - {}s]", self.duration_secs)
    }

    /// Raw WAV file contents
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Delete the file backing this recording. Already deleted is fine.
    pub fn discard(self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Discarded recording {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

/// Records answers from an `AudioSource` into WAV files under `output_dir`
pub struct VoiceRecorder<S: AudioSource> {
    source: S,
    output_dir: PathBuf,
    permission: PermissionState,
}

impl<S: AudioSource> VoiceRecorder<S> {
    pub fn new(source: S, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            permission: PermissionState::Unknown,
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn is_recording(&self) -> bool {
        self.source.is_recording()
    }

    pub fn level(&self) -> f32 {
        self.source.level()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Probe the microphone by acquiring and immediately releasing it
    pub fn check_permission(&mut self) -> PermissionState {
        if self.source.is_recording() {
            return self.permission;
        }
        self.permission = match self.source.start() {
            Ok(()) => {
                if let Err(e) = self.source.stop() {
                    warn!("Failed to release microphone after probe: {}", e);
                }
                PermissionState::Granted
            }
            Err(e) => {
                warn!("Microphone unavailable: {}", e);
                PermissionState::Denied
            }
        };
        self.permission
    }

    /// Begin recording. A denied microphone stays denied until `check_permission` succeeds.
    pub fn start(&mut self) -> Result<()> {
        if self.permission == PermissionState::Denied {
            return Err(Error::PermissionDenied(
                "Microphone access was denied".to_string(),
            ));
        }
        match self.source.start() {
            Ok(()) => {
                self.permission = PermissionState::Granted;
                Ok(())
            }
            Err(e) => {
                self.permission = PermissionState::Denied;
                Err(match e {
                    Error::PermissionDenied(_) => e,
                    other => Error::PermissionDenied(other.to_string()),
                })
            }
        }
    }

    /// Stop recording, release the microphone and save the answer
    pub fn stop(&mut self) -> Result<VoiceRecording> {
        let audio = self.source.stop()?;
        let path = self
            .output_dir
            .join(format!("recording-{}.wav", Uuid::new_v4()));
        write_wav(&path, &audio)?;

        let recording = VoiceRecording {
            url: file_url(&path)?,
            duration_secs: audio.duration_secs().floor() as u32,
            path,
        };
        info!(
            "Saved {}s recording to {}",
            recording.duration_secs,
            recording.path.display()
        );
        Ok(recording)
    }

    /// Stop recording and drop whatever was captured
    pub fn cancel(&mut self) -> Result<()> {
        if self.source.is_recording() {
            let audio = self.source.stop()?;
            debug!("Cancelled recording ({} samples dropped)", audio.samples.len());
        }
        Ok(())
    }
}

/// Write mono samples as 16-bit PCM WAV
pub fn write_wav(path: &Path, audio: &CapturedAudio) -> Result<()> {
    if audio.sample_rate == 0 {
        return Err(Error::Audio("Recording has no sample rate".to_string()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Percent-encoded `file://` URL for a recording on disk
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| Error::InvalidInput(format!("not an absolute path: {}", absolute.display())))
}
