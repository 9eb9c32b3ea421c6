//! Microphone capture using CPAL
//!
//! The input device is opened when a recording starts and released when it
//! stops, so the microphone is only held for the length of one answer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Preferred capture rate for speech
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Mono audio captured between `start` and `stop`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedAudio {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl CapturedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Something that can record mono audio
pub trait AudioSource {
    /// Acquire the input device and begin buffering
    fn start(&mut self) -> Result<()>;

    /// Release the device and return everything captured since `start`
    fn stop(&mut self) -> Result<CapturedAudio>;

    fn is_recording(&self) -> bool;

    /// RMS level of the most recent audio in [0.0, 1.0]
    fn level(&self) -> f32 {
        0.0
    }
}

/// State of the audio capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

struct ActiveStream {
    stream: Stream,
    sample_rate: u32,
}

/// Default input device as an `AudioSource`
pub struct MicrophoneStream {
    preferred_sample_rate: u32,
    state: Arc<Mutex<CaptureState>>,
    buffer: Arc<Mutex<Vec<f32>>>,
    active: Option<ActiveStream>,
}

impl Default for MicrophoneStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrophoneStream {
    pub fn new() -> Self {
        Self::with_sample_rate(DEFAULT_SAMPLE_RATE)
    }

    pub fn with_sample_rate(preferred_sample_rate: u32) -> Self {
        Self {
            preferred_sample_rate,
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            active: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    fn open(&self) -> Result<ActiveStream> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("No input device available".to_string()))?;

        // note: device.name() is deprecated in cpal 0.17+, but works
        #[allow(deprecated)]
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported_configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| Error::PermissionDenied(format!("Failed to query input device: {e}")))?
            .collect();

        let (supported_config, input_channels, sample_format, sample_rate) =
            select_supported_config(&supported_configs, self.preferred_sample_rate, 1)
                .ok_or_else(|| Error::Audio("No supported input config found".to_string()))?;

        let stream_config = supported_config.config();
        debug!(
            "Stream config: {:?} (input channels: {}, format: {:?})",
            stream_config, input_channels, sample_format
        );

        let buffer = Arc::clone(&self.buffer);
        let state = Arc::clone(&self.state);
        let channels = input_channels as usize;

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::U32 => build_stream::<u32>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, channels, buffer, state)?,
            SampleFormat::F64 => build_stream::<f64>(&device, &stream_config, channels, buffer, state)?,
            other => {
                return Err(Error::Audio(format!("Unsupported sample format: {:?}", other)));
            }
        };

        Ok(ActiveStream {
            stream,
            sample_rate,
        })
    }
}

impl AudioSource for MicrophoneStream {
    fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        self.buffer.lock().clear();
        let active = self.open()?;

        *self.state.lock() = CaptureState::Recording;
        if let Err(e) = active.stream.play() {
            *self.state.lock() = CaptureState::Idle;
            return Err(Error::PermissionDenied(format!("Failed to start stream: {e}")));
        }

        self.active = Some(active);
        info!("Audio capture started");
        Ok(())
    }

    fn stop(&mut self) -> Result<CapturedAudio> {
        *self.state.lock() = CaptureState::Idle;

        // dropping the stream releases the device
        let active = self
            .active
            .take()
            .ok_or_else(|| Error::Audio("Not recording".to_string()))?;
        let sample_rate = active.sample_rate;
        drop(active.stream);

        let samples = std::mem::take(&mut *self.buffer.lock());
        info!("Audio capture stopped, {} samples captured", samples.len());
        Ok(CapturedAudio::new(samples, sample_rate))
    }

    fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    fn level(&self) -> f32 {
        let sample_rate = self
            .active
            .as_ref()
            .map_or(self.preferred_sample_rate, |a| a.sample_rate);
        rms_level(&self.buffer.lock(), sample_rate)
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        *self.state.lock() = CaptureState::Idle;
        self.active = None;
    }
}

fn build_stream<T>(
    device: &Device,
    stream_config: &StreamConfig,
    channels: usize,
    buffer: Arc<Mutex<Vec<f32>>>,
    state: Arc<Mutex<CaptureState>>,
) -> Result<Stream>
where
    T: Sample + SizedSample,
    f32: cpal::FromSample<T>,
{
    device
        .build_input_stream(
            stream_config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if *state.lock() != CaptureState::Recording {
                    return;
                }

                if channels == 1 {
                    buffer
                        .lock()
                        .extend(data.iter().map(|sample| sample.to_sample::<f32>()));
                } else {
                    let mut buf = buffer.lock();
                    for frame in data.chunks_exact(channels) {
                        let sum: f32 = frame.iter().map(|s| s.to_sample::<f32>()).sum();
                        buf.push(sum / channels as f32);
                    }
                }
            },
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| Error::PermissionDenied(format!("Failed to open microphone: {e}")))
}

/// RMS amplitude of the last 50ms, scaled up for display
pub fn rms_level(samples: &[f32], sample_rate: u32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let window = (sample_rate as usize / 20).max(1);
    let recent = &samples[samples.len().saturating_sub(window)..];
    let sum_squares: f32 = recent.iter().map(|&s| s * s).sum();
    let rms = (sum_squares / recent.len() as f32).sqrt();

    (rms * 3.0).min(1.0)
}

fn select_supported_config(
    ranges: &[cpal::SupportedStreamConfigRange],
    preferred_rate: u32,
    preferred_channels: u16,
) -> Option<(cpal::SupportedStreamConfig, u16, SampleFormat, u32)> {
    let preferred_formats = [
        SampleFormat::F32,
        SampleFormat::I16,
        SampleFormat::U16,
        SampleFormat::I32,
        SampleFormat::U32,
        SampleFormat::F64,
        SampleFormat::I8,
        SampleFormat::U8,
    ];

    for format in preferred_formats {
        let mut candidates: Vec<_> = ranges
            .iter()
            .copied()
            .filter(|range| {
                range.sample_format() == format && range.channels() == preferred_channels
            })
            .collect();

        if candidates.is_empty() {
            candidates = ranges
                .iter()
                .copied()
                .filter(|range| range.sample_format() == format)
                .collect();
        }

        let Some(best) = candidates
            .into_iter()
            .min_by_key(|range| sample_rate_distance(*range, preferred_rate))
        else {
            continue;
        };

        let sample_rate = clamp_sample_rate(best, preferred_rate);
        let supported = best.with_sample_rate(sample_rate);

        return Some((supported, best.channels(), format, sample_rate));
    }

    None
}

fn sample_rate_distance(range: cpal::SupportedStreamConfigRange, preferred_rate: u32) -> u32 {
    let clamped = clamp_sample_rate(range, preferred_rate);
    clamped.abs_diff(preferred_rate)
}

fn clamp_sample_rate(range: cpal::SupportedStreamConfigRange, preferred_rate: u32) -> u32 {
    preferred_rate.clamp(range.min_sample_rate(), range.max_sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_duration() {
        let audio = CapturedAudio::new(vec![0.0; 24000], 16000);
        assert!((audio.duration_secs() - 1.5).abs() < 1e-9);
        assert_eq!(CapturedAudio::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn test_rms_level() {
        assert_eq!(rms_level(&[], 16000), 0.0);

        let quiet = vec![0.01f32; 1600];
        let loud = vec![0.5f32; 1600];
        assert!(rms_level(&quiet, 16000) < rms_level(&loud, 16000));
        // saturates at 1.0
        assert_eq!(rms_level(&loud, 16000), 1.0);

        // only the trailing 50ms count
        let mut mixed = vec![0.9f32; 1600];
        mixed.extend(vec![0.0f32; 800]);
        assert_eq!(rms_level(&mixed, 16000), 0.0);
    }

    #[test]
    fn test_stop_without_start_errors() {
        let mut mic = MicrophoneStream::new();
        assert!(!mic.is_recording());
        assert_eq!(mic.state(), CaptureState::Idle);
        assert!(matches!(mic.stop(), Err(Error::Audio(_))));
    }
}
