//! Audio device boundary.
//!
//! The device delivers one analysis frame per hop: a decibel-scale magnitude
//! spectrum, the matching time-domain waveform, and a smoothed byte spectrum for
//! level metering. Confab never touches raw PCM beyond these frames and never
//! persists audio.

use crate::error::Result;
use std::collections::VecDeque;

/// Which signal the device captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Local microphone input.
    Microphone,
    /// System/loopback audio (e.g. a shared conference tab).
    Loopback,
}

/// One analysis frame from the capture device.
#[derive(Debug, Clone)]
pub struct AnalysisFrame {
    /// Magnitude spectrum in decibels, one value per frequency bin (fft_size / 2).
    pub spectrum_db: Vec<f32>,
    /// Time-domain amplitude samples in [-1, 1], fft_size values.
    pub waveform: Vec<f32>,
    /// Byte magnitude spectrum (0-255), smoothed by the device's time constant.
    /// Used only for the coarse volume level.
    pub level_spectrum: Vec<u8>,
}

impl AnalysisFrame {
    /// Creates a new analysis frame.
    pub fn new(spectrum_db: Vec<f32>, waveform: Vec<f32>, level_spectrum: Vec<u8>) -> Self {
        Self {
            spectrum_db,
            waveform,
            level_spectrum,
        }
    }
}

/// Trait for audio capture devices.
///
/// This trait allows swapping implementations (real capture device vs mock).
/// A device has a single exclusive consumer per session.
pub trait AudioDevice: Send {
    /// Open the device in the given capture mode.
    ///
    /// May block briefly while capture permission is acquired.
    fn open(&mut self, mode: CaptureMode) -> Result<()>;

    /// Close the device and release the underlying stream.
    fn close(&mut self);

    /// Read the most recent analysis frame, if one is available.
    ///
    /// Returns `None` when the device is closed or no new frame has arrived
    /// since the last read.
    fn read_frame(&mut self) -> Option<AnalysisFrame>;

    /// Returns true while the device is open and capturing.
    fn is_open(&self) -> bool;

    /// Returns true once the underlying track has ended on the device side
    /// (e.g. the user revoked a loopback share).
    fn track_ended(&self) -> bool;

    /// Sample rate of the captured signal in Hz.
    fn sample_rate(&self) -> u32;
}

/// Mock audio device for testing.
pub struct MockAudioDevice {
    frames: VecDeque<AnalysisFrame>,
    sample_rate: u32,
    is_open: bool,
    ended: bool,
    fail_open: Option<String>,
    opened_mode: Option<CaptureMode>,
}

impl MockAudioDevice {
    /// Create a new mock device with no queued frames.
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            sample_rate: crate::defaults::SAMPLE_RATE,
            is_open: false,
            ended: false,
            fail_open: None,
            opened_mode: None,
        }
    }

    /// Queue frames to be returned by `read_frame`, in order.
    pub fn with_frames(mut self, frames: Vec<AnalysisFrame>) -> Self {
        self.frames = frames.into();
        self
    }

    /// Configure the mock to fail on open with the given message.
    pub fn with_open_failure(mut self, message: &str) -> Self {
        self.fail_open = Some(message.to_string());
        self
    }

    /// Configure the sample rate reported by the mock.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Simulate the track ending on the device side.
    pub fn end_track(&mut self) {
        self.ended = true;
    }

    /// The mode the device was last opened with.
    pub fn opened_mode(&self) -> Option<CaptureMode> {
        self.opened_mode
    }
}

impl Default for MockAudioDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for MockAudioDevice {
    fn open(&mut self, mode: CaptureMode) -> Result<()> {
        if let Some(message) = &self.fail_open {
            return Err(crate::error::ConfabError::DeviceUnavailable {
                message: message.clone(),
            });
        }
        self.is_open = true;
        self.opened_mode = Some(mode);
        Ok(())
    }

    fn close(&mut self) {
        self.is_open = false;
    }

    fn read_frame(&mut self) -> Option<AnalysisFrame> {
        if !self.is_open {
            return None;
        }
        self.frames.pop_front()
    }

    fn is_open(&self) -> bool {
        self.is_open
    }

    fn track_ended(&self) -> bool {
        self.ended
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> AnalysisFrame {
        AnalysisFrame::new(vec![-40.0; 8], vec![0.0; 16], vec![10; 8])
    }

    #[test]
    fn test_mock_open_close() {
        let mut device = MockAudioDevice::new();
        assert!(!device.is_open());

        device.open(CaptureMode::Microphone).unwrap();
        assert!(device.is_open());
        assert_eq!(device.opened_mode(), Some(CaptureMode::Microphone));

        device.close();
        assert!(!device.is_open());
    }

    #[test]
    fn test_mock_open_failure() {
        let mut device = MockAudioDevice::new().with_open_failure("no capture source");
        let err = device.open(CaptureMode::Loopback).unwrap_err();
        assert!(err.to_string().contains("no capture source"));
        assert!(!device.is_open());
    }

    #[test]
    fn test_mock_frames_in_order() {
        let mut device = MockAudioDevice::new().with_frames(vec![frame(), frame()]);
        device.open(CaptureMode::Microphone).unwrap();

        assert!(device.read_frame().is_some());
        assert!(device.read_frame().is_some());
        assert!(device.read_frame().is_none());
    }

    #[test]
    fn test_mock_no_frames_when_closed() {
        let mut device = MockAudioDevice::new().with_frames(vec![frame()]);
        assert!(device.read_frame().is_none());
    }

    #[test]
    fn test_mock_track_ended() {
        let mut device = MockAudioDevice::new();
        device.open(CaptureMode::Loopback).unwrap();
        assert!(!device.track_ended());

        device.end_track();
        assert!(device.track_ended());
    }
}
