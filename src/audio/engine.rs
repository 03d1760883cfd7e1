//! Native audio engine abstraction
//!
//! [`AudioHost`] and [`NativeStream`] describe everything this crate needs
//! from the underlying audio library: a flat, index-addressed device list
//! and a single stream object with an open/start/stop/close lifecycle.
//! The production implementation lives in [`crate::audio::backend`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BUFFER_FRAMES, DEFAULT_SAMPLE_RATE};
use crate::error::{AudioError, ErrorKind};

/// Raw device information as probed from the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name
    pub name: String,
    /// Maximum input channels
    pub input_channels: u32,
    /// Maximum output channels
    pub output_channels: u32,
    /// Maximum simultaneous input/output channels
    pub duplex_channels: u32,
    /// Whether this is the system default input device
    pub is_default_input: bool,
    /// Whether this is the system default output device
    pub is_default_output: bool,
    /// Whether probing the device succeeded
    pub probed: bool,
}

/// Duplex channel count for a device with the given per-direction maxima.
pub fn duplex_channels(input_channels: u32, output_channels: u32) -> u32 {
    if input_channels > 0 && output_channels > 0 {
        input_channels.min(output_channels)
    } else {
        0
    }
}

/// PCM sample format of an opened stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 16-bit signed integer
    #[default]
    I16,
    /// 32-bit float
    F32,
}

/// Format, rate and buffering shared by both directions of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub format: SampleFormat,
    pub sample_rate: u32,
    /// Frames per engine callback
    pub buffer_frames: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            format: SampleFormat::I16,
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

/// Per-direction stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParameters {
    /// Index into the engine's device list
    pub device: usize,
    pub channels: u16,
    pub first_channel: u16,
}

/// Everything the engine needs to open a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub input: Option<StreamParameters>,
    pub output: Option<StreamParameters>,
    pub settings: StreamSettings,
}

/// Callback invoked by the engine for asynchronous stream errors.
///
/// May be called from an engine-owned thread.
pub type ErrorCallback = Arc<dyn Fn(ErrorKind, &str) + Send + Sync>;

/// Device enumeration and stream construction
pub trait AudioHost {
    /// Probe every device the engine currently reports, in engine order.
    fn devices(&self) -> Result<Vec<DeviceInfo>, AudioError>;

    /// Probe a single device by index.
    fn device_info(&self, index: usize) -> Option<DeviceInfo> {
        self.devices().ok()?.into_iter().nth(index)
    }

    /// Create a closed stream object bound to this engine.
    fn new_stream(&self) -> Box<dyn NativeStream>;
}

/// One native stream handle
///
/// All calls are synchronous. State queries reflect the engine's view.
pub trait NativeStream {
    fn open(&mut self, request: &StreamRequest, on_error: ErrorCallback) -> Result<(), AudioError>;

    fn close(&mut self);

    fn start(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;

    fn is_open(&self) -> bool;

    fn is_running(&self) -> bool;
}
