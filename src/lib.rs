//! # Audio Devices
//!
//! Audio device enumeration and duplex stream handles on top of cpal.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────────────┐
//! │ Device::available_devices│      │ StreamContext::create(in, out)   │
//! │ Device::find(name)       │ ───▶ │   open / start / stop / close    │
//! └────────────┬─────────────┘ idx  └───────────────┬──────────────────┘
//!              │                                    │
//!              ▼                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │          AudioHost / NativeStream (audio::engine)                   │
//! │          CpalHost / CpalStream     (audio::backend)                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Devices are addressed by their index in the engine's device list. A
//! stream carries up to one input and one output direction with 1 or 2
//! channels each.

pub mod audio;
pub mod config;
pub mod error;

pub use audio::{Device, StreamContext, StreamSettings};
pub use config::Config;
pub use error::{AudioError, Error, ErrorKind, Result};

/// Application-wide constants
pub mod constants {
    /// Default stream sample rate
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    /// Default frames per engine callback
    pub const DEFAULT_BUFFER_FRAMES: u32 = 256;

    /// Upper bound on channels per stream direction
    pub const MAX_STREAM_CHANNELS: u16 = 2;

    /// Engine errors kept per stream until drained
    pub const ENGINE_ERROR_QUEUE: usize = 16;
}
