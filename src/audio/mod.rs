//! Audio subsystem module

pub mod backend;
pub mod device;
pub mod engine;
pub mod stream;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::CpalHost;
pub use device::Device;
pub use engine::{
    AudioHost, DeviceInfo, ErrorCallback, NativeStream, SampleFormat, StreamParameters,
    StreamRequest, StreamSettings,
};
pub use stream::{stream_channels, StreamContext};
