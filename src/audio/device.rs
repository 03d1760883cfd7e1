//! Audio device enumeration and lookup

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::backend::CpalHost;
use crate::audio::engine::{AudioHost, DeviceInfo};

/// Representation of a physical audio device
///
/// Cheap to clone: clones share the probed information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    info: Arc<DeviceInfo>,
}

impl Device {
    /// List all available input and output devices of the default host.
    pub fn available_devices() -> Vec<Device> {
        Self::enumerate(&CpalHost::new())
    }

    /// List all devices reported by `host`, in engine order.
    ///
    /// A failed enumeration is logged and yields an empty list.
    pub fn enumerate<H: AudioHost + ?Sized>(host: &H) -> Vec<Device> {
        match host.devices() {
            Ok(infos) => {
                debug!("Found {} audio devices", infos.len());
                infos.into_iter().map(Device::from).collect()
            }
            Err(e) => {
                warn!("Failed to enumerate audio devices: {}", e);
                Vec::new()
            }
        }
    }

    /// Index of the first device of the default host named exactly `name`.
    pub fn find(name: &str) -> Option<usize> {
        Self::find_in(&CpalHost::new(), name)
    }

    /// Index of the first device of `host` named exactly `name`.
    pub fn find_in<H: AudioHost + ?Sized>(host: &H, name: &str) -> Option<usize> {
        Self::enumerate(host)
            .iter()
            .position(|device| device.name() == name)
    }

    pub fn is_valid(&self) -> bool {
        self.info.probed
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// The maximum input channels the device supports.
    pub fn input_channels(&self) -> u32 {
        self.info.input_channels
    }

    /// The maximum output channels the device supports.
    pub fn output_channels(&self) -> u32 {
        self.info.output_channels
    }

    /// The maximum simultaneous input/output channels the device supports.
    pub fn duplex_channels(&self) -> u32 {
        self.info.duplex_channels
    }

    pub fn is_input(&self) -> bool {
        self.info.input_channels > 0
    }

    pub fn is_output(&self) -> bool {
        self.info.output_channels > 0
    }

    pub fn is_default_input(&self) -> bool {
        self.info.is_default_input
    }

    pub fn is_default_output(&self) -> bool {
        self.info.is_default_output
    }

    /// Raw probe data, e.g. for serialization
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

impl From<DeviceInfo> for Device {
    fn from(info: DeviceInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }
}
