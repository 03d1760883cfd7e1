//! In-memory audio engine for unit tests
//!
//! Records every native call so tests can assert on idempotence.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::engine::{AudioHost, DeviceInfo, ErrorCallback, NativeStream, StreamRequest};
use crate::error::{AudioError, ErrorKind};

#[derive(Default)]
pub(crate) struct FakeState {
    pub open: bool,
    pub running: bool,
    pub open_calls: usize,
    pub close_calls: usize,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub fail_open: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub last_request: Option<StreamRequest>,
    pub on_error: Option<ErrorCallback>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeHost {
    devices: Vec<DeviceInfo>,
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeHost {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices,
            state: Arc::default(),
        }
    }

    /// Typical laptop: built-in mic, speakers, and a stereo USB interface
    pub fn laptop() -> Self {
        Self::new(vec![
            device("Built-in Microphone", 1, 0),
            device("Built-in Speakers", 0, 2),
            device("USB Audio Interface", 2, 8),
        ])
    }

    /// Deliver an asynchronous engine error through the registered callback
    pub fn emit_error(&self, kind: ErrorKind, message: &str) {
        let callback = self.state.lock().on_error.clone();
        if let Some(callback) = callback {
            callback(kind, message);
        }
    }
}

pub(crate) fn device(name: &str, input_channels: u32, output_channels: u32) -> DeviceInfo {
    DeviceInfo {
        name: name.to_string(),
        input_channels,
        output_channels,
        duplex_channels: crate::audio::engine::duplex_channels(input_channels, output_channels),
        is_default_input: false,
        is_default_output: false,
        probed: true,
    }
}

impl AudioHost for FakeHost {
    fn devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        Ok(self.devices.clone())
    }

    fn new_stream(&self) -> Box<dyn NativeStream> {
        Box::new(FakeStream {
            device_count: self.devices.len(),
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeStream {
    device_count: usize,
    state: Arc<Mutex<FakeState>>,
}

impl NativeStream for FakeStream {
    fn open(&mut self, request: &StreamRequest, on_error: ErrorCallback) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.open_calls += 1;
        state.last_request = Some(request.clone());
        state.on_error = Some(on_error);

        if state.fail_open {
            return Err(AudioError::StreamOpen("device busy".to_string()));
        }
        let unknown = [request.input, request.output]
            .into_iter()
            .flatten()
            .find(|params| params.device >= self.device_count);
        if let Some(params) = unknown {
            return Err(AudioError::DeviceNotFound(format!("device index {}", params.device)));
        }

        state.open = true;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.close_calls += 1;
        state.open = false;
        state.running = false;
    }

    fn start(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.start_calls += 1;
        if state.fail_start || !state.open {
            return Err(AudioError::StreamControl("cannot start".to_string()));
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        if state.fail_stop {
            return Err(AudioError::StreamControl("cannot stop".to_string()));
        }
        state.running = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn is_running(&self) -> bool {
        self.state.lock().running
    }
}
