//! cpal-backed audio engine
//!
//! cpal reports one flat device list per host; indices into that list are
//! the device ids used by [`StreamParameters`]. Streams are built paused so
//! that an open stream is not running until [`NativeStream::start`].

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SizedSample;
use tracing::debug;

use crate::audio::engine::{
    duplex_channels, AudioHost, DeviceInfo, ErrorCallback, NativeStream, SampleFormat,
    StreamParameters, StreamRequest, StreamSettings,
};
use crate::error::{AudioError, ErrorKind};

/// Audio host wrapping a cpal host
pub struct CpalHost {
    host: cpal::Host,
}

impl CpalHost {
    /// Use the platform's default cpal host
    pub fn new() -> Self {
        Self::with_host(cpal::default_host())
    }

    pub fn with_host(host: cpal::Host) -> Self {
        Self { host }
    }

    /// Name of the underlying host API (ALSA, CoreAudio, WASAPI, ...)
    pub fn name(&self) -> &'static str {
        self.host.id().name()
    }
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for CpalHost {
    fn devices(&self) -> Result<Vec<DeviceInfo>, AudioError> {
        let default_input = self
            .host
            .default_input_device()
            .and_then(|d| d.name().ok());
        let default_output = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok());

        let devices = self
            .host
            .devices()
            .map_err(|e| AudioError::Enumeration(e.to_string()))?;

        let infos: Vec<DeviceInfo> = devices
            .map(|device| {
                probe_device(&device, default_input.as_deref(), default_output.as_deref())
            })
            .collect();

        debug!("Probed {} devices on {}", infos.len(), self.name());
        Ok(infos)
    }

    fn new_stream(&self) -> Box<dyn NativeStream> {
        Box::new(CpalStream::new(self.host.id()))
    }
}

fn probe_device(
    device: &cpal::Device,
    default_input: Option<&str>,
    default_output: Option<&str>,
) -> DeviceInfo {
    let name = device.name().ok();
    let input = device.supported_input_configs().map(max_channels);
    let output = device.supported_output_configs().map(max_channels);

    let probed = name.is_some() && (input.is_ok() || output.is_ok());
    let input_channels = input.unwrap_or(0);
    let output_channels = output.unwrap_or(0);
    let name = name.unwrap_or_else(|| "Unknown".to_string());

    DeviceInfo {
        is_default_input: input_channels > 0 && default_input == Some(name.as_str()),
        is_default_output: output_channels > 0 && default_output == Some(name.as_str()),
        duplex_channels: duplex_channels(input_channels, output_channels),
        input_channels,
        output_channels,
        probed,
        name,
    }
}

fn max_channels(configs: impl Iterator<Item = cpal::SupportedStreamConfigRange>) -> u32 {
    configs
        .map(|config| u32::from(config.channels()))
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Input,
    Output,
}

/// Stream handle holding up to one cpal stream per direction
pub struct CpalStream {
    host_id: cpal::HostId,
    input: Option<cpal::Stream>,
    output: Option<cpal::Stream>,
    running: bool,
}

impl CpalStream {
    fn new(host_id: cpal::HostId) -> Self {
        Self {
            host_id,
            input: None,
            output: None,
            running: false,
        }
    }

    fn streams(&self) -> impl Iterator<Item = &cpal::Stream> {
        self.input.iter().chain(self.output.iter())
    }
}

impl NativeStream for CpalStream {
    fn open(&mut self, request: &StreamRequest, on_error: ErrorCallback) -> Result<(), AudioError> {
        if self.is_open() {
            return Err(AudioError::StreamControl("stream is already open".to_string()));
        }

        let host = cpal::host_from_id(self.host_id)
            .map_err(|e| AudioError::StreamOpen(e.to_string()))?;
        let devices: Vec<cpal::Device> = host
            .devices()
            .map_err(|e| AudioError::Enumeration(e.to_string()))?
            .collect();

        let input = request
            .input
            .as_ref()
            .map(|params| {
                build_stream(
                    &devices,
                    params,
                    &request.settings,
                    Direction::Input,
                    on_error.clone(),
                )
            })
            .transpose()?;
        let output = request
            .output
            .as_ref()
            .map(|params| {
                build_stream(
                    &devices,
                    params,
                    &request.settings,
                    Direction::Output,
                    on_error.clone(),
                )
            })
            .transpose()?;

        // Some hosts start playing as soon as a stream is built.
        for stream in input.iter().chain(output.iter()) {
            if let Err(e) = stream.pause() {
                debug!("Could not pause freshly built stream: {}", e);
            }
        }

        self.input = input;
        self.output = output;
        self.running = false;
        Ok(())
    }

    fn close(&mut self) {
        self.input = None;
        self.output = None;
        self.running = false;
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if !self.is_open() {
            return Err(AudioError::StreamControl("stream is not open".to_string()));
        }
        let streams: Vec<&cpal::Stream> = self.streams().collect();
        play_all(&streams, play_stream, pause_stream)?;
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let streams: Vec<&cpal::Stream> = self.streams().collect();
        pause_all(&streams, pause_stream)?;
        self.running = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.input.is_some() || self.output.is_some()
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

fn play_stream(stream: &cpal::Stream) -> Result<(), String> {
    stream.play().map_err(|e| e.to_string())
}

fn pause_stream(stream: &cpal::Stream) -> Result<(), String> {
    stream.pause().map_err(|e| e.to_string())
}

/// Play every stream. If one fails, the streams already playing are paused
/// again so that no direction is left running.
fn play_all<S>(
    streams: &[&S],
    play: impl Fn(&S) -> Result<(), String>,
    pause: impl Fn(&S) -> Result<(), String>,
) -> Result<(), AudioError> {
    for (started, stream) in streams.iter().enumerate() {
        if let Err(e) = play(*stream) {
            for earlier in &streams[..started] {
                if let Err(pause_err) = pause(*earlier) {
                    debug!("Could not pause stream after failed start: {}", pause_err);
                }
            }
            return Err(AudioError::StreamControl(e));
        }
    }
    Ok(())
}

/// Pause every stream, even after a failure, and report the first error.
fn pause_all<S>(
    streams: &[&S],
    pause: impl Fn(&S) -> Result<(), String>,
) -> Result<(), AudioError> {
    let mut first_error = None;
    for stream in streams {
        if let Err(e) = pause(*stream) {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(AudioError::StreamControl(e)),
        None => Ok(()),
    }
}

fn build_stream(
    devices: &[cpal::Device],
    params: &StreamParameters,
    settings: &StreamSettings,
    direction: Direction,
    on_error: ErrorCallback,
) -> Result<cpal::Stream, AudioError> {
    let device = devices
        .get(params.device)
        .ok_or_else(|| AudioError::DeviceNotFound(format!("device index {}", params.device)))?;

    if params.first_channel != 0 {
        return Err(AudioError::UnsupportedFormat(format!(
            "first channel offset {} is not supported by cpal",
            params.first_channel
        )));
    }

    let config = cpal::StreamConfig {
        channels: params.channels,
        sample_rate: cpal::SampleRate(settings.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(settings.buffer_frames),
    };

    debug!(
        "Building {:?} stream: device={}, channels={}, rate={}, frames={}, format={:?}",
        direction,
        params.device,
        config.channels,
        settings.sample_rate,
        settings.buffer_frames,
        settings.format
    );

    let stream = match (direction, settings.format) {
        (Direction::Input, SampleFormat::I16) => build_input::<i16>(device, &config, on_error),
        (Direction::Input, SampleFormat::F32) => build_input::<f32>(device, &config, on_error),
        (Direction::Output, SampleFormat::I16) => build_output::<i16>(device, &config, on_error),
        (Direction::Output, SampleFormat::F32) => build_output::<f32>(device, &config, on_error),
    };

    stream.map_err(|e| AudioError::StreamOpen(e.to_string()))
}

fn build_input<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    on_error: ErrorCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_input_stream(
        config,
        |_data: &[T], _: &cpal::InputCallbackInfo| {},
        error_handler(on_error),
        None,
    )
}

fn build_output<T: SizedSample + 'static>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    on_error: ErrorCallback,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        config,
        |data: &mut [T], _: &cpal::OutputCallbackInfo| data.fill(T::EQUILIBRIUM),
        error_handler(on_error),
        None,
    )
}

fn error_handler(on_error: ErrorCallback) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        let (kind, message) = classify_stream_error(err);
        on_error(kind, &message);
    }
}

fn classify_stream_error(err: cpal::StreamError) -> (ErrorKind, String) {
    match err {
        cpal::StreamError::DeviceNotAvailable => (
            ErrorKind::DeviceDisconnected,
            "the device is no longer available".to_string(),
        ),
        other => (ErrorKind::SystemError, other.to_string()),
    }
}
