//! Audio stream context
//!
//! A [`StreamContext`] binds up to one input and one output device to a
//! single native stream. Lifecycle calls are synchronous and report success
//! as a boolean; engine failures are logged and swallowed. Errors raised
//! asynchronously by the engine while the stream is open are queued and can
//! be drained with [`StreamContext::check_errors`].

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::audio::backend::CpalHost;
use crate::audio::engine::{
    AudioHost, DeviceInfo, ErrorCallback, NativeStream, StreamParameters, StreamRequest,
    StreamSettings,
};
use crate::constants::{ENGINE_ERROR_QUEUE, MAX_STREAM_CHANNELS};
use crate::error::{AudioError, ErrorKind};

/// Stream channel count for a device reporting `device_channels` in one
/// direction: stereo if it has more than one, mono otherwise.
pub fn stream_channels(device_channels: u32) -> u16 {
    if device_channels > 1 {
        MAX_STREAM_CHANNELS
    } else {
        1
    }
}

/// An opened (or not yet opened) audio stream between two devices
pub struct StreamContext {
    input: Option<StreamParameters>,
    output: Option<StreamParameters>,
    settings: StreamSettings,
    stream: Box<dyn NativeStream>,
    error_tx: Sender<AudioError>,
    error_rx: Receiver<AudioError>,
}

impl StreamContext {
    /// Create a stream context on the default host with default settings.
    ///
    /// `input` and `output` are device indices as returned by
    /// [`Device::find`](crate::audio::Device::find); `None` leaves that
    /// direction unused. Returns `None` if both are `None` or if an index
    /// does not name a device.
    pub fn create(input: Option<usize>, output: Option<usize>) -> Option<Self> {
        Self::create_with(&CpalHost::new(), input, output, StreamSettings::default())
    }

    /// Create a stream context on `host`.
    ///
    /// Each direction gets 1 (mono) or 2 (stereo) channels depending on the
    /// device's capabilities; a stream never has more than two channels.
    pub fn create_with<H: AudioHost + ?Sized>(
        host: &H,
        input: Option<usize>,
        output: Option<usize>,
        settings: StreamSettings,
    ) -> Option<Self> {
        if input.is_none() && output.is_none() {
            return None;
        }

        let input = match input {
            Some(index) => Some(resolve(host, index, |info| info.input_channels)?),
            None => None,
        };
        let output = match output {
            Some(index) => Some(resolve(host, index, |info| info.output_channels)?),
            None => None,
        };

        debug!(?input, ?output, ?settings, "Created stream context");

        let (error_tx, error_rx) = bounded(ENGINE_ERROR_QUEUE);
        Some(Self {
            input,
            output,
            settings,
            stream: host.new_stream(),
            error_tx,
            error_rx,
        })
    }

    /// Open the stream for reading and writing.
    ///
    /// Returns `true` without touching the engine if already open.
    pub fn open(&mut self) -> bool {
        if self.stream.is_open() {
            return true;
        }

        let request = StreamRequest {
            input: self.input,
            output: self.output,
            settings: self.settings,
        };
        if let Err(e) = self.stream.open(&request, self.error_callback()) {
            warn!("Failed to open audio stream: {}", e);
        }

        self.stream.is_open()
    }

    /// Close the audio stream.
    pub fn close(&mut self) {
        if !self.stream.is_open() {
            return;
        }
        self.stream.close();
    }

    /// Open the stream if needed and start it.
    pub fn start(&mut self) -> bool {
        if !self.open() {
            return false;
        }

        if let Err(e) = self.stream.start() {
            warn!("Failed to start audio stream: {}", e);
        }

        self.stream.is_running()
    }

    /// Stop a running stream. Stopping a stream that is not running succeeds.
    pub fn stop(&mut self) -> bool {
        if !self.stream.is_running() {
            return true;
        }

        if let Err(e) = self.stream.stop() {
            warn!("Failed to stop audio stream: {}", e);
        }

        !self.stream.is_running()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_open()
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_running()
    }

    pub fn input(&self) -> Option<&StreamParameters> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&StreamParameters> {
        self.output.as_ref()
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Take the oldest engine error reported since the last call
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.try_recv().ok()
    }

    fn error_callback(&self) -> ErrorCallback {
        let error_tx = self.error_tx.clone();
        Arc::new(move |kind: ErrorKind, message: &str| {
            warn!("Audio engine {}: {}", kind, message);
            let _ = error_tx.try_send(AudioError::Engine {
                kind,
                message: message.to_string(),
            });
        })
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.stop();
        self.close();
    }
}

fn resolve<H, F>(host: &H, index: usize, channels: F) -> Option<StreamParameters>
where
    H: AudioHost + ?Sized,
    F: Fn(&DeviceInfo) -> u32,
{
    let Some(info) = host.device_info(index) else {
        warn!("No audio device with index {}", index);
        return None;
    };

    Some(StreamParameters {
        device: index,
        channels: stream_channels(channels(&info)),
        first_channel: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::SampleFormat;
    use crate::audio::fake::{device, FakeHost};
    use proptest::prelude::*;

    fn create(
        host: &FakeHost,
        input: Option<usize>,
        output: Option<usize>,
    ) -> Option<StreamContext> {
        StreamContext::create_with(host, input, output, StreamSettings::default())
    }

    #[test]
    fn test_create_requires_a_device() {
        let host = FakeHost::laptop();
        assert!(create(&host, None, None).is_none());
    }

    #[test]
    fn test_create_single_direction() {
        let host = FakeHost::laptop();

        let capture = create(&host, Some(0), None).unwrap();
        assert_eq!(capture.input().map(|p| p.device), Some(0));
        assert!(capture.output().is_none());

        let playback = create(&host, None, Some(1)).unwrap();
        assert!(playback.input().is_none());
        assert_eq!(playback.output().map(|p| p.device), Some(1));
    }

    #[test]
    fn test_create_unknown_device() {
        let host = FakeHost::laptop();
        assert!(create(&host, Some(7), None).is_none());
        assert!(create(&host, Some(0), Some(3)).is_none());
    }

    #[test]
    fn test_channel_selection_per_direction() {
        let host = FakeHost::new(vec![
            device("Mono Mic", 1, 0),
            device("Stereo Out", 0, 2),
            device("Interface", 8, 1),
            device("Dead", 0, 0),
        ]);

        let ctx = create(&host, Some(0), Some(1)).unwrap();
        assert_eq!(ctx.input().unwrap().channels, 1);
        assert_eq!(ctx.output().unwrap().channels, 2);

        // Output follows the output channel count, not the input one
        let ctx = create(&host, Some(2), Some(2)).unwrap();
        assert_eq!(ctx.input().unwrap().channels, 2);
        assert_eq!(ctx.output().unwrap().channels, 1);

        let ctx = create(&host, Some(3), None).unwrap();
        assert_eq!(ctx.input().unwrap().channels, 1);
        assert_eq!(ctx.input().unwrap().first_channel, 0);
    }

    proptest! {
        #[test]
        fn prop_stream_channels_capped(device_channels in 0u32..64) {
            let channels = stream_channels(device_channels);
            prop_assert!(channels == 1 || channels == 2);
            prop_assert_eq!(channels == 2, device_channels > 1);
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, Some(0), Some(1)).unwrap();

        assert!(!ctx.is_open());
        assert!(ctx.open());
        assert!(ctx.open());
        assert!(ctx.is_open());
        assert_eq!(host.state.lock().open_calls, 1);
    }

    #[test]
    fn test_open_forwards_settings() {
        let host = FakeHost::laptop();
        let settings = StreamSettings {
            format: SampleFormat::F32,
            sample_rate: 48_000,
            buffer_frames: 512,
        };
        let mut ctx = StreamContext::create_with(&host, Some(2), Some(2), settings).unwrap();
        assert!(ctx.open());

        let request = host.state.lock().last_request.clone().unwrap();
        assert_eq!(request.settings, settings);
        assert_eq!(request.input.unwrap().channels, 2);
        assert_eq!(request.output.unwrap().channels, 2);
    }

    #[test]
    fn test_open_failure_reports_false() {
        let host = FakeHost::laptop();
        host.state.lock().fail_open = true;

        let mut ctx = create(&host, None, Some(1)).unwrap();
        assert!(!ctx.open());
        assert!(!ctx.is_open());
        assert!(!ctx.start());
        assert_eq!(host.state.lock().start_calls, 0);
    }

    #[test]
    fn test_stop_before_start() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, Some(0), None).unwrap();

        assert!(ctx.stop());
        assert_eq!(host.state.lock().stop_calls, 0);
    }

    #[test]
    fn test_start_opens_then_runs() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, Some(0), Some(1)).unwrap();

        assert!(!ctx.is_running());
        assert!(ctx.start());
        assert!(ctx.is_open());
        assert!(ctx.is_running());
        {
            let state = host.state.lock();
            assert_eq!(state.open_calls, 1);
            assert_eq!(state.start_calls, 1);
        }

        assert!(ctx.stop());
        assert!(!ctx.is_running());
        assert!(ctx.is_open());
    }

    #[test]
    fn test_start_failure_reports_false() {
        let host = FakeHost::laptop();
        host.state.lock().fail_start = true;

        let mut ctx = create(&host, None, Some(1)).unwrap();
        assert!(!ctx.start());
        assert!(ctx.is_open());
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_stop_failure_reports_false() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, Some(0), Some(1)).unwrap();
        assert!(ctx.start());

        host.state.lock().fail_stop = true;
        assert!(!ctx.stop());
        assert!(ctx.is_running());
        assert_eq!(host.state.lock().stop_calls, 1);

        host.state.lock().fail_stop = false;
        assert!(ctx.stop());
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_close() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, None, Some(1)).unwrap();

        ctx.close();
        assert_eq!(host.state.lock().close_calls, 0);

        assert!(ctx.open());
        ctx.close();
        assert!(!ctx.is_open());
        assert_eq!(host.state.lock().close_calls, 1);

        // Reopen after close
        assert!(ctx.open());
        assert_eq!(host.state.lock().open_calls, 2);
    }

    #[test]
    fn test_drop_stops_and_closes() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, Some(0), Some(1)).unwrap();
        assert!(ctx.start());

        drop(ctx);

        let state = host.state.lock();
        assert!(!state.running);
        assert!(!state.open);
        assert_eq!(state.stop_calls, 1);
        assert_eq!(state.close_calls, 1);
    }

    #[test]
    fn test_engine_errors_are_queued() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, None, Some(1)).unwrap();
        assert!(ctx.check_errors().is_none());
        assert!(ctx.start());

        host.emit_error(ErrorKind::DeviceDisconnected, "speakers unplugged");

        match ctx.check_errors() {
            Some(AudioError::Engine { kind, message }) => {
                assert_eq!(kind, ErrorKind::DeviceDisconnected);
                assert_eq!(message, "speakers unplugged");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(ctx.check_errors().is_none());
    }

    #[test]
    fn test_engine_error_queue_drops_overflow() {
        let host = FakeHost::laptop();
        let mut ctx = create(&host, None, Some(1)).unwrap();
        assert!(ctx.open());

        for i in 0..ENGINE_ERROR_QUEUE + 4 {
            host.emit_error(ErrorKind::Warning, &format!("xrun {}", i));
        }

        let mut drained = 0;
        while ctx.check_errors().is_some() {
            drained += 1;
        }
        assert_eq!(drained, ENGINE_ERROR_QUEUE);
    }
}
