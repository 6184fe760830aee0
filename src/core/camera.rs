use super::error::{CameraError, CameraResult};
use super::frame_buffer::{FrameBuffer, SkipReport};
use crate::capture::{CaptureProperty, CaptureSource, Frame, Resolution};
use crate::shared::constants;
use crate::utils::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Uninitialized,
    Stopped,
    Running,
    Paused,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Uninitialized => "uninitialized",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Running => "running",
            PlaybackState::Paused => "paused",
        }
    }
}

/// What the device granted for a resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionChange {
    pub requested: Resolution,
    pub actual: Resolution,
}

impl ResolutionChange {
    pub fn is_exact(&self) -> bool {
        self.requested == self.actual
    }
}

#[derive(Debug, Clone)]
pub enum SkipOutcome {
    Forward(SkipReport),
    Backward(Frame),
    Unchanged,
}

/// Releases the device when dropped unless disarmed. Covers every early
/// return while a session is being brought up.
struct DeviceGuard<'a, S: CaptureSource> {
    source: &'a mut S,
    armed: bool,
}

impl<'a, S: CaptureSource> DeviceGuard<'a, S> {
    fn new(source: &'a mut S) -> Self {
        Self { source, armed: true }
    }

    fn source(&mut self) -> &mut S {
        self.source
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<S: CaptureSource> Drop for DeviceGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.source.release() {
                logger::error(&format!("Failed to release camera after aborted open: {}", e));
            }
        }
    }
}

fn negotiate_resolution<S: CaptureSource>(source: &mut S, requested: Resolution) -> CameraResult<Resolution> {
    source.set(CaptureProperty::FrameWidth, requested.width as f64)?;
    source.set(CaptureProperty::FrameHeight, requested.height as f64)?;

    let width = source.get(CaptureProperty::FrameWidth)?;
    let height = source.get(CaptureProperty::FrameHeight)?;
    Ok(Resolution::new(width.max(0.0) as u32, height.max(0.0) as u32))
}

/// Playback state machine over one exclusively owned capture device.
pub struct CameraController<S: CaptureSource> {
    source: S,
    state: PlaybackState,
    device_index: Option<i32>,
    history: FrameBuffer,
    last_frame: Option<Frame>,
    paused_frame: Option<Frame>,
    requested: Resolution,
    actual: Resolution,
}

impl<S: CaptureSource> CameraController<S> {
    pub fn new(source: S) -> Self {
        Self::with_resolution(source, constants::DEFAULT_RESOLUTION)
    }

    pub fn with_resolution(source: S, resolution: Resolution) -> Self {
        Self {
            source,
            state: PlaybackState::Uninitialized,
            device_index: None,
            history: FrameBuffer::new(constants::FRAME_BUFFER_CAPACITY),
            last_frame: None,
            paused_frame: None,
            requested: resolution,
            actual: resolution,
        }
    }

    /// Open device `index`, confirm it produces a frame and apply the last
    /// requested resolution. Any previous session is stopped first.
    pub fn initialize(&mut self, index: i32) -> CameraResult<ResolutionChange> {
        if self.state != PlaybackState::Uninitialized {
            self.stop();
        }

        let opened = match self.source.open(index) {
            Ok(opened) => opened,
            Err(e) => {
                logger::error(&format!("Opening camera {} raised: {}", index, e));
                false
            }
        };

        let mut guard = DeviceGuard::new(&mut self.source);
        if !opened {
            return Err(CameraError::DeviceOpen { index });
        }

        match guard.source().read() {
            Ok(Some(frame)) if !frame.is_empty() => {}
            Ok(_) => return Err(CameraError::DeviceValidation { index }),
            Err(e) => {
                logger::error(&format!("Validation read on camera {} failed: {}", index, e));
                return Err(CameraError::DeviceValidation { index });
            }
        }

        let requested = self.requested;
        let actual = negotiate_resolution(guard.source(), requested)?;
        guard.disarm();

        self.actual = actual;
        self.device_index = Some(index);
        self.history.clear();
        self.last_frame = None;
        self.paused_frame = None;
        self.state = PlaybackState::Stopped;

        let change = ResolutionChange { requested, actual };
        Self::log_resolution(&change);
        logger::info(&format!("Camera initialized successfully with index {}", index));
        Ok(change)
    }

    /// Begin a fresh session from Stopped. A no-op while Running or Paused.
    pub fn start(&mut self) -> CameraResult<()> {
        self.ensure_open()?;
        if self.is_running() {
            return Ok(());
        }

        self.history.clear();
        self.paused_frame = None;
        self.state = PlaybackState::Running;
        logger::info("Camera started");
        Ok(())
    }

    pub fn pause(&mut self) -> CameraResult<()> {
        self.ensure_open()?;
        if self.state != PlaybackState::Running {
            return Ok(());
        }

        self.paused_frame = self.last_frame.clone();
        self.state = PlaybackState::Paused;
        logger::info("Camera paused");
        Ok(())
    }

    pub fn resume(&mut self) -> CameraResult<()> {
        self.ensure_open()?;
        if self.state != PlaybackState::Paused {
            return Ok(());
        }

        self.state = PlaybackState::Running;
        logger::info("Camera resumed");
        Ok(())
    }

    /// Release the device and drop all buffered frames. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Uninitialized && !self.source.is_opened() {
            return;
        }

        if let Err(e) = self.source.release() {
            logger::error(&format!("Failed to release camera: {}", e));
        }

        self.state = PlaybackState::Uninitialized;
        self.device_index = None;
        self.history.clear();
        self.last_frame = None;
        self.paused_frame = None;
        logger::info("Camera stopped");
    }

    /// Ask the device for `width`x`height` and keep whatever it actually
    /// grants. A substitute mode is logged as a warning, not an error.
    pub fn set_resolution(&mut self, width: u32, height: u32) -> CameraResult<ResolutionChange> {
        self.ensure_open()?;

        let requested = Resolution::new(width, height);
        self.requested = requested;
        let actual = negotiate_resolution(&mut self.source, requested)?;

        if actual != self.actual {
            // rewinding across a mode switch would replay frames of the old size
            self.history.clear();
        }
        self.actual = actual;

        let change = ResolutionChange { requested, actual };
        Self::log_resolution(&change);
        Ok(change)
    }

    /// Frame to show right now, or `None` when nothing should be drawn.
    pub fn get_current_frame(&mut self) -> CameraResult<Option<Frame>> {
        match self.state {
            PlaybackState::Running => {
                let frame = match self.source.read() {
                    Ok(Some(frame)) if !frame.is_empty() => frame,
                    Ok(_) => return Err(CameraError::CaptureRead),
                    Err(e) => {
                        logger::error(&format!("Camera read failed: {}", e));
                        return Err(CameraError::CaptureRead);
                    }
                };
                self.history.append(frame.clone());
                self.last_frame = Some(frame.clone());
                Ok(Some(frame))
            }
            PlaybackState::Paused => Ok(self.paused_frame.clone()),
            PlaybackState::Stopped | PlaybackState::Uninitialized => Ok(None),
        }
    }

    /// Read and keep `n` frames from the device. Truncated skips are reported, not raised.
    pub fn skip_forward(&mut self, n: usize) -> CameraResult<SkipReport> {
        self.ensure_open()?;

        let report = self.history.step_forward(&mut self.source, n);
        if report.skipped > 0 {
            self.show(self.history.current().cloned());
        }
        logger::debug(&format!(
            "Skipped {} of {} frames forward",
            report.skipped, report.requested
        ));
        Ok(report)
    }

    /// Replay the frame `n` positions behind the cursor. Never touches the device.
    pub fn skip_backward(&mut self, n: usize) -> CameraResult<Frame> {
        self.ensure_open()?;

        match self.history.step_back(n) {
            Ok(frame) => {
                self.show(Some(frame.clone()));
                logger::debug(&format!("Skipped {} frames backward using buffer", n));
                Ok(frame)
            }
            Err(e) => {
                logger::debug(&format!("Cannot skip backward: {}", e));
                Err(e)
            }
        }
    }

    /// Positive `delta` skips forward, negative rewinds.
    pub fn skip_frames(&mut self, delta: i64) -> CameraResult<SkipOutcome> {
        let n = delta.unsigned_abs() as usize;
        if delta > 0 {
            self.skip_forward(n).map(SkipOutcome::Forward)
        } else if delta < 0 {
            self.skip_backward(n).map(SkipOutcome::Backward)
        } else {
            self.ensure_open()?;
            Ok(SkipOutcome::Unchanged)
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != PlaybackState::Uninitialized
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PlaybackState::Running | PlaybackState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlaybackState::Paused
    }

    pub fn device_index(&self) -> Option<i32> {
        self.device_index
    }

    pub fn current_resolution(&self) -> Resolution {
        self.actual
    }

    pub fn requested_resolution(&self) -> Resolution {
        self.requested
    }

    pub fn history(&self) -> &FrameBuffer {
        &self.history
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn show(&mut self, frame: Option<Frame>) {
        if frame.is_none() {
            return;
        }
        if self.state == PlaybackState::Paused {
            self.paused_frame = frame.clone();
        }
        self.last_frame = frame;
    }

    fn ensure_open(&self) -> CameraResult<()> {
        if self.state == PlaybackState::Uninitialized || !self.source.is_opened() {
            return Err(CameraError::NotInitialized);
        }
        Ok(())
    }

    fn log_resolution(change: &ResolutionChange) {
        logger::info(&format!("Resolution set to {}", change.actual));
        if !change.is_exact() {
            logger::warn(&format!(
                "Requested resolution {} but got {}",
                change.requested, change.actual
            ));
        }
    }
}

impl<S: CaptureSource> Drop for CameraController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{ReadOutcome, ScriptedSource};

    fn running(source: ScriptedSource) -> CameraController<ScriptedSource> {
        let mut camera = CameraController::new(source);
        camera.initialize(0).unwrap();
        camera.start().unwrap();
        camera
    }

    #[test]
    fn initialize_enters_stopped_and_applies_default_resolution() {
        let mut camera = CameraController::new(ScriptedSource::new());
        assert_eq!(camera.state(), PlaybackState::Uninitialized);

        let change = camera.initialize(0).unwrap();
        assert_eq!(camera.state(), PlaybackState::Stopped);
        assert_eq!(change.actual, Resolution::new(640, 480));
        assert!(change.is_exact());
        assert_eq!(camera.device_index(), Some(0));
        assert!(camera.is_initialized());
        assert!(!camera.is_running());
    }

    #[test]
    fn failed_open_reports_device_open() {
        let mut camera = CameraController::new(ScriptedSource::failing_open());
        match camera.initialize(3) {
            Err(CameraError::DeviceOpen { index }) => assert_eq!(index, 3),
            other => panic!("expected DeviceOpen, got {:?}", other),
        }
        assert_eq!(camera.state(), PlaybackState::Uninitialized);
    }

    #[test]
    fn empty_validation_frame_releases_device() {
        let source = ScriptedSource::with_script(vec![ReadOutcome::Empty], ReadOutcome::Frame);
        let mut camera = CameraController::new(source);

        assert!(matches!(
            camera.initialize(0),
            Err(CameraError::DeviceValidation { index: 0 })
        ));
        assert_eq!(camera.source().releases, 1);
        assert!(!camera.source().is_opened());
        assert_eq!(camera.state(), PlaybackState::Uninitialized);
    }

    #[test]
    fn failing_validation_read_releases_device() {
        let source = ScriptedSource::with_script(vec![ReadOutcome::Error], ReadOutcome::Frame);
        let mut camera = CameraController::new(source);

        assert!(matches!(
            camera.initialize(0),
            Err(CameraError::DeviceValidation { .. })
        ));
        assert_eq!(camera.source().releases, 1);
    }

    #[test]
    fn reinitialize_stops_previous_session() {
        let mut camera = running(ScriptedSource::new());
        camera.get_current_frame().unwrap();

        camera.initialize(1).unwrap();
        assert_eq!(camera.source().releases, 1);
        assert_eq!(camera.state(), PlaybackState::Stopped);
        assert!(camera.history().is_empty());
        assert_eq!(camera.device_index(), Some(1));
    }

    #[test]
    fn start_requires_initialize() {
        let mut camera = CameraController::new(ScriptedSource::new());
        assert!(matches!(camera.start(), Err(CameraError::NotInitialized)));
        assert!(matches!(camera.pause(), Err(CameraError::NotInitialized)));
        assert!(matches!(camera.resume(), Err(CameraError::NotInitialized)));
        assert!(matches!(camera.skip_frames(10), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn three_frames_fill_buffer_in_order() {
        let mut camera = running(ScriptedSource::new());
        for _ in 0..3 {
            assert!(camera.get_current_frame().unwrap().is_some());
        }
        assert_eq!(camera.history().len(), 3);
        assert_eq!(camera.history().cursor(), 2);
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut camera = running(ScriptedSource::new());
        camera.get_current_frame().unwrap();
        camera.start().unwrap();
        assert_eq!(camera.history().len(), 1);
    }

    #[test]
    fn start_while_paused_keeps_session() {
        let mut camera = running(ScriptedSource::new());
        for _ in 0..20 {
            camera.get_current_frame().unwrap();
        }
        camera.pause().unwrap();
        let paused = camera.get_current_frame().unwrap().map(|f| f.sequence());

        camera.start().unwrap();
        assert_eq!(camera.state(), PlaybackState::Paused);
        assert_eq!(camera.history().len(), 20);
        assert_eq!(camera.get_current_frame().unwrap().map(|f| f.sequence()), paused);
    }

    #[test]
    fn failed_negotiation_releases_device() {
        let mut source = ScriptedSource::new();
        source.fail_property = true;
        let mut camera = CameraController::new(source);

        assert!(matches!(camera.initialize(0), Err(CameraError::Backend(_))));
        assert_eq!(camera.source().releases, 1);
        assert!(!camera.source().is_opened());
        assert_eq!(camera.state(), PlaybackState::Uninitialized);
        assert_eq!(camera.device_index(), None);
    }

    #[test]
    fn paused_frame_repeats_without_buffer_growth() {
        let mut camera = running(ScriptedSource::new());
        camera.get_current_frame().unwrap();
        let shown = camera.get_current_frame().unwrap().unwrap();

        camera.pause().unwrap();
        assert!(camera.is_paused());
        let reads = camera.source().reads;
        for _ in 0..5 {
            let frame = camera.get_current_frame().unwrap().unwrap();
            assert_eq!(frame.sequence(), shown.sequence());
        }
        assert_eq!(camera.history().len(), 2);
        assert_eq!(camera.source().reads, reads);
    }

    #[test]
    fn pause_before_any_frame_yields_nothing() {
        let mut camera = running(ScriptedSource::new());
        camera.pause().unwrap();
        assert!(camera.get_current_frame().unwrap().is_none());
    }

    #[test]
    fn pause_and_resume_are_noops_out_of_state() {
        let mut camera = CameraController::new(ScriptedSource::new());
        camera.initialize(0).unwrap();
        camera.pause().unwrap();
        assert_eq!(camera.state(), PlaybackState::Stopped);
        camera.resume().unwrap();
        assert_eq!(camera.state(), PlaybackState::Stopped);

        camera.start().unwrap();
        camera.resume().unwrap();
        assert_eq!(camera.state(), PlaybackState::Running);
    }

    #[test]
    fn resume_keeps_buffer() {
        let mut camera = running(ScriptedSource::new());
        for _ in 0..4 {
            camera.get_current_frame().unwrap();
        }
        camera.pause().unwrap();
        camera.resume().unwrap();
        assert_eq!(camera.history().len(), 4);
        camera.get_current_frame().unwrap();
        assert_eq!(camera.history().len(), 5);
    }

    #[test]
    fn capture_failure_while_running_is_an_error() {
        let source = ScriptedSource::with_script(
            vec![ReadOutcome::Frame, ReadOutcome::Frame],
            ReadOutcome::Empty,
        );
        let mut camera = running(source);
        assert!(camera.get_current_frame().unwrap().is_some());
        assert!(matches!(camera.get_current_frame(), Err(CameraError::CaptureRead)));
    }

    #[test]
    fn read_error_while_running_is_capture_read() {
        let source = ScriptedSource::with_script(vec![ReadOutcome::Frame], ReadOutcome::Error);
        let mut camera = running(source);
        assert!(matches!(camera.get_current_frame(), Err(CameraError::CaptureRead)));
    }

    #[test]
    fn stop_then_get_frame_is_absent() {
        let mut camera = running(ScriptedSource::new());
        camera.get_current_frame().unwrap();
        camera.stop();
        assert_eq!(camera.state(), PlaybackState::Uninitialized);
        assert!(camera.get_current_frame().unwrap().is_none());
        assert!(camera.history().is_empty());
        assert_eq!(camera.source().releases, 1);

        camera.stop();
        assert_eq!(camera.source().releases, 1);
        assert!(matches!(camera.start(), Err(CameraError::NotInitialized)));
    }

    #[test]
    fn stopped_session_returns_no_frame() {
        let mut camera = CameraController::new(ScriptedSource::new());
        camera.initialize(0).unwrap();
        assert!(camera.get_current_frame().unwrap().is_none());
    }

    #[test]
    fn unsupported_resolution_falls_back_with_warning() {
        let source = ScriptedSource::supporting(&[Resolution::new(640, 480), Resolution::new(1280, 720)]);
        let mut camera = CameraController::new(source);
        camera.initialize(0).unwrap();

        let change = camera.set_resolution(1920, 1080).unwrap();
        assert_eq!(change.actual, Resolution::new(1280, 720));
        assert!(!change.is_exact());
        assert_eq!(camera.current_resolution(), Resolution::new(1280, 720));
        assert_eq!(camera.requested_resolution(), Resolution::new(1920, 1080));
    }

    #[test]
    fn set_resolution_needs_open_device() {
        let mut camera = CameraController::new(ScriptedSource::new());
        assert!(matches!(
            camera.set_resolution(1280, 720),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn requested_resolution_survives_reinitialize() {
        let mut camera = CameraController::new(ScriptedSource::new());
        camera.initialize(0).unwrap();
        camera.set_resolution(1280, 720).unwrap();
        camera.stop();

        let change = camera.initialize(0).unwrap();
        assert_eq!(change.requested, Resolution::new(1280, 720));
        assert_eq!(camera.current_resolution(), Resolution::new(1280, 720));
    }

    #[test]
    fn resolution_switch_drops_history() {
        let mut camera = running(ScriptedSource::new());
        for _ in 0..5 {
            camera.get_current_frame().unwrap();
        }
        camera.set_resolution(640, 480).unwrap();
        assert_eq!(camera.history().len(), 5);

        camera.set_resolution(1280, 720).unwrap();
        assert!(camera.history().is_empty());
    }

    #[test]
    fn rewind_replays_buffered_frame() {
        let mut camera = running(ScriptedSource::new());
        let mut seen = Vec::new();
        for _ in 0..15 {
            seen.push(camera.get_current_frame().unwrap().unwrap().sequence());
        }

        match camera.skip_frames(-10).unwrap() {
            SkipOutcome::Backward(frame) => assert_eq!(frame.sequence(), seen[4]),
            other => panic!("expected backward skip, got {:?}", other),
        }
        assert_eq!(camera.history().cursor(), 4);
        assert!(matches!(
            camera.skip_frames(-10),
            Err(CameraError::InsufficientHistory { requested: 10, available: 4 })
        ));
    }

    #[test]
    fn rewind_while_paused_replaces_paused_frame() {
        let mut camera = running(ScriptedSource::new());
        let mut seen = Vec::new();
        for _ in 0..12 {
            seen.push(camera.get_current_frame().unwrap().unwrap().sequence());
        }
        camera.pause().unwrap();
        camera.skip_backward(10).unwrap();

        let shown = camera.get_current_frame().unwrap().unwrap();
        assert_eq!(shown.sequence(), seen[1]);
    }

    #[test]
    fn forward_skip_reads_and_buffers_frames() {
        let mut camera = running(ScriptedSource::new());
        camera.get_current_frame().unwrap();
        let before = camera.source().next_sequence();

        match camera.skip_frames(10).unwrap() {
            SkipOutcome::Forward(report) => {
                assert_eq!(report.skipped, 10);
                assert!(!report.is_partial());
            }
            other => panic!("expected forward skip, got {:?}", other),
        }
        assert_eq!(camera.source().next_sequence(), before + 10);
        assert_eq!(camera.history().len(), 11);
        assert_eq!(camera.history().cursor(), 10);
    }

    #[test]
    fn forward_skip_is_truncated_not_fatal() {
        let source = ScriptedSource::with_script(
            vec![ReadOutcome::Frame, ReadOutcome::Frame, ReadOutcome::Frame],
            ReadOutcome::Empty,
        );
        let mut camera = running(source);

        let report = camera.skip_forward(10).unwrap();
        assert_eq!(report.skipped, 2);
        assert!(report.is_partial());
        assert_eq!(camera.state(), PlaybackState::Running);
    }

    #[test]
    fn zero_skip_changes_nothing() {
        let mut camera = running(ScriptedSource::new());
        assert!(matches!(camera.skip_frames(0).unwrap(), SkipOutcome::Unchanged));
    }
}
