use std::collections::VecDeque;

use super::error::{CameraError, CameraResult};
use crate::capture::{CaptureSource, Frame};

/// Result of a forward skip. `skipped < requested` means the device ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipReport {
    pub requested: usize,
    pub skipped: usize,
}

impl SkipReport {
    pub fn is_partial(&self) -> bool {
        self.skipped < self.requested
    }
}

/// Bounded history of recent frames with a cursor for limited rewind.
///
/// A live feed cannot seek, so rewinding replays frames kept here and
/// never goes back to the device. At most `capacity` frames stay resident;
/// the oldest is dropped first.
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
    cursor: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Append a freshly captured frame and make it current.
    ///
    /// Eviction and cursor compensation happen here together: at capacity
    /// the front frame goes and the cursor shifts down with the sequence
    /// before the new frame lands.
    pub fn append(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        self.frames.push_back(frame);
        self.cursor = self.frames.len() - 1;
    }

    /// Move the cursor `n` frames back and return the frame found there.
    pub fn step_back(&mut self, n: usize) -> CameraResult<Frame> {
        if self.frames.is_empty() || n > self.cursor {
            return Err(CameraError::InsufficientHistory {
                requested: n,
                available: self.cursor,
            });
        }
        self.cursor -= n;
        Ok(self.frames[self.cursor].clone())
    }

    /// Pull `n` frames from the device, keeping each one, and stop early
    /// if the device has nothing to give.
    pub fn step_forward<S: CaptureSource>(&mut self, source: &mut S, n: usize) -> SkipReport {
        let mut skipped = 0;
        for _ in 0..n {
            match source.read() {
                Ok(Some(frame)) if !frame.is_empty() => {
                    self.append(frame);
                    skipped += 1;
                }
                Ok(_) => {
                    crate::utils::logger::debug("Forward skip stopped: device returned no frame");
                    break;
                }
                Err(e) => {
                    crate::utils::logger::warn(&format!("Forward skip stopped: {}", e));
                    break;
                }
            }
        }
        SkipReport {
            requested: n,
            skipped,
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.cursor)
    }

    /// Frames in capture order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{ReadOutcome, ScriptedSource};
    use crate::capture::PixelFormat;

    fn frame(sequence: u64) -> Frame {
        Frame::new(vec![sequence as u8; 3], 1, 1, PixelFormat::Bgr8, sequence)
    }

    fn sequences(buffer: &FrameBuffer) -> Vec<u64> {
        buffer.iter().map(Frame::sequence).collect()
    }

    #[test]
    fn append_makes_newest_frame_current() {
        let mut buffer = FrameBuffer::new(100);
        for i in 0..3 {
            buffer.append(frame(i));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.cursor(), 2);
        assert_eq!(buffer.current().map(Frame::sequence), Some(2));
    }

    #[test]
    fn never_exceeds_capacity_and_keeps_latest_in_order() {
        let mut buffer = FrameBuffer::new(100);
        for i in 0..250 {
            buffer.append(frame(i));
            assert!(buffer.len() <= 100);
        }
        assert_eq!(buffer.len(), 100);
        assert_eq!(sequences(&buffer), (150..250).collect::<Vec<_>>());
        assert_eq!(buffer.cursor(), 99);
    }

    #[test]
    fn eviction_keeps_cursor_on_valid_index_after_rewind() {
        let mut buffer = FrameBuffer::new(3);
        for i in 0..3 {
            buffer.append(frame(i));
        }
        assert_eq!(buffer.step_back(2).unwrap().sequence(), 0);
        assert_eq!(buffer.cursor(), 0);

        // cursor sits on the frame about to be evicted; it floors at zero
        buffer.append(frame(3));
        assert_eq!(sequences(&buffer), vec![1, 2, 3]);
        assert_eq!(buffer.cursor(), 2);
        assert_eq!(buffer.step_back(2).unwrap().sequence(), 1);
    }

    #[test]
    fn step_back_returns_frame_from_n_appends_ago() {
        let mut buffer = FrameBuffer::new(100);
        for i in 0..20 {
            buffer.append(frame(i));
        }
        let rewound = buffer.step_back(10).unwrap();
        assert_eq!(rewound.sequence(), 9);
        assert_eq!(buffer.cursor(), 9);

        let further = buffer.step_back(9).unwrap();
        assert_eq!(further.sequence(), 0);
    }

    #[test]
    fn step_back_past_history_fails_without_moving() {
        let mut buffer = FrameBuffer::new(100);
        for i in 0..5 {
            buffer.append(frame(i));
        }
        match buffer.step_back(5) {
            Err(CameraError::InsufficientHistory { requested, available }) => {
                assert_eq!(requested, 5);
                assert_eq!(available, 4);
            }
            other => panic!("expected InsufficientHistory, got {:?}", other),
        }
        assert_eq!(buffer.cursor(), 4);
    }

    #[test]
    fn step_back_on_empty_buffer_fails() {
        let mut buffer = FrameBuffer::new(100);
        assert!(matches!(
            buffer.step_back(1),
            Err(CameraError::InsufficientHistory { .. })
        ));
    }

    #[test]
    fn clear_resets_everything() {
        let mut buffer = FrameBuffer::new(100);
        for i in 0..10 {
            buffer.append(frame(i));
        }
        buffer.clear();
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.cursor(), 0);
        assert!(buffer.current().is_none());
    }

    #[test]
    fn step_forward_appends_each_read_frame() {
        let mut source = ScriptedSource::new();
        source.open(0).unwrap();
        let mut buffer = FrameBuffer::new(100);

        let report = buffer.step_forward(&mut source, 10);
        assert_eq!(report, SkipReport { requested: 10, skipped: 10 });
        assert!(!report.is_partial());
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.cursor(), 9);
    }

    #[test]
    fn step_forward_truncates_when_device_runs_dry() {
        let mut source = ScriptedSource::with_script(
            vec![ReadOutcome::Frame, ReadOutcome::Frame, ReadOutcome::Empty],
            ReadOutcome::Frame,
        );
        source.open(0).unwrap();
        let mut buffer = FrameBuffer::new(100);

        let report = buffer.step_forward(&mut source, 10);
        assert_eq!(report.skipped, 2);
        assert!(report.is_partial());
        assert_eq!(source.reads, 3);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn step_forward_stops_on_read_error() {
        let mut source = ScriptedSource::with_script(vec![ReadOutcome::Frame], ReadOutcome::Error);
        source.open(0).unwrap();
        let mut buffer = FrameBuffer::new(100);

        let report = buffer.step_forward(&mut source, 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(buffer.len(), 1);
    }
}
