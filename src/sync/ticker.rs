use std::time::{Duration, Instant};

/// Periodic frame timer polled from the UI loop.
///
/// Nothing runs in the background: the loop asks how long it may block
/// waiting for input, then asks whether a tick came due.
pub struct FrameTicker {
    interval: Duration,
    next_due: Option<Instant>,
    ticks: u64,
    window_start: Instant,
    window_ticks: u32,
    fps: f64,
}

impl FrameTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
            ticks: 0,
            window_start: Instant::now(),
            window_ticks: 0,
            fps: 0.0,
        }
    }

    /// First tick fires immediately. Restarting an active ticker is a no-op.
    pub fn start(&mut self) {
        if self.next_due.is_none() {
            let now = Instant::now();
            self.next_due = Some(now);
            self.window_start = now;
            self.window_ticks = 0;
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
        self.fps = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// How long the caller may block before the next tick, capped at `max`.
    pub fn poll_timeout(&self, max: Duration) -> Duration {
        match self.next_due {
            Some(due) => due.saturating_duration_since(Instant::now()).min(max),
            None => max,
        }
    }

    pub fn take_due(&mut self) -> bool {
        self.take_due_at(Instant::now())
    }

    /// True once per elapsed interval. After a stall longer than three
    /// intervals the schedule restarts from `now` instead of bursting.
    pub fn take_due_at(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }

        self.next_due = if now > due + self.interval * 3 {
            Some(now + self.interval)
        } else {
            Some(due + self.interval)
        };
        self.ticks += 1;
        self.record_tick(now);
        true
    }

    fn record_tick(&mut self, now: Instant) {
        self.window_ticks += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.window_ticks as f64 / elapsed.as_secs_f64();
            self.window_start = now;
            self.window_ticks = 0;
        }
    }

    /// Ticks per second over the last full window; 0 while stopped.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
