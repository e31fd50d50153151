use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// A single tick of the frame clock.
#[derive(Clone, Copy, Debug)]
pub struct FrameTick {
    /// Tick number, starting at 0.
    pub sequence: u64,
    /// Seconds since the clock was started.
    pub elapsed: f32,
    /// Seconds since the previous tick.
    pub delta: f32,
}

/// Produces monotonic ticks, paced to a target rate. The first tick fires
/// immediately; every subsequent call sleeps out the remainder of the frame
/// interval before returning.
pub struct FrameClock {
    interval: Duration,
    start: Instant,
    last: Option<Instant>,
    sequence: u64,
}

impl FrameClock {
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            interval: Duration::from_secs_f64(1.0 / target_fps as f64),
            start: Instant::now(),
            last: None,
            sequence: 0,
        }
    }

    pub fn tick(&mut self) -> FrameTick {
        if let Some(last) = self.last {
            let since = last.elapsed();
            if since < self.interval {
                std::thread::sleep(self.interval - since);
            }
        }

        let now = Instant::now();
        let delta = match self.last {
            Some(last) => (now - last).as_secs_f32(),
            None => 0.0,
        };

        let tick = FrameTick {
            sequence: self.sequence,
            elapsed: (now - self.start).as_secs_f32(),
            delta,
        };

        self.last = Some(now);
        self.sequence += 1;

        tick
    }
}

/// Explicit cancellation token for the frame loop. Cloning yields another
/// handle to the same flag, so teardown code can cancel the loop from outside.
#[derive(Clone, Default)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
