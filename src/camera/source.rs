use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::pose::AnalyzerQueue;

use super::frame::{Frame, FramePool};

#[derive(Clone, Copy, Debug)]
pub struct CameraSettings {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 320,
            height: 240,
        }
    }
}

/// A capture thread that produces frames at a fixed rate and hands them to
/// the analyzer. Stands in for a hardware camera; the delivery contract is
/// the same: frames arrive at the camera's pace whether or not anyone keeps
/// up, and a frame that cannot be leased is dropped at the source.
pub struct SyntheticCamera {
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SyntheticCamera {
    pub fn start(settings: CameraSettings, pool: FramePool, queue: AnalyzerQueue) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicU64::new(0));

        let worker = {
            let stop = Arc::clone(&stop);
            let dropped = Arc::clone(&dropped);
            thread::Builder::new()
                .name("camera-capture".to_string())
                .spawn(move || {
                    let interval = Duration::from_secs_f64(1.0 / settings.fps.max(1) as f64);
                    let start = Instant::now();
                    let mut sequence = 0_u64;

                    info!(
                        "Camera capture running at {}x{} {} fps",
                        settings.width, settings.height, settings.fps
                    );

                    while !stop.load(Ordering::Acquire) {
                        let frame = synthesize(sequence, start.elapsed().as_secs_f32(), &settings);
                        match pool.acquire(frame) {
                            Some(lease) => {
                                // A full queue drops the lease inside submit;
                                // the frame is released either way.
                                let _ = queue.submit(lease);
                            }
                            None => {
                                dropped.fetch_add(1, Ordering::Relaxed);
                            }
                        }

                        sequence += 1;
                        thread::sleep(interval);
                    }
                })
                .expect("spawn camera capture thread")
        };

        Self {
            stop,
            dropped,
            worker: Some(worker),
        }
    }

    /// Frames dropped because every pool slot was in flight.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop capturing and join the thread. Returns the drop count.
    pub fn stop(mut self) -> u64 {
        self.halt();
        self.dropped()
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Camera capture thread panicked");
            }
        }
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.halt();
    }
}

/// A moving diagonal gradient; cheap, and different on every frame.
fn synthesize(sequence: u64, elapsed: f32, settings: &CameraSettings) -> Frame {
    let width = settings.width;
    let height = settings.height;
    let mut data = vec![0_u8; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            data[(y * width + x) as usize] = ((x + y) as u64 + sequence) as u8;
        }
    }

    Frame {
        sequence,
        elapsed,
        width,
        height,
        data,
    }
}
