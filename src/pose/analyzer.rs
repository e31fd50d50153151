use std::{
    sync::{
        Arc, Mutex,
        mpsc::{self, SyncSender, TrySendError},
    },
    thread,
};

use tracing::{debug, warn};

use crate::camera::frame::FrameLease;

use super::{
    detector::{PoseDetector, PoseError},
    landmark::{Landmark, PoseResult},
};

/// Receives detection outcomes on the analyzer worker thread. Callbacks must
/// not block; the worker handles one frame at a time.
pub trait PoseObserver: Send {
    fn on_pose(&mut self, pose: &PoseResult);

    fn on_error(&mut self, error: &PoseError) {
        let _ = error;
    }
}

/// Shared slot holding the most recent detection result, for consumers that
/// only ever want the latest value (e.g. an overlay).
#[derive(Clone, Default)]
pub struct LatestPose(Arc<Mutex<Option<PoseResult>>>);

impl LatestPose {
    pub fn publish(&self, pose: PoseResult) {
        *self.0.lock().expect("latest pose lock") = Some(pose);
    }

    pub fn snapshot(&self) -> Option<PoseResult> {
        self.0.lock().expect("latest pose lock").clone()
    }
}

/// Default observer: logs the nose position and publishes the result for the
/// overlay. Detection failures are logged and dropped.
pub struct LoggingObserver {
    latest: LatestPose,
}

impl LoggingObserver {
    pub fn new(latest: LatestPose) -> Self {
        Self { latest }
    }
}

impl PoseObserver for LoggingObserver {
    fn on_pose(&mut self, pose: &PoseResult) {
        debug!(
            "Frame {}: {} 3D position {:?}",
            pose.frame_sequence,
            Landmark::Nose.name(),
            pose.get(Landmark::Nose).position
        );
        self.latest.publish(pose.clone());
    }

    fn on_error(&mut self, error: &PoseError) {
        warn!("Pose detection failed: {error}");
    }
}

/// Clonable submission side of the analyzer. Frame sources keep one of these;
/// the analyzer itself owns the worker.
#[derive(Clone)]
pub struct AnalyzerQueue {
    tx: SyncSender<FrameLease>,
}

impl AnalyzerQueue {
    /// Hand a frame to the analyzer. Returns false when the queue is full or
    /// the worker is gone; in both cases the lease is dropped here and the
    /// frame is released.
    pub fn submit(&self, lease: FrameLease) -> bool {
        match self.tx.try_send(lease) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Owns the single-threaded pose analysis worker. Frames are queued through
/// an [AnalyzerQueue] with bounded depth, detected one at a time, and
/// released when their lease drops at the end of processing, whatever the
/// outcome.
pub struct PoseAnalyzer {
    queue: Option<AnalyzerQueue>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PoseAnalyzer {
    pub fn spawn(
        mut detector: impl PoseDetector + 'static,
        mut observer: impl PoseObserver + 'static,
        queue_depth: usize,
    ) -> Self {
        let (tx, rx) = mpsc::sync_channel::<FrameLease>(queue_depth.max(1));

        let worker = thread::Builder::new()
            .name("pose-analyzer".to_string())
            .spawn(move || {
                while let Ok(lease) = rx.recv() {
                    match detector.detect(lease.frame()) {
                        Ok(pose) => observer.on_pose(&pose),
                        Err(err) => observer.on_error(&err),
                    }
                    // `lease` drops here, releasing the frame. If the
                    // detector panics instead, unwinding drops it all the
                    // same, and pending leases go down with the channel.
                }
            })
            .expect("spawn pose analyzer worker");

        Self {
            queue: Some(AnalyzerQueue { tx }),
            worker: Some(worker),
        }
    }

    pub fn queue(&self) -> AnalyzerQueue {
        self.queue.clone().expect("analyzer queue taken")
    }

    /// Stop accepting frames and wait for the worker to drain. Queue clones
    /// held by frame sources keep the worker alive, so sources must be
    /// stopped first.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Pose analyzer worker panicked");
            }
        }
    }
}

impl Drop for PoseAnalyzer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::frame::{FramePool, tests::test_frame};
    use crate::pose::detector::SyntheticPoseDetector;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{Receiver, Sender};

    #[derive(Clone, Default)]
    struct CountingObserver {
        poses: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
    }

    impl PoseObserver for CountingObserver {
        fn on_pose(&mut self, _pose: &PoseResult) {
            self.poses.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&mut self, _error: &PoseError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Fails on every odd frame sequence.
    struct FlakyDetector;

    impl PoseDetector for FlakyDetector {
        fn detect(
            &mut self,
            frame: &crate::camera::frame::Frame,
        ) -> Result<PoseResult, PoseError> {
            if frame.sequence % 2 == 1 {
                Err(PoseError::Detection("odd frame".to_string()))
            } else {
                Ok(PoseResult::default())
            }
        }
    }

    /// Signals entry, then blocks until the test allows it to proceed.
    struct GatedDetector {
        started: Sender<()>,
        gate: Receiver<()>,
    }

    impl PoseDetector for GatedDetector {
        fn detect(
            &mut self,
            _frame: &crate::camera::frame::Frame,
        ) -> Result<PoseResult, PoseError> {
            self.started.send(()).ok();
            self.gate.recv().ok();
            Ok(PoseResult::default())
        }
    }

    struct PanickingDetector;

    impl PoseDetector for PanickingDetector {
        fn detect(
            &mut self,
            _frame: &crate::camera::frame::Frame,
        ) -> Result<PoseResult, PoseError> {
            panic!("detector exploded");
        }
    }

    #[test]
    fn every_frame_is_released_on_success() {
        let pool = FramePool::new(8);
        let observer = CountingObserver::default();
        let analyzer = PoseAnalyzer::spawn(SyntheticPoseDetector::default(), observer.clone(), 8);
        let queue = analyzer.queue();

        for sequence in 0..5 {
            let lease = pool.acquire(test_frame(sequence)).unwrap();
            assert!(queue.submit(lease));
        }

        drop(queue);
        analyzer.shutdown();

        let stats = pool.stats();
        assert_eq!(stats.acquired, 5);
        assert!(stats.balanced());
        assert_eq!(observer.poses.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn every_frame_is_released_on_detector_error() {
        let pool = FramePool::new(8);
        let observer = CountingObserver::default();
        let analyzer = PoseAnalyzer::spawn(FlakyDetector, observer.clone(), 8);
        let queue = analyzer.queue();

        for sequence in 0..6 {
            let lease = pool.acquire(test_frame(sequence)).unwrap();
            assert!(queue.submit(lease));
        }

        drop(queue);
        analyzer.shutdown();

        assert!(pool.stats().balanced());
        assert_eq!(observer.poses.load(Ordering::SeqCst), 3);
        assert_eq!(observer.errors.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn overflowing_frames_are_released_immediately() {
        let pool = FramePool::new(8);
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel();
        let detector = GatedDetector {
            started: started_tx,
            gate: gate_rx,
        };
        let analyzer = PoseAnalyzer::spawn(detector, CountingObserver::default(), 1);
        let queue = analyzer.queue();

        // First frame occupies the worker, second fills the queue.
        assert!(queue.submit(pool.acquire(test_frame(0)).unwrap()));
        started_rx.recv().unwrap();
        assert!(queue.submit(pool.acquire(test_frame(1)).unwrap()));

        // The third has nowhere to go and must be released on the spot.
        let before = pool.stats().released;
        assert!(!queue.submit(pool.acquire(test_frame(2)).unwrap()));
        assert_eq!(pool.stats().released, before + 1);

        gate_tx.send(()).unwrap();
        gate_tx.send(()).unwrap();
        drop(queue);
        analyzer.shutdown();

        assert!(pool.stats().balanced());
    }

    #[test]
    fn frames_are_released_when_the_detector_panics() {
        let pool = FramePool::new(8);
        let analyzer = PoseAnalyzer::spawn(PanickingDetector, CountingObserver::default(), 4);
        let queue = analyzer.queue();

        for sequence in 0..3 {
            let lease = pool.acquire(test_frame(sequence)).unwrap();
            // Accepted or not, the frame must end up released.
            let _ = queue.submit(lease);
        }

        drop(queue);
        analyzer.shutdown();

        assert!(pool.stats().balanced());
        assert_eq!(pool.stats().acquired, 3);
    }

    #[test]
    fn latest_pose_keeps_only_the_newest_result() {
        let latest = LatestPose::default();
        assert!(latest.snapshot().is_none());

        latest.publish(PoseResult::new(
            1,
            [Default::default(); Landmark::COUNT],
        ));
        latest.publish(PoseResult::new(
            2,
            [Default::default(); Landmark::COUNT],
        ));

        assert_eq!(latest.snapshot().unwrap().frame_sequence, 2);
    }
}
