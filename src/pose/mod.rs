pub mod analyzer;
pub mod detector;
pub mod landmark;

pub use analyzer::{AnalyzerQueue, LatestPose, LoggingObserver, PoseAnalyzer, PoseObserver};
pub use detector::{PoseDetector, PoseError, SyntheticPoseDetector};
pub use landmark::{Landmark, LandmarkPoint, PoseResult};
