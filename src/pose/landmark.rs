use glam::Vec3;
use strum::{EnumCount, IntoEnumIterator};

/// The named anatomical points reported by the pose detector.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    strum::EnumCount,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Landmark {
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    pub fn name(&self) -> &'static str {
        (*self).into()
    }

    pub fn iter() -> impl Iterator<Item = Landmark> {
        <Self as IntoEnumIterator>::iter()
    }
}

/// An estimated 3D position with the detector's confidence that the point is
/// actually in frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkPoint {
    pub position: Vec3,
    pub likelihood: f32,
}

impl Default for LandmarkPoint {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            likelihood: 0.0,
        }
    }
}

impl LandmarkPoint {
    pub fn new(position: Vec3, likelihood: f32) -> Self {
        Self {
            position,
            likelihood,
        }
    }

    pub fn is_confident(&self, threshold: f32) -> bool {
        self.likelihood >= threshold
    }
}

/// One detection result: a point for every landmark, produced for a single
/// camera frame and consumed immediately.
#[derive(Clone, Debug)]
pub struct PoseResult {
    pub frame_sequence: u64,
    points: [LandmarkPoint; Landmark::COUNT],
}

impl PoseResult {
    pub fn new(frame_sequence: u64, points: [LandmarkPoint; Landmark::COUNT]) -> Self {
        Self {
            frame_sequence,
            points,
        }
    }

    pub fn get(&self, landmark: Landmark) -> &LandmarkPoint {
        &self.points[landmark as usize]
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn average_likelihood(&self) -> f32 {
        let sum: f32 = self.points.iter().map(|p| p.likelihood).sum();
        sum / Landmark::COUNT as f32
    }
}

impl Default for PoseResult {
    fn default() -> Self {
        Self {
            frame_sequence: 0,
            points: [LandmarkPoint::default(); Landmark::COUNT],
        }
    }
}
