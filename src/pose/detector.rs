use glam::{Vec2, Vec3};

use crate::camera::frame::Frame;

use super::landmark::{Landmark, LandmarkPoint, PoseResult};

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Detection failed: {0}")]
    Detection(String),
}

/// The detection seam. Implementations run on the analyzer worker thread,
/// one frame at a time; from the submitting side the call is asynchronous.
pub trait PoseDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<PoseResult, PoseError>;
}

/// Deterministic stand-in detector: a T-pose whose arms swing with the frame
/// timestamp. Identical frames always produce identical results.
pub struct SyntheticPoseDetector {
    swing_hz: f32,
}

impl SyntheticPoseDetector {
    pub fn new(swing_hz: f32) -> Self {
        Self { swing_hz }
    }
}

impl Default for SyntheticPoseDetector {
    fn default() -> Self {
        Self { swing_hz: 0.25 }
    }
}

impl PoseDetector for SyntheticPoseDetector {
    fn detect(&mut self, frame: &Frame) -> Result<PoseResult, PoseError> {
        if frame.data.len() != (frame.width * frame.height) as usize {
            return Err(PoseError::Detection("truncated frame".to_string()));
        }
        let luma: u64 = frame.data.iter().map(|&v| v as u64).sum();
        if luma == 0 {
            return Err(PoseError::Detection("blank frame".to_string()));
        }

        let theta = (std::f32::consts::TAU * self.swing_hz * frame.elapsed).sin() * 0.5;

        let mut points = [LandmarkPoint::default(); Landmark::COUNT];
        for landmark in Landmark::iter() {
            let mut position = rest_position(landmark);
            if let Some((pivot, sign)) = swing_pivot(landmark) {
                position = rotate_about(position, rest_position(pivot), sign * theta);
            }
            points[landmark as usize] = LandmarkPoint::new(position, likelihood(landmark));
        }

        Ok(PoseResult::new(frame.sequence, points))
    }
}

/// Rotate `point` around `pivot` in the XY plane.
fn rotate_about(point: Vec3, pivot: Vec3, angle: f32) -> Vec3 {
    let offset = Vec2::new(point.x - pivot.x, point.y - pivot.y);
    let rotated = Vec2::from_angle(angle).rotate(offset);
    Vec3::new(pivot.x + rotated.x, pivot.y + rotated.y, point.z)
}

/// Arm landmarks swing around their shoulder; everything else stays put.
fn swing_pivot(landmark: Landmark) -> Option<(Landmark, f32)> {
    use Landmark::*;
    match landmark {
        LeftElbow | LeftWrist | LeftPinky | LeftIndex | LeftThumb => Some((LeftShoulder, 1.0)),
        RightElbow | RightWrist | RightPinky | RightIndex | RightThumb => {
            Some((RightShoulder, -1.0))
        }
        _ => None,
    }
}

fn likelihood(landmark: Landmark) -> f32 {
    use Landmark::*;
    match landmark {
        LeftPinky | RightPinky | LeftIndex | RightIndex | LeftThumb | RightThumb | LeftHeel
        | RightHeel | LeftFootIndex | RightFootIndex => 0.8,
        _ => 0.95,
    }
}

/// T-pose rest positions in meters, origin between the hips, y up.
fn rest_position(landmark: Landmark) -> Vec3 {
    use Landmark::*;
    match landmark {
        Nose => Vec3::new(0.0, 0.75, 0.05),
        LeftEyeInner => Vec3::new(-0.02, 0.78, 0.04),
        LeftEye => Vec3::new(-0.04, 0.78, 0.04),
        LeftEyeOuter => Vec3::new(-0.06, 0.78, 0.03),
        RightEyeInner => Vec3::new(0.02, 0.78, 0.04),
        RightEye => Vec3::new(0.04, 0.78, 0.04),
        RightEyeOuter => Vec3::new(0.06, 0.78, 0.03),
        LeftEar => Vec3::new(-0.08, 0.76, 0.0),
        RightEar => Vec3::new(0.08, 0.76, 0.0),
        MouthLeft => Vec3::new(-0.02, 0.72, 0.04),
        MouthRight => Vec3::new(0.02, 0.72, 0.04),
        LeftShoulder => Vec3::new(-0.2, 0.55, 0.0),
        RightShoulder => Vec3::new(0.2, 0.55, 0.0),
        LeftElbow => Vec3::new(-0.45, 0.55, 0.0),
        RightElbow => Vec3::new(0.45, 0.55, 0.0),
        LeftWrist => Vec3::new(-0.7, 0.55, 0.0),
        RightWrist => Vec3::new(0.7, 0.55, 0.0),
        LeftPinky => Vec3::new(-0.78, 0.54, 0.0),
        RightPinky => Vec3::new(0.78, 0.54, 0.0),
        LeftIndex => Vec3::new(-0.79, 0.56, 0.0),
        RightIndex => Vec3::new(0.79, 0.56, 0.0),
        LeftThumb => Vec3::new(-0.76, 0.57, 0.02),
        RightThumb => Vec3::new(0.76, 0.57, 0.02),
        LeftHip => Vec3::new(-0.12, 0.0, 0.0),
        RightHip => Vec3::new(0.12, 0.0, 0.0),
        LeftKnee => Vec3::new(-0.13, -0.45, 0.0),
        RightKnee => Vec3::new(0.13, -0.45, 0.0),
        LeftAnkle => Vec3::new(-0.14, -0.85, 0.0),
        RightAnkle => Vec3::new(0.14, -0.85, 0.0),
        LeftHeel => Vec3::new(-0.14, -0.9, -0.03),
        RightHeel => Vec3::new(0.14, -0.9, -0.03),
        LeftFootIndex => Vec3::new(-0.14, -0.9, 0.12),
        RightFootIndex => Vec3::new(0.14, -0.9, 0.12),
    }
}
