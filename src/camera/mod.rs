pub mod frame;
pub mod source;

pub use frame::{Frame, FrameLease, FramePool, PoolStats};
pub use source::{CameraSettings, SyntheticCamera};
