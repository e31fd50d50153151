pub mod arena;
pub mod assets;
pub mod bounds;
pub mod frame;
pub mod transform;
