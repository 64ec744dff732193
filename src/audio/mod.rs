// Audio module - frame acquisition for the capture engine

pub mod source;

// Re-export commonly used types for convenience
pub use source::{FrameRead, FrameSource, Segment, SyntheticFrameSource, WavFrameSource};
