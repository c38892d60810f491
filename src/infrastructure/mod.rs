pub mod registry;
pub mod viewer_state;

pub use registry::{ImageCache, MeasurementRegistry, SegmentationRegistry};
pub use viewer_state::ViewerState;
