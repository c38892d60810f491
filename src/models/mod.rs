pub mod collection;
pub mod loaders;
pub mod measurement;
pub mod segmentation;
pub mod session;
pub mod snapshot;
pub mod tool_type;

pub use collection::{
    Handle, ImageCollectionEntry, ImageMeasurement, ImageReference, MeasurementCollection,
    MeasurementData, MeasurementValue,
};
pub use loaders::{load_collection_file, load_snapshot};
pub use measurement::{CachedStats, DisplayText, Measurement, Point};
pub use segmentation::{
    CachedImage, CachedVolume, NamedStat, Segment, Segmentation, SegmentationRepresentation,
};
pub use session::{DisplaySetInfo, SessionContext, SessionMap};
pub use snapshot::ViewerSnapshot;
pub use tool_type::ToolType;
