pub mod snapshot_loader;

pub use snapshot_loader::{load_collection_file, load_snapshot};
