pub mod xnat_client;

pub use xnat_client::{ArchiveUploader, CollectionType, UploadRequest, XnatClient};
