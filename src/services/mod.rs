pub mod collection_builder;
pub mod color;
pub mod csv_report;
pub mod dicom_seg;
pub mod display_text;
pub mod experiment;
pub mod label;
pub mod measurement_importer;
pub mod measurement_mapper;
pub mod notifier;
pub mod prompt;
pub mod seg_generator;
pub mod segment_stats;
pub mod uid;

pub use collection_builder::{build_collection, image_collection, package_collection};
pub use csv_report::{build_rows, escape_cell, render_csv, report_file_name, write_report};
pub use dicom_seg::DicomSegWriter;
pub use experiment::{resolve_experiment_id, resolve_project_id};
pub use label::{
    default_measurement_label, resolve_label, sanitize_collection_label,
    sanitize_segmentation_label,
};
pub use measurement_importer::import_collection;
pub use measurement_mapper::{map_measurement, map_measurements};
pub use notifier::{Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier};
pub use prompt::{TerminalPrompt, UserPrompt};
pub use seg_generator::{
    generate_segmentation, GeneratedSegmentation, Labelmap2D, Labelmap3D, SegEncoder, SegOptions,
    SegmentMetadata,
};
pub use segment_stats::compute_segment_stats;
