use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;

use xnat_roi_export::clients::{ArchiveUploader, CollectionType, UploadRequest};
use xnat_roi_export::services::measurement_importer::import_collection;
use xnat_roi_export::services::notifier::RecordingNotifier;
use xnat_roi_export::services::prompt::TerminalPrompt;
use xnat_roi_export::{
    export_segmentation, store_measurements, AppError, AppResult, CommandContext, CommandOutcome,
    Config, ViewerSnapshot, ViewerState, XnatClient,
};

/// 内存中的 XNAT：记录上传，同名集合第二次上传需要 overwrite
#[derive(Default)]
struct InMemoryArchive {
    stored: Mutex<Vec<UploadRequest>>,
}

#[async_trait]
impl ArchiveUploader for InMemoryArchive {
    async fn upload(&self, request: &UploadRequest, overwrite: bool) -> AppResult<()> {
        let mut stored = self.stored.lock().unwrap();
        if let Some(pos) = stored.iter().position(|r| r.label == request.label) {
            if !overwrite {
                return Err(AppError::collection_exists(&request.label));
            }
            stored.remove(pos);
        }
        stored.push(request.clone());
        Ok(())
    }
}

fn snapshot() -> ViewerSnapshot {
    serde_json::from_value(json!({
        "displaySet": {
            "PatientID": "PAT-01",
            "StudyInstanceUID": "1.2.826.1",
            "SeriesInstanceUID": "1.2.826.1.1",
            "Modality": "CT"
        },
        "measurements": [
            {
                "uid": "len-1",
                "toolName": "Length",
                "label": "Lesion",
                "points": [[10.0, 10.0, 5.0], [13.0, 14.0, 5.0]],
                "SOPInstanceUID": "1.2.826.1.1.1",
                "FrameOfReferenceUID": "1.2.826.9",
                "cachedStats": { "length": 5.0 }
            },
            {
                "uid": "arrow-1",
                "toolName": "ArrowAnnotate",
                "text": "see here",
                "points": [[1.0, 2.0], [3.0, 4.0]],
                "SOPInstanceUID": "1.2.826.1.1.2",
                "frameNumber": 2
            }
        ],
        "segmentations": [{
            "segmentationId": "seg-1",
            "label": "Liver",
            "segments": {
                "1": { "segmentIndex": 1, "label": "Liver", "color": [200, 40, 40, 255] }
            },
            "representationData": { "Labelmap": { "volumeId": "vol-1" } }
        }],
        "images": [
            {
                "imageId": "lm-0",
                "referencedImageId": "ct-0",
                "rows": 2,
                "columns": 2,
                "pixelData": [0, 1, 1, 1]
            },
            {
                "imageId": "ct-0",
                "rows": 2,
                "columns": 2,
                "SOPInstanceUID": "1.2.826.1.1.1",
                "SOPClassUID": "1.2.840.10008.5.1.4.1.1.2",
                "FrameOfReferenceUID": "1.2.826.9",
                "ImagePositionPatient": [0.0, 0.0, 5.0],
                "PixelSpacing": [0.7, 0.7],
                "SliceThickness": 2.5
            }
        ],
        "volumes": [{ "volumeId": "vol-1", "imageIds": ["lm-0"] }],
        "session": {
            "sessionMap": {
                "series": { "1.2.826.1.1": "XNAT_E00042" },
                "studies": { "1.2.826.1": { "experimentId": "XNAT_E00042", "projectId": "LIVER01" } }
            }
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_measurements_export_and_reimport() {
    let viewer = ViewerState::from_snapshot(snapshot());
    let config = Config::default();
    let notifier = RecordingNotifier::new();
    let prompt = TerminalPrompt::new().with_label(Some("Baseline Read".into()));
    let archive = InMemoryArchive::default();
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &prompt, &archive)
        .with_now(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());

    let outcome = store_measurements(&ctx).await.unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Exported {
            label: "Baseline_Read".into(),
            overwritten: false
        }
    );

    let stored = archive.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].project_id, "LIVER01");

    let imported = import_collection(&stored[0].payload).unwrap();
    assert_eq!(imported.len(), 2);
    assert_eq!(imported[0].points, viewer_points(0));
    assert_eq!(imported[1].text.as_deref(), Some("see here"));
    assert_eq!(imported[1].frame_number, Some(2));
}

fn viewer_points(index: usize) -> Vec<xnat_roi_export::models::Point> {
    snapshot().measurements[index].points.clone()
}

#[tokio::test]
async fn test_second_segmentation_export_asks_before_overwriting() {
    let viewer = ViewerState::from_snapshot(snapshot());
    let config = Config::default();
    let notifier = RecordingNotifier::new();
    let archive = InMemoryArchive::default();

    let first_prompt = TerminalPrompt::new().with_label(Some("Liver".into()));
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &first_prompt, &archive);
    let first = export_segmentation("seg-1", None, &ctx).await.unwrap();
    assert_eq!(
        first,
        CommandOutcome::Exported {
            label: "Liver".into(),
            overwritten: false
        }
    );

    let declining = TerminalPrompt::new()
        .with_label(Some("Liver".into()))
        .with_confirm(Some(false));
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &declining, &archive);
    let second = export_segmentation("seg-1", None, &ctx).await.unwrap();
    assert_eq!(second, CommandOutcome::Declined { label: "Liver".into() });

    let confirming = TerminalPrompt::new()
        .with_label(Some("Liver".into()))
        .with_confirm(Some(true));
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &confirming, &archive);
    let third = export_segmentation("seg-1", None, &ctx).await.unwrap();
    assert_eq!(
        third,
        CommandOutcome::Exported {
            label: "Liver".into(),
            overwritten: true
        }
    );

    let stored = archive.stored.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].collection_type, CollectionType::Segmentation);

    let object = dicom::object::from_reader(&stored[0].payload[128..]).unwrap();
    let modality = object
        .element(dicom::dictionary_std::tags::MODALITY)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(modality.trim(), "SEG");
}

#[tokio::test]
#[ignore] // 需要可访问的 XNAT：cargo test -- --ignored
async fn test_export_against_live_xnat() {
    let config = Config::from_env();
    let client = XnatClient::new(&config).expect("创建客户端失败");
    let viewer = ViewerState::from_snapshot(snapshot());
    let notifier = RecordingNotifier::new();
    let prompt = TerminalPrompt::new()
        .with_label(Some("integration_test".into()))
        .with_confirm(Some(true));
    let ctx = CommandContext::from_viewer(&config, &viewer, &notifier, &prompt, &client);

    let outcome = store_measurements(&ctx).await.expect("导出失败");
    assert!(matches!(outcome, CommandOutcome::Exported { .. }));
}
