use std::collections::HashSet;
use std::sync::Arc;

use metrics_util::debugging::DebuggingRecorder;
use mdconvert::application::{
    downloads::DownloadService, render::build_renderer, store::ArtifactStore,
    uploads::UploadService,
};
use mdconvert::config::RenderEngine;
use mdconvert::domain::artifact::{ArtifactDraft, ArtifactKey};
use mdconvert::domain::uploads::UploadPolicy;
use time::OffsetDateTime;

#[test]
fn conversion_flow_emits_expected_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("install debugging recorder");

    let store = Arc::new(ArtifactStore::default());
    let renderer = build_renderer(RenderEngine::Substitution);
    let uploads = UploadService::new(
        Arc::clone(&store),
        Arc::clone(&renderer),
        UploadPolicy::default(),
    );
    let downloads = DownloadService::new(Arc::clone(&store), renderer);

    let receipt = uploads
        .accept("notes.md", b"# Metrics\n\nbody".to_vec())
        .expect("upload accepted");
    assert!(uploads.accept("notes.txt", b"plain".to_vec()).is_err());

    downloads
        .prepare("pdf", receipt.key.as_str())
        .expect("pdf download");
    downloads
        .prepare("docx", receipt.key.as_str())
        .expect("docx download");

    let stale = OffsetDateTime::now_utc() - time::Duration::hours(3);
    store.put(
        ArtifactKey::generate("old.md"),
        ArtifactDraft::new("old.md", "old").uploaded_at(stale),
    );
    assert_eq!(store.sweep(), 1);
    assert!(store.has(receipt.key.as_str()));

    let snapshot = snapshotter.snapshot().into_vec();
    let names: HashSet<String> = snapshot
        .iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "mdconvert_artifacts_live",
        "mdconvert_artifacts_evicted_total",
        "mdconvert_uploads_accepted_total",
        "mdconvert_uploads_rejected_total",
        "mdconvert_downloads_total",
        "mdconvert_render_ms",
    ];
    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }

    let download_formats: HashSet<String> = snapshot
        .iter()
        .filter(|(composite_key, _, _, _)| {
            composite_key.key().name() == "mdconvert_downloads_total"
        })
        .flat_map(|(composite_key, _, _, _)| {
            composite_key
                .key()
                .labels()
                .filter(|label| label.key() == "format")
                .map(|label| label.value().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(
        download_formats,
        HashSet::from(["pdf".to_string(), "docx".to_string()])
    );
}
