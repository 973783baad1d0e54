//! End-to-end editing scenarios: inline edits, formatting, external
//! resources and uploads.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stepcraft_blocks::{Alignment, BlockId, BlockRegistry, ExternalResource, ResourceField, ResourceState};
use stepcraft_editor::{
    fetch, Asset, AssetUploader, EditorConfig, EditorSession, FormatCommand, FormatError, MemoryResolver,
    NoticeLevel, Rect, ResourceError, ResourceResolver, SelectionInfo, StepId, Viewport,
};

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Route the crate's tracing output through the test harness
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session() -> EditorSession {
    init_tracing();
    EditorSession::new(Arc::new(BlockRegistry::with_builtins()), EditorConfig::default())
}

fn signup_form(id: &str) -> ExternalResource {
    ExternalResource {
        id: id.to_string(),
        name: format!("Signup {}", id),
        fields: vec![ResourceField {
            name: "email".to_string(),
            label: "Email".to_string(),
            field_type: "email".to_string(),
            required: true,
        }],
        definition: json!({"submit": "Join"}),
    }
}

/// Resolver whose responses take a per-reference amount of time
struct SlowResolver {
    delays: HashMap<String, u64>,
    inner: MemoryResolver,
}

#[async_trait]
impl ResourceResolver for SlowResolver {
    async fn resolve(&self, reference: &str) -> Result<Option<ExternalResource>, ResourceError> {
        let delay = self.delays.get(reference).copied().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.resolve(reference).await
    }
}

struct FailingResolver;

#[async_trait]
impl ResourceResolver for FailingResolver {
    async fn resolve(&self, _reference: &str) -> Result<Option<ExternalResource>, ResourceError> {
        Err(ResourceError::Fetch("connection reset".to_string()))
    }
}

#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl AssetUploader for RecordingUploader {
    async fn upload(&self, asset: Asset) -> Result<String, ResourceError> {
        if asset.bytes.is_empty() {
            return Err(ResourceError::Upload("empty file".to_string()));
        }
        let url = format!("https://cdn.example.com/{}", asset.file_name);
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(url.clone());
        }
        Ok(url)
    }
}

#[test]
fn test_keystrokes_become_one_snapshot() {
    let mut session = session();
    let text = session.insert_block("text", 0);
    let levels = session.history().undo_levels();

    session.focus_region(&text).unwrap();
    for (i, markup) in ["<p>H</p>", "<p>He</p>", "<p>Hel</p>", "<p>Hello</p>"].iter().enumerate() {
        session.region_input(&text, markup, ms(i as u64 * 50)).unwrap();
        assert_eq!(session.tick(ms(i as u64 * 50 + 10)).commits, 0);
    }
    assert_eq!(session.history().undo_levels(), levels);

    // Last keystroke at 150ms, debounce 300ms
    assert_eq!(session.tick(ms(449)).commits, 0);
    assert_eq!(session.tick(ms(450)).commits, 1);

    assert_eq!(session.history().undo_levels(), levels + 1);
    assert_eq!(
        session.document().steps[0].blocks[0].content.as_deref(),
        Some("<p>Hello</p>")
    );
}

#[test]
fn test_blur_commits_without_waiting() {
    let mut session = session();
    let text = session.insert_block("text", 0);
    session.focus_region(&text).unwrap();

    session.region_input(&text, "<p>Bye</p>", ms(0)).unwrap();
    session.blur_region(&text);

    assert_eq!(session.document().steps[0].blocks[0].content.as_deref(), Some("<p>Bye</p>"));
    assert_eq!(session.tick(ms(10_000)).commits, 0);
}

#[test]
fn test_pending_edit_is_committed_before_switching_steps() {
    let mut session = session();
    let text = session.insert_block("text", 0);
    session.add_step();
    session.switch_to(StepId(1)).unwrap();

    session.focus_region(&text).unwrap();
    session.region_input(&text, "<p>Draft</p>", ms(0)).unwrap();
    assert!(session.is_dirty());
    session.switch_to(StepId(2)).unwrap();

    assert_eq!(session.document().steps[0].blocks[0].content.as_deref(), Some("<p>Draft</p>"));
}

#[test]
fn test_empty_region_reports_placeholder() {
    let mut session = session();
    let text = session.insert_block("text", 0);
    session.focus_region(&text).unwrap();

    assert!(session.region_input(&text, "<p><br></p>", ms(0)).unwrap());
    assert!(!session.region_input(&text, "<p>a</p>", ms(10)).unwrap());
}

#[test]
fn test_toolbar_alignment_updates_block() {
    let mut session = session();
    let heading = session.insert_block("heading", 0);

    assert!(matches!(
        session.apply_format(&FormatCommand::Bold),
        Err(stepcraft_editor::EditorError::Format(FormatError::NoFocusedRegion))
    ));

    session.focus_region(&heading).unwrap();
    let state = session.update_selection(
        Some(&SelectionInfo {
            collapsed: false,
            rect: Rect {
                left: 200.0,
                top: 200.0,
                width: 80.0,
                height: 20.0,
            },
            formats: Default::default(),
        }),
        Viewport {
            width: 1200.0,
            height: 800.0,
        },
    );
    assert!(state.visible);

    session.apply_format(&FormatCommand::Align(Alignment::Right)).unwrap();
    assert_eq!(
        session.document().steps[0].blocks[0].settings["align"],
        json!("right")
    );
    assert_eq!(
        session.inline().style(&heading).and_then(|s| s.get("text-align")),
        Some("right")
    );
}

#[test]
fn test_unsafe_link_is_rejected() {
    let mut session = session();
    let text = session.insert_block("text", 0);
    session.focus_region(&text).unwrap();

    let err = session
        .apply_format(&FormatCommand::Link("javascript:alert(1)".to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        stepcraft_editor::EditorError::Format(FormatError::UnsafeLink(_))
    ));
}

#[test]
fn test_paste_is_plain_text() {
    let session = session();
    let pasted = session.paste(Some("<h1 onclick=\"x()\">Hi <img src=x onerror=y></h1>"), None);
    assert_eq!(pasted.text, "Hi");
    assert!(!pasted.markup.contains('<'));
}

#[tokio::test]
async fn test_form_resolves_and_exposes_fields() {
    let mut session = session();
    let form = session.insert_block("form", 0);
    assert_eq!(session.settings_panel(), Some(&form));
    assert!(session.take_fetch_requests().is_empty());

    session.update_block_setting(&form, "formId", json!("F1")).unwrap();
    assert!(session.resource_state(&form).unwrap().is_loading());
    assert!(session.render_current_step().contains("sc-loading"));

    let resolver = MemoryResolver::new();
    resolver.insert(signup_form("F1"));
    assert_eq!(session.resolve_pending(&resolver).await, 1);

    assert!(matches!(session.resource_state(&form), Some(ResourceState::Resolved(r)) if r.id == "F1"));
    assert!(session.render_current_step().contains("Signup F1"));
    let key = format!("{}/email", form);
    assert!(session.surface().field(&key).unwrap().required);
}

#[tokio::test]
async fn test_stale_fetch_never_overwrites_newer_reference() {
    let mut session = session();
    let form = session.insert_block("form", 0);

    session.update_block_setting(&form, "formId", json!("A")).unwrap();
    let first = session.take_fetch_requests();
    session.update_block_setting(&form, "formId", json!("B")).unwrap();
    let second = session.take_fetch_requests();
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);

    let inner = MemoryResolver::new();
    inner.insert(signup_form("A"));
    inner.insert(signup_form("B"));
    let resolver = SlowResolver {
        delays: HashMap::from([("A".to_string(), 50), ("B".to_string(), 5)]),
        inner,
    };

    // Both fetches run concurrently; B finishes first, A arrives late
    let (a, b) = tokio::join!(
        fetch(&resolver, first[0].clone()),
        fetch(&resolver, second[0].clone())
    );
    assert!(session.complete_fetch(b));
    assert!(!session.complete_fetch(a));

    assert_eq!(session.resource_state(&form).unwrap().reference(), "B");
    let html = session.render_current_step();
    assert!(html.contains("Signup B"));
    assert!(!html.contains("Signup A"));
}

#[tokio::test]
async fn test_stale_fetch_before_newer_completes() {
    let mut session = session();
    let form = session.insert_block("form", 0);
    session.update_block_setting(&form, "formId", json!("A")).unwrap();
    let first = session.take_fetch_requests();
    session.update_block_setting(&form, "formId", json!("B")).unwrap();

    let resolver = MemoryResolver::new();
    resolver.insert(signup_form("A"));
    let late = fetch(&resolver, first[0].clone()).await;

    assert!(!session.complete_fetch(late));
    assert_eq!(
        session.resource_state(&form),
        Some(&ResourceState::Loading {
            reference: "B".to_string()
        })
    );
}

#[tokio::test]
async fn test_unavailable_resource_can_be_retried() {
    let mut session = session();
    let form = session.insert_block("form", 0);
    let other = session.insert_block("heading", 1);
    session.update_block_setting(&form, "formId", json!("F9")).unwrap();

    assert_eq!(session.resolve_pending(&FailingResolver).await, 1);
    assert!(matches!(
        session.resource_state(&form),
        Some(ResourceState::Unavailable { .. })
    ));
    let html = session.render_current_step();
    assert!(html.contains("retry-resource"));
    assert!(html.contains(other.as_str()));

    let notices = session.take_notices();
    assert!(notices.iter().any(|n| n.level == NoticeLevel::Warning));

    assert!(session.retry_resource(&form));
    let resolver = MemoryResolver::new();
    resolver.insert(signup_form("F9"));
    assert_eq!(session.resolve_pending(&resolver).await, 1);
    assert!(matches!(session.resource_state(&form), Some(ResourceState::Resolved(_))));
}

#[tokio::test]
async fn test_image_upload_sets_source() {
    let mut session = session();
    let image = session.insert_block("image", 0);
    assert_eq!(session.settings_panel(), Some(&image));
    let uploader = RecordingUploader::default();

    let url = session
        .upload_image(
            &image,
            Asset {
                file_name: "hero.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            },
            &uploader,
        )
        .await
        .unwrap();

    assert_eq!(url, "https://cdn.example.com/hero.png");
    assert_eq!(session.document().steps[0].blocks[0].settings["src"], json!(url));
    assert_eq!(session.history().undo_description(), Some("Change src"));

    let levels = session.history().undo_levels();
    let failed = session
        .upload_image(
            &image,
            Asset {
                file_name: "empty.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: Vec::new(),
            },
            &uploader,
        )
        .await;
    assert!(failed.is_err());
    assert_eq!(session.history().undo_levels(), levels);
}

#[tokio::test]
async fn test_upload_for_missing_block_fails() {
    let mut session = session();
    let uploader = RecordingUploader::default();
    let result = session
        .upload_image(
            &BlockId::from("nope"),
            Asset {
                file_name: "a.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![0],
            },
            &uploader,
        )
        .await;
    assert!(result.is_err());
    assert!(uploader.uploads.lock().unwrap().is_empty());
}

#[cfg(feature = "async")]
#[tokio::test]
async fn test_spawned_fetches_deliver_over_channel() {
    let mut session = session();
    let form = session.insert_block("form", 0);
    session.update_block_setting(&form, "formId", json!("S1")).unwrap();

    let resolver = Arc::new(MemoryResolver::new());
    resolver.insert(signup_form("S1"));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let handles = session.spawn_pending(resolver, tx);
    assert_eq!(handles.len(), 1);
    let completion = rx.recv().await.unwrap();
    assert!(session.complete_fetch(completion));
    assert!(matches!(session.resource_state(&form), Some(ResourceState::Resolved(_))));
}
