use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use stepcraft_blocks::{BlockId, BlockRegistry, ExternalResource, Settings};
use stepcraft_editor::{
    EditorConfig, EditorSession, FetchCompletion, FetchTicket, FormatCommand, PointerSample, ResourceError,
    SelectionInfo, StepId, Viewport,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn parse<T: DeserializeOwned>(what: &str, json: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {}: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

/// Host timestamp (`performance.now()`) as a duration. Negative or NaN
/// values read as zero, values too large to represent saturate.
fn millis(now_ms: f64) -> Duration {
    if now_ms.is_nan() || now_ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(now_ms / 1000.0).unwrap_or(Duration::MAX)
}

/// One editing session, driven by the host page.
///
/// Structured arguments and results cross the boundary as JSON strings.
#[wasm_bindgen]
pub struct EditorHandle {
    session: EditorSession,
}

#[wasm_bindgen]
impl EditorHandle {
    /// Open a saved payload. Pass an empty string for a new document.
    #[wasm_bindgen(constructor)]
    pub fn new(payload: &str, config_json: &str) -> Result<EditorHandle, JsValue> {
        Self::open(payload, config_json).map_err(|e| JsValue::from_str(&e))
    }

    // ========== Steps ==========

    #[wasm_bindgen(js_name = addStep)]
    pub fn add_step(&mut self) -> u32 {
        self.session.add_step().0
    }

    #[wasm_bindgen(js_name = duplicateStep)]
    pub fn duplicate_step(&mut self, id: u32) -> Result<u32, JsValue> {
        self.session
            .duplicate_step(StepId(id))
            .map(|s| s.0)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = renameStep)]
    pub fn rename_step(&mut self, id: u32, name: &str) -> Result<bool, JsValue> {
        self.session
            .rename_step(StepId(id), name)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = deleteStep)]
    pub fn delete_step(&mut self, id: u32) -> Result<(), JsValue> {
        self.session
            .delete_step(StepId(id))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = reorderSteps)]
    pub fn reorder_steps(&mut self, order: Vec<u32>) -> Result<(), JsValue> {
        let order: Vec<StepId> = order.into_iter().map(StepId).collect();
        self.session
            .reorder_steps(&order)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns the transition to play as JSON
    #[wasm_bindgen(js_name = switchTo)]
    pub fn switch_to(&mut self, id: u32) -> Result<String, JsValue> {
        self.switch_json(id).map_err(|e| JsValue::from_str(&e))
    }

    // ========== Blocks ==========

    #[wasm_bindgen(js_name = insertBlock)]
    pub fn insert_block(&mut self, kind: &str, index: usize) -> String {
        self.session.insert_block(kind, index).to_string()
    }

    #[wasm_bindgen(js_name = deleteBlock)]
    pub fn delete_block(&mut self, id: &str) -> Result<(), JsValue> {
        self.session
            .delete_block(&BlockId::from(id))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = duplicateBlock)]
    pub fn duplicate_block(&mut self, id: &str) -> Result<String, JsValue> {
        self.session
            .duplicate_block(&BlockId::from(id))
            .map(|b| b.to_string())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = updateBlockSettings)]
    pub fn update_block_settings(&mut self, id: &str, changes_json: &str) -> Result<(), JsValue> {
        self.update_settings(id, changes_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = settingsForm)]
    pub fn settings_form(&self, id: &str) -> Result<String, JsValue> {
        self.session
            .settings_form(&BlockId::from(id))
            .map_err(|e| e.to_string())
            .and_then(|form| to_json(&form))
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = setFieldValue)]
    pub fn set_field_value(&mut self, key: &str, value: &str) -> bool {
        self.session.set_field_value(key, value)
    }

    pub fn palette(&self) -> Result<String, JsValue> {
        to_json(&self.session.palette()).map_err(|e| JsValue::from_str(&e))
    }

    // ========== Drag and drop ==========

    #[wasm_bindgen(js_name = startPaletteDrag)]
    pub fn start_palette_drag(&mut self, kind: &str) -> Result<(), JsValue> {
        self.session
            .start_palette_drag(kind)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = startBlockDrag)]
    pub fn start_block_drag(&mut self, id: &str, height: f64) -> Result<(), JsValue> {
        self.session
            .start_block_drag(&BlockId::from(id), height)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = dragPointerMoved)]
    pub fn drag_pointer_moved(&mut self, sample_json: &str, now_ms: f64) -> Result<(), JsValue> {
        self.pointer_moved(sample_json, now_ms)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// `sample_json` may be empty to drop at the last known position
    #[wasm_bindgen(js_name = dropDrag)]
    pub fn drop_drag(&mut self, sample_json: &str) -> Result<String, JsValue> {
        self.drop_json(sample_json).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = cancelDrag)]
    pub fn cancel_drag(&mut self) -> bool {
        self.session.cancel_drag()
    }

    #[wasm_bindgen(js_name = pointerLeftDocument)]
    pub fn pointer_left_document(&mut self) -> bool {
        self.session.pointer_left_document()
    }

    /// Drive debounced work. Returns `{"previewIndex", "commits"}`.
    pub fn tick(&mut self, now_ms: f64) -> String {
        let tick = self.session.tick(millis(now_ms));
        json!({"previewIndex": tick.preview_index, "commits": tick.commits}).to_string()
    }

    // ========== Inline editing ==========

    /// Returns the region's CSS for the host to apply
    #[wasm_bindgen(js_name = focusRegion)]
    pub fn focus_region(&mut self, id: &str) -> Result<String, JsValue> {
        self.session
            .focus_region(&BlockId::from(id))
            .map(|style| style.to_css())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Returns whether the region is now visually empty
    #[wasm_bindgen(js_name = regionInput)]
    pub fn region_input(&mut self, id: &str, markup: &str, now_ms: f64) -> Result<bool, JsValue> {
        self.session
            .region_input(&BlockId::from(id), markup, millis(now_ms))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = blurRegion)]
    pub fn blur_region(&mut self, id: &str) {
        self.session.blur_region(&BlockId::from(id));
    }

    /// `selection_json` is empty when nothing is selected
    #[wasm_bindgen(js_name = updateSelection)]
    pub fn update_selection(&mut self, selection_json: &str, viewport_json: &str) -> Result<String, JsValue> {
        self.selection_json(selection_json, viewport_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Returns the `execCommand` actions for the host to run
    #[wasm_bindgen(js_name = applyFormat)]
    pub fn apply_format(&mut self, command_json: &str) -> Result<String, JsValue> {
        self.format_json(command_json).map_err(|e| JsValue::from_str(&e))
    }

    /// Returns sanitized markup to insert
    pub fn paste(&self, html: Option<String>, text: Option<String>) -> String {
        self.session.paste(html.as_deref(), text.as_deref()).markup
    }

    // ========== History ==========

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    // ========== Resources ==========

    /// Pending fetches as a JSON array of tickets
    #[wasm_bindgen(js_name = takeFetchRequests)]
    pub fn take_fetch_requests(&mut self) -> Result<String, JsValue> {
        to_json(&self.session.take_fetch_requests()).map_err(|e| JsValue::from_str(&e))
    }

    /// `resource_json` is the resolved entity, `null` when it does not exist.
    /// Returns false when the ticket was stale.
    #[wasm_bindgen(js_name = completeFetch)]
    pub fn complete_fetch(&mut self, ticket_json: &str, resource_json: &str) -> Result<bool, JsValue> {
        self.complete(ticket_json, Ok(resource_json))
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = failFetch)]
    pub fn fail_fetch(&mut self, ticket_json: &str, reason: &str) -> Result<bool, JsValue> {
        self.complete(ticket_json, Err(reason))
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = retryResource)]
    pub fn retry_resource(&mut self, id: &str) -> bool {
        self.session.retry_resource(&BlockId::from(id))
    }

    // ========== Rendering and persistence ==========

    pub fn render(&self) -> String {
        self.session.render_current_step()
    }

    #[wasm_bindgen(js_name = currentStep)]
    pub fn current_step(&self) -> u32 {
        self.session.current_step_id().0
    }

    /// The full document as JSON, for the host's step list and settings UI
    pub fn document(&self) -> Result<String, JsValue> {
        to_json(self.session.document()).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = takeNotices)]
    pub fn take_notices(&mut self) -> Result<String, JsValue> {
        to_json(&self.session.take_notices()).map_err(|e| JsValue::from_str(&e))
    }

    pub fn save(&mut self) -> Result<String, JsValue> {
        self.session
            .save()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }
}

impl EditorHandle {
    fn open(payload: &str, config_json: &str) -> Result<EditorHandle, String> {
        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            EditorConfig::from_json(config_json).map_err(|e| e.to_string())?
        };
        let registry = Arc::new(BlockRegistry::with_builtins());

        let session = if payload.trim().is_empty() {
            EditorSession::new(registry, config)
        } else {
            EditorSession::open(registry, config, payload)
        };
        Ok(EditorHandle { session })
    }

    fn switch_json(&mut self, id: u32) -> Result<String, String> {
        let transition = self.session.switch_to(StepId(id)).map_err(|e| e.to_string())?;
        to_json(&transition)
    }

    fn update_settings(&mut self, id: &str, changes_json: &str) -> Result<(), String> {
        let changes: Settings = parse("settings", changes_json)?;
        self.session
            .update_block_settings(&BlockId::from(id), changes)
            .map_err(|e| e.to_string())
    }

    fn pointer_moved(&mut self, sample_json: &str, now_ms: f64) -> Result<(), String> {
        let sample: PointerSample = parse("pointer sample", sample_json)?;
        self.session
            .drag_pointer_moved(sample, millis(now_ms))
            .map_err(|e| e.to_string())
    }

    fn drop_json(&mut self, sample_json: &str) -> Result<String, String> {
        let sample: Option<PointerSample> = if sample_json.trim().is_empty() {
            None
        } else {
            Some(parse("pointer sample", sample_json)?)
        };
        let outcome = self.session.drop_drag(sample).map_err(|e| e.to_string())?;
        to_json(&outcome)
    }

    fn selection_json(&mut self, selection_json: &str, viewport_json: &str) -> Result<String, String> {
        let selection: Option<SelectionInfo> = if selection_json.trim().is_empty() {
            None
        } else {
            Some(parse("selection", selection_json)?)
        };
        let viewport: Viewport = parse("viewport", viewport_json)?;
        to_json(&self.session.update_selection(selection.as_ref(), viewport))
    }

    fn format_json(&mut self, command_json: &str) -> Result<String, String> {
        let command: FormatCommand = parse("format command", command_json)?;
        let actions = self.session.apply_format(&command).map_err(|e| e.to_string())?;
        to_json(&actions)
    }

    fn complete(&mut self, ticket_json: &str, result: Result<&str, &str>) -> Result<bool, String> {
        let ticket: FetchTicket = parse("fetch ticket", ticket_json)?;
        let outcome = match result {
            Ok(resource_json) => {
                let resource: Option<ExternalResource> = parse("resource", resource_json)?;
                Ok(resource)
            }
            Err(reason) => Err(ResourceError::Fetch(reason.to_string())),
        };
        Ok(self.session.complete_fetch(FetchCompletion { ticket, outcome }))
    }
}

/// Parse a saved payload and return the repaired document as JSON
#[wasm_bindgen(js_name = normalizeDocument)]
pub fn normalize_document(payload: &str) -> Result<String, JsValue> {
    let registry = BlockRegistry::with_builtins();
    let outcome = stepcraft_editor::PersistenceBridge::deserialize(payload, &registry);
    let warnings: Vec<String> = outcome.warnings.iter().map(|w| w.to_string()).collect();
    let value: Value = json!({"document": outcome.document, "warnings": warnings});
    to_json(&value).map_err(|e| JsValue::from_str(&e))
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn new_document_renders_in_browser() {
        let mut editor = EditorHandle::open("", "").unwrap();
        assert!(editor.render().contains("sc-empty-step"));

        let id = editor.insert_block("heading", 0);
        assert!(editor.render().contains(&id));
        assert!(editor.is_dirty());
    }
}
