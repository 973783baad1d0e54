//! # Editor Session
//!
//! One session per open document. It owns the document and every
//! sub-controller, and is the only place that turns UI events into model
//! mutations.
//!
//! ```text
//!   UI event ──► DragDropController / InlineEditSync / panel
//!                        │ mutate the surface
//!                        ▼
//!                StepManager::flush ──► Document
//!                        │ changed?
//!                        ▼
//!                UndoStack::push(before)
//! ```
//!
//! Every discrete mutation goes through [`EditorSession::record`], which
//! flushes the surface and pushes at most one history entry.

use crate::config::EditorConfig;
use crate::document::{
    DisplaySettings, Document, PublishStatus, StepId, StepSettings, TargetingRules, TriggerSettings,
};
use crate::drag_drop::{DragDropController, DragSource, DropOutcome, PointerSample};
use crate::errors::{EditorError, FormatError, StepError};
use crate::formatting::{FormatCommand, SelectionInfo, ToolbarAction, ToolbarState, Viewport};
use crate::inline_edit::{ContentCommit, InlineEditSync};
use crate::persistence::{DocumentStore, LoadWarning, PersistenceBridge};
use crate::resources::{fetch, Asset, AssetUploader, FetchCompletion, FetchTicket, ResourceResolver, ResourceTracker};
use crate::sanitize::PasteContent;
use crate::steps::{StepManager, Transition};
use crate::surface::Surface;
use crate::undo_stack::UndoStack;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use stepcraft_blocks::markup::{escape_html, InlineStyle};
use stepcraft_blocks::{
    Block, BlockId, BlockRegistry, Category, PaletteItem, RenderContext, ResourceState, Settings, SettingsForm,
};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message for the author (toast, banner)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// What a timer tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    /// New drag preview index, if it moved
    pub preview_index: Option<usize>,
    /// Inline edits written into blocks
    pub commits: usize,
}

const EMPTY_STEP_MARKUP: &str = "<div class=\"sc-empty-step\">Drag a block here</div>";

pub struct EditorSession {
    registry: Arc<BlockRegistry>,
    config: EditorConfig,
    document: Document,
    surface: Surface,
    history: UndoStack,
    drag: DragDropController,
    inline: InlineEditSync,
    resources: ResourceTracker,
    fetch_queue: Vec<FetchTicket>,
    notices: Vec<Notice>,
    settings_panel: Option<BlockId>,
    /// Payload as last saved or loaded
    baseline: Option<String>,
}

impl EditorSession {
    /// Session over a fresh single-step document
    pub fn new(registry: Arc<BlockRegistry>, config: EditorConfig) -> Self {
        Self::from_document(registry, config, Document::default())
    }

    /// Session over an in-memory document (hydrated as if it were loaded)
    pub fn from_document(registry: Arc<BlockRegistry>, config: EditorConfig, document: Document) -> Self {
        let outcome = PersistenceBridge::hydrate(document, &registry);
        let mut session = Self::assemble(registry, config, outcome.document);
        session.report_load_warnings(&outcome.warnings);
        session
    }

    /// Open a saved payload. Never fails: an unreadable payload opens a
    /// default document and leaves a warning notice.
    #[instrument(skip_all, fields(bytes = payload.len()))]
    pub fn open(registry: Arc<BlockRegistry>, config: EditorConfig, payload: &str) -> Self {
        let outcome = PersistenceBridge::deserialize(payload, &registry);
        let mut session = Self::assemble(registry, config, outcome.document);
        session.report_load_warnings(&outcome.warnings);
        info!(
            steps = session.document.step_count(),
            blocks = session.document.block_count(),
            "Opened document"
        );
        session
    }

    /// Load a payload from the store and open it
    pub async fn open_from(
        store: &dyn DocumentStore,
        id: &str,
        registry: Arc<BlockRegistry>,
        config: EditorConfig,
    ) -> Result<Self, EditorError> {
        let payload = store.load(id).await?;
        Ok(Self::open(registry, config, &payload))
    }

    fn assemble(registry: Arc<BlockRegistry>, config: EditorConfig, document: Document) -> Self {
        let surface = document.current_step().map(Surface::load).unwrap_or_default();
        let baseline = PersistenceBridge::serialize(&document).ok();
        let mut session = Self {
            history: UndoStack::with_max_levels(config.history_limit),
            drag: DragDropController::new(config.drag_preview_debounce()),
            inline: InlineEditSync::new(&config),
            registry,
            config,
            document,
            surface,
            resources: ResourceTracker::new(),
            fetch_queue: Vec::new(),
            notices: Vec::new(),
            settings_panel: None,
            baseline,
        };
        session.surface_changed();
        session
    }

    fn report_load_warnings(&mut self, warnings: &[LoadWarning]) {
        for warning in warnings {
            if warning.is_user_facing() {
                self.notify(NoticeLevel::Warning, warning.to_string());
            } else {
                debug!(%warning, "Load repaired document");
            }
        }
    }

    // ========== Accessors ==========

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn drag(&self) -> &DragDropController {
        &self.drag
    }

    pub fn inline(&self) -> &InlineEditSync {
        &self.inline
    }

    pub fn current_step_id(&self) -> StepId {
        self.document.current_step_id
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "Notice");
        self.notices.push(Notice { level, message });
    }

    /// Palette items grouped by category
    pub fn palette(&self) -> BTreeMap<Category, Vec<PaletteItem>> {
        self.registry.categories()
    }

    // ========== Mutation plumbing ==========

    fn steps(&mut self) -> StepManager<'_> {
        StepManager::new(&mut self.document, &mut self.surface, &self.config)
    }

    /// Run one discrete mutation: flush the surface, then push a history
    /// entry if the document actually changed.
    fn record<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        let before = self.document.clone();
        let step_before = self.surface.step_id;

        let result = f(self);
        self.steps().flush();

        if self.surface.step_id != step_before {
            self.inline.reset();
        }
        if self.document != before {
            self.history.push(before, label);
            self.surface_changed();
        }
        result
    }

    /// Fallible [`record`](Self::record). On error the document is put back
    /// exactly as it was.
    fn try_record<R>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Self) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        let before = self.document.clone();
        let step_before = self.surface.step_id;

        match f(self) {
            Ok(value) => {
                self.steps().flush();
                if self.surface.step_id != step_before {
                    self.inline.reset();
                }
                if self.document != before {
                    self.history.push(before, label);
                    self.surface_changed();
                }
                Ok(value)
            }
            Err(e) => {
                if self.document != before {
                    warn!(error = %e, "Rolling back partially applied mutation");
                    self.document = before;
                    self.steps().reload();
                    self.surface_changed();
                }
                Err(e)
            }
        }
    }

    /// Bring derived state (fields, resource tracking) in line with the surface
    fn surface_changed(&mut self) {
        let live: HashSet<BlockId> = self
            .document
            .all_blocks()
            .chain(&self.surface.blocks)
            .map(|b| b.id.clone())
            .collect();
        self.resources.retain(|id| live.contains(id));
        self.fetch_queue.retain(|t| live.contains(&t.block_id));

        for block in &self.surface.blocks {
            let reference = self.registry.external_reference(block);
            if let Some(ticket) = self.resources.sync(&block.id, reference.as_deref()) {
                self.fetch_queue.retain(|t| t.block_id != ticket.block_id);
                self.fetch_queue.push(ticket);
            }
        }
        self.refresh_fields();
    }

    fn refresh_fields(&mut self) {
        let resources = &self.resources;
        self.surface
            .refresh_fields(&self.registry, |id| resources.state(id));
    }

    fn require_block(&self, id: &BlockId) -> Result<&Block, EditorError> {
        self.surface
            .block(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))
    }

    /// Commit pending inline edits and abandon any drag in progress, before
    /// an operation that rebuilds the surface
    fn settle(&mut self) {
        self.commit_inline();
        self.drag.cancel(&mut self.surface);
    }

    /// Write pending inline edits into their blocks
    fn commit_inline(&mut self) -> usize {
        let commits = self.inline.flush_all();
        let count = commits.len();
        for commit in commits {
            self.apply_commit(commit);
        }
        count
    }

    fn apply_commit(&mut self, commit: ContentCommit) {
        if self.surface.block(&commit.block_id).is_none() {
            debug!(block_id = %commit.block_id, "Dropping inline edit for a block that is gone");
            return;
        }
        self.record("Edit text", |s| {
            if let Some(block) = s.surface.block_mut(&commit.block_id) {
                block.content = Some(commit.markup);
            }
        });
    }

    // ========== Steps ==========

    pub fn add_step(&mut self) -> StepId {
        self.settle();
        self.record("Add step", |s| s.steps().add_step())
    }

    pub fn duplicate_step(&mut self, id: StepId) -> Result<StepId, EditorError> {
        self.settle();
        self.try_record("Duplicate step", |s| Ok(s.steps().duplicate_step(id)?))
    }

    /// Returns false when the name was blank or unchanged
    pub fn rename_step(&mut self, id: StepId, name: &str) -> Result<bool, EditorError> {
        self.try_record("Rename step", |s| Ok(s.steps().rename_step(id, name)?))
    }

    pub fn delete_step(&mut self, id: StepId) -> Result<(), EditorError> {
        self.settle();
        let result = self.try_record("Delete step", |s| Ok(s.steps().delete_step(id)?));
        if let Err(EditorError::Step(StepError::DeleteLastStep)) = &result {
            self.notify(NoticeLevel::Error, "A document needs at least one step");
        }
        result
    }

    pub fn reorder_steps(&mut self, order: &[StepId]) -> Result<(), EditorError> {
        self.settle();
        self.try_record("Reorder steps", |s| Ok(s.steps().reorder_steps(order)?))
    }

    /// Replace a step's settings
    pub fn update_step_settings(&mut self, id: StepId, settings: StepSettings) -> Result<(), EditorError> {
        self.try_record("Change step settings", |s| {
            let step = s.document.step_mut(id).ok_or(StepError::NotFound(id))?;
            step.settings = settings;
            Ok(())
        })
    }

    /// Navigate to another step. Navigation is not recorded in history.
    #[instrument(skip(self))]
    pub fn switch_to(&mut self, target: StepId) -> Result<Transition, EditorError> {
        self.settle();

        let step_before = self.surface.step_id;
        let result = self.steps().switch_to(target);
        match result {
            Ok(transition) => {
                if self.surface.step_id != step_before {
                    self.inline.reset();
                    self.settings_panel = None;
                    self.surface_changed();
                }
                Ok(transition)
            }
            Err(e) => {
                if let StepError::ValidationFailed { invalid, .. } = &e {
                    let message = format!("Please fill in {} required field(s) before continuing", invalid.len());
                    self.notify(NoticeLevel::Error, message);
                }
                Err(e.into())
            }
        }
    }

    pub fn next_step(&mut self) -> Result<Option<Transition>, EditorError> {
        let current = self.document.current_step_id;
        if current.index() + 1 >= self.document.step_count() {
            return Ok(None);
        }
        self.switch_to(StepId(current.0 + 1)).map(Some)
    }

    pub fn previous_step(&mut self) -> Result<Option<Transition>, EditorError> {
        let current = self.document.current_step_id;
        if current.0 <= 1 {
            return Ok(None);
        }
        self.switch_to(StepId(current.0 - 1)).map(Some)
    }

    // ========== Blocks ==========

    /// Insert a new block at `index` of the current step (clamped). Unknown
    /// types become pass-through blocks.
    pub fn insert_block(&mut self, kind: &str, index: usize) -> BlockId {
        self.commit_inline();
        let block = self.registry.create_or_passthrough(kind, None);
        let open_settings = self.registry.variant_for(&block).needs_configuration(&block);
        let id = block.id.clone();

        self.record("Add block", |s| {
            s.surface.insert(index, block);
            s.surface.selected = Some(id.clone());
        });
        if open_settings {
            self.settings_panel = Some(id.clone());
        }
        id
    }

    pub fn delete_block(&mut self, id: &BlockId) -> Result<(), EditorError> {
        self.settle();
        self.try_record("Delete block", |s| {
            s.surface
                .remove(id)
                .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
            Ok(())
        })?;

        self.inline.discard(id);
        self.resources.forget(id);
        self.fetch_queue.retain(|t| &t.block_id != id);
        if self.settings_panel.as_ref() == Some(id) {
            self.settings_panel = None;
        }
        Ok(())
    }

    /// Copy a block (fresh id) right after the original
    pub fn duplicate_block(&mut self, id: &BlockId) -> Result<BlockId, EditorError> {
        self.commit_inline();
        self.try_record("Duplicate block", |s| {
            let index = s
                .surface
                .position_of(id)
                .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
            let copy = s.surface.blocks[index].duplicate();
            let copy_id = copy.id.clone();
            s.surface.insert(index + 1, copy);
            s.surface.selected = Some(copy_id.clone());
            Ok(copy_id)
        })
    }

    /// Change one setting. The value is validated by the block's variant
    /// before anything is written.
    pub fn update_block_setting(&mut self, id: &BlockId, key: &str, value: Value) -> Result<(), EditorError> {
        let mut settings = Settings::new();
        settings.insert(key.to_string(), value);
        self.update_block_settings(id, settings)
    }

    /// Change several settings as one history entry
    pub fn update_block_settings(&mut self, id: &BlockId, changes: Settings) -> Result<(), EditorError> {
        self.commit_inline();
        let block = self.require_block(id)?;
        for (key, value) in &changes {
            self.registry.validate_setting(block, key, value)?;
        }

        let label = match changes.keys().next() {
            Some(key) if changes.len() == 1 => format!("Change {}", key),
            _ => "Change settings".to_string(),
        };
        self.try_record(&label, |s| {
            let block = s
                .surface
                .block_mut(id)
                .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
            for (key, value) in changes {
                block.settings.insert(key, value);
            }
            Ok(())
        })?;

        if let Some(block) = self.surface.block(id) {
            self.inline.restyle(block, &self.registry);
        }
        Ok(())
    }

    pub fn select_block(&mut self, id: Option<&BlockId>) -> Result<(), EditorError> {
        if let Some(id) = id {
            self.require_block(id)?;
        }
        self.surface.selected = id.cloned();
        Ok(())
    }

    pub fn selected_block(&self) -> Option<&Block> {
        self.surface.selected.as_ref().and_then(|id| self.surface.block(id))
    }

    pub fn settings_form(&self, id: &BlockId) -> Result<SettingsForm, EditorError> {
        let block = self.require_block(id)?;
        Ok(self.registry.settings_form(block))
    }

    /// Block whose settings panel is open
    pub fn settings_panel(&self) -> Option<&BlockId> {
        self.settings_panel.as_ref()
    }

    pub fn open_settings_panel(&mut self, id: &BlockId) -> Result<(), EditorError> {
        self.require_block(id)?;
        self.settings_panel = Some(id.clone());
        Ok(())
    }

    pub fn close_settings_panel(&mut self) {
        self.settings_panel = None;
    }

    /// Record what the author typed into a rendered input
    pub fn set_field_value(&mut self, key: &str, value: &str) -> bool {
        self.surface.set_field_value(key, value)
    }

    // ========== Document settings ==========

    pub fn rename_document(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.record("Rename document", |s| s.document.document_name = name.to_string());
        true
    }

    pub fn set_status(&mut self, status: PublishStatus) {
        self.record("Change status", |s| s.document.status = status);
    }

    pub fn set_display_settings(&mut self, settings: DisplaySettings) {
        self.record("Change display settings", |s| s.document.settings = settings);
    }

    pub fn set_trigger_settings(&mut self, settings: TriggerSettings) {
        self.record("Change trigger", |s| s.document.trigger_settings = settings);
    }

    pub fn set_targeting_rules(&mut self, rules: TargetingRules) {
        self.record("Change targeting", |s| s.document.targeting_rules = rules);
    }

    // ========== Drag and drop ==========

    pub fn start_palette_drag(&mut self, kind: &str) -> Result<(), EditorError> {
        Ok(self.drag.start_palette(kind)?)
    }

    pub fn start_block_drag(&mut self, id: &BlockId, height: f64) -> Result<(), EditorError> {
        Ok(self.drag.start_reorder(&mut self.surface, id, height)?)
    }

    pub fn drag_pointer_moved(&mut self, sample: PointerSample, now: Duration) -> Result<(), EditorError> {
        Ok(self.drag.pointer_moved(sample, now)?)
    }

    /// Finish the drag in progress: one flush and, if anything moved, one
    /// history entry
    pub fn drop_drag(&mut self, sample: Option<PointerSample>) -> Result<DropOutcome, EditorError> {
        self.commit_inline();
        let label = match self.drag.session().map(|s| &s.source) {
            Some(DragSource::ExistingBlock { .. }) => "Move block",
            _ => "Add block",
        };

        let outcome = self.try_record(label, |s| Ok(s.drag.drop(&mut s.surface, &s.registry, sample)?))?;
        if let DropOutcome::Inserted {
            block_id,
            open_settings: true,
            ..
        } = &outcome
        {
            self.settings_panel = Some(block_id.clone());
        }
        Ok(outcome)
    }

    /// Abandon the drag. Nothing in the document changes.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.cancel(&mut self.surface)
    }

    pub fn pointer_left_document(&mut self) -> bool {
        self.drag.pointer_left_document(&mut self.surface)
    }

    /// Drive debounced work from the host's timer
    pub fn tick(&mut self, now: Duration) -> Tick {
        let preview_index = self.drag.tick(&mut self.surface, now);
        let commits = self.inline.due(now);
        let count = commits.len();
        for commit in commits {
            self.apply_commit(commit);
        }
        Tick {
            preview_index,
            commits: count,
        }
    }

    // ========== Inline editing ==========

    /// Focus a block's editable region. Returns the style to apply to it.
    pub fn focus_region(&mut self, id: &BlockId) -> Result<InlineStyle, EditorError> {
        let block = self
            .surface
            .block(id)
            .ok_or_else(|| EditorError::BlockNotFound(id.clone()))?;
        Ok(self.inline.focus(block, &self.registry))
    }

    /// Markup changed inside a region. Returns whether it is now empty.
    pub fn region_input(&mut self, id: &BlockId, markup: &str, now: Duration) -> Result<bool, EditorError> {
        self.require_block(id)?;
        Ok(self.inline.input(id, markup, now))
    }

    /// Region lost focus: its pending edit is committed immediately
    pub fn blur_region(&mut self, id: &BlockId) {
        if let Some(commit) = self.inline.blur(id) {
            self.apply_commit(commit);
        }
    }

    pub fn update_selection(&mut self, selection: Option<&SelectionInfo>, viewport: Viewport) -> ToolbarState {
        *self.inline.toolbar_mut().update_selection(selection, viewport)
    }

    /// Run a toolbar command on the focused region. Alignment is also
    /// written to the block's `align` setting when it has one.
    pub fn apply_format(&mut self, command: &FormatCommand) -> Result<Vec<ToolbarAction>, EditorError> {
        let focused = self.inline.focused().cloned().ok_or(FormatError::NoFocusedRegion)?;
        let actions = self.inline.toolbar_mut().apply(command)?;

        if let FormatCommand::Align(alignment) = command {
            let has_align = self
                .surface
                .block(&focused)
                .map_or(false, |b| b.settings.contains_key("align"));
            if has_align {
                self.update_block_setting(&focused, "align", Value::from(alignment.as_css()))?;
            }
        }
        Ok(actions)
    }

    pub fn paste(&self, html: Option<&str>, text: Option<&str>) -> PasteContent {
        self.inline.paste(html, text)
    }

    // ========== History ==========

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.settle();
        match self.history.undo(self.document.clone()) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.settle();
        match self.history.redo(self.document.clone()) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, document: Document) {
        self.document = document;
        self.steps().reload();
        self.inline.reset();
        self.settings_panel = None;
        self.surface_changed();
    }

    // ========== Rendering ==========

    /// Editable approximation of the current step
    pub fn render_current_step(&self) -> String {
        let mut out = format!("<div class=\"sc-step\" data-step-id=\"{}\">", self.surface.step_id);
        let resting: Vec<&Block> = self.surface.resting_blocks().collect();

        if resting.is_empty() && self.surface.placeholder.is_none() {
            out.push_str(EMPTY_STEP_MARKUP);
        }

        for (index, block) in resting.iter().enumerate() {
            self.push_placeholder_at(&mut out, index);
            let ctx = RenderContext::with_resource(self.resources.state(&block.id));
            out.push_str(&self.registry.render(block, &ctx));
        }
        self.push_placeholder_at(&mut out, resting.len());

        out.push_str("</div>");
        out
    }

    fn push_placeholder_at(&self, out: &mut String, index: usize) {
        if let Some(placeholder) = self.surface.placeholder.filter(|p| p.index == index) {
            out.push_str(&format!(
                "<div class=\"sc-placeholder\" style=\"height:{}px\"></div>",
                escape_html(&placeholder.height.to_string())
            ));
        }
    }

    // ========== External resources ==========

    /// Fetches the host should run, oldest first
    pub fn take_fetch_requests(&mut self) -> Vec<FetchTicket> {
        std::mem::take(&mut self.fetch_queue)
    }

    pub fn resource_state(&self, id: &BlockId) -> Option<&ResourceState> {
        self.resources.state(id)
    }

    /// Apply a finished fetch. Returns false when it was stale.
    pub fn complete_fetch(&mut self, completion: FetchCompletion) -> bool {
        let applied = self.resources.complete(&completion.ticket, completion.outcome);
        if !applied {
            return false;
        }

        let failure = match self.resources.state(&completion.ticket.block_id) {
            Some(ResourceState::Unavailable { reference, reason }) => {
                Some(format!("Could not load '{}': {}", reference, reason))
            }
            _ => None,
        };
        if let Some(message) = failure {
            self.notify(NoticeLevel::Warning, message);
        }
        self.refresh_fields();
        true
    }

    /// Queue another fetch for an unavailable resource
    pub fn retry_resource(&mut self, id: &BlockId) -> bool {
        match self.resources.retry(id) {
            Some(ticket) => {
                self.fetch_queue.push(ticket);
                true
            }
            None => false,
        }
    }

    /// Run every queued fetch against `resolver`. Returns how many results
    /// were applied.
    pub async fn resolve_pending(&mut self, resolver: &dyn ResourceResolver) -> usize {
        let mut applied = 0;
        for ticket in self.take_fetch_requests() {
            let completion = fetch(resolver, ticket).await;
            if self.complete_fetch(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Spawn every queued fetch on the runtime; completions arrive on `tx`
    /// and are applied with [`complete_fetch`](Self::complete_fetch)
    #[cfg(feature = "async")]
    pub fn spawn_pending(
        &mut self,
        resolver: Arc<dyn ResourceResolver>,
        tx: tokio::sync::mpsc::UnboundedSender<FetchCompletion>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        self.take_fetch_requests()
            .into_iter()
            .map(|ticket| crate::resources::spawn_fetch(resolver.clone(), ticket, tx.clone()))
            .collect()
    }

    /// Upload an image asset and point the block at it
    pub async fn upload_image(
        &mut self,
        id: &BlockId,
        asset: Asset,
        uploader: &dyn AssetUploader,
    ) -> Result<String, EditorError> {
        self.require_block(id)?;
        info!(block_id = %id, file = %asset.file_name, bytes = asset.bytes.len(), "Uploading asset");

        let url = match uploader.upload(asset).await {
            Ok(url) => url,
            Err(e) => {
                self.notify(NoticeLevel::Error, e.to_string());
                return Err(e.into());
            }
        };
        self.update_block_setting(id, "src", Value::from(url.clone()))?;
        Ok(url)
    }

    // ========== Persistence ==========

    /// Commit pending edits and serialize the document
    #[instrument(skip(self))]
    pub fn save(&mut self) -> Result<String, EditorError> {
        let payload = self.payload()?;
        self.baseline = Some(payload.clone());
        info!(bytes = payload.len(), "Saved document");
        Ok(payload)
    }

    fn payload(&mut self) -> Result<String, EditorError> {
        self.commit_inline();
        self.steps().flush();
        Ok(PersistenceBridge::serialize(&self.document)?)
    }

    /// Save into `store` under `id`. The session stays dirty if the store fails.
    pub async fn save_to(&mut self, store: &dyn DocumentStore, id: &str) -> Result<(), EditorError> {
        let payload = self.payload()?;
        store.save(id, &payload).await?;
        info!(id, bytes = payload.len(), "Saved document to store");
        self.baseline = Some(payload);
        Ok(())
    }

    /// Whether there are changes since the last save or load
    pub fn is_dirty(&self) -> bool {
        if self.inline.has_pending() {
            return true;
        }
        match (&self.baseline, PersistenceBridge::serialize(&self.document)) {
            (Some(baseline), Ok(current)) => baseline != &current,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> EditorSession {
        EditorSession::new(Arc::new(BlockRegistry::with_builtins()), EditorConfig::default())
    }

    #[test]
    fn test_resources_forgotten_when_blocks_leave_document() {
        let mut session = session();
        session.add_step();
        let form = session.insert_block("form", 0);
        session.update_block_setting(&form, "formId", json!("F1")).unwrap();
        assert!(session.resource_state(&form).is_some());

        session.delete_step(StepId(2)).unwrap();
        assert!(session.resource_state(&form).is_none());
        assert!(session.resources.is_empty());
        assert!(session.take_fetch_requests().is_empty());

        assert!(session.undo());
        assert!(session.resource_state(&form).is_some());
        assert!(session.redo());
        assert!(session.resources.is_empty());
    }

    #[test]
    fn test_new_session_renders_empty_step() {
        let session = session();
        let html = session.render_current_step();
        assert!(html.contains("sc-empty-step"));
        assert!(!session.is_dirty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_insert_records_one_entry() {
        let mut session = session();
        let id = session.insert_block("heading", 0);

        assert_eq!(session.history().undo_levels(), 1);
        assert_eq!(session.history().undo_description(), Some("Add block"));
        assert_eq!(session.document().steps[0].blocks[0].id, id);
        assert_eq!(session.selected_block().map(|b| &b.id), Some(&id));
        assert!(session.is_dirty());
    }

    #[test]
    fn test_invalid_setting_changes_nothing() {
        let mut session = session();
        let id = session.insert_block("heading", 0);
        let before = session.document().clone();

        let err = session.update_block_setting(&id, "level", json!(9)).unwrap_err();
        assert!(matches!(err, EditorError::Block(_)));
        assert_eq!(session.document(), &before);
        assert_eq!(session.history().undo_levels(), 1);
    }

    #[test]
    fn test_unchanged_setting_records_nothing() {
        let mut session = session();
        let id = session.insert_block("spacer", 0);
        session.update_block_setting(&id, "height", json!(24)).unwrap();
        assert_eq!(session.history().undo_levels(), 1);
    }

    #[test]
    fn test_delete_last_step_notifies() {
        let mut session = session();
        let err = session.delete_step(StepId(1)).unwrap_err();
        assert!(matches!(err, EditorError::Step(StepError::DeleteLastStep)));

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_form_drop_opens_settings_panel() {
        let mut session = session();
        let id = session.insert_block("form", 0);
        assert_eq!(session.settings_panel(), Some(&id));

        session.delete_block(&id).unwrap();
        assert!(session.settings_panel().is_none());
    }

    #[test]
    fn test_placeholder_rendered_during_reorder() {
        let mut session = session();
        let first = session.insert_block("spacer", 0);
        session.insert_block("divider", 1);

        session.start_block_drag(&first, 40.0).unwrap();
        let html = session.render_current_step();
        assert!(html.contains("<div class=\"sc-placeholder\" style=\"height:40px\"></div>"));
        assert_eq!(html.matches("data-block-id").count(), 1);

        assert!(session.cancel_drag());
        assert!(!session.render_current_step().contains("sc-placeholder"));
    }
}
