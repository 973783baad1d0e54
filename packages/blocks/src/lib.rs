//! # Stepcraft Blocks
//!
//! The polymorphic content model of the editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Block: id + type + content + attrs + settings│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ BlockRegistry: type → BlockVariant          │
//! │  - create / hydrate by type string          │
//! │  - palette grouping by category             │
//! │  - pass-through fallback for unknown types  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ BlockVariant: render, settings form,        │
//! │ defaults, external references               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! New kinds of blocks are added by registering another [`BlockVariant`].
//! Nothing outside the registry branches on type strings.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stepcraft_blocks::{BlockRegistry, RenderContext};
//!
//! let registry = BlockRegistry::with_builtins();
//! let block = registry.create("heading", None)?;
//! let html = registry.render(&block, &RenderContext::default());
//! ```

mod block;
mod errors;
mod form;
pub mod legacy;
pub mod markup;
mod registry;
mod resource;
pub mod settings;
mod variant;
pub mod variants;

pub use block::{Attributes, Block, BlockId};
pub use errors::BlockError;
pub use form::{Control, SettingsField, SettingsForm};
pub use registry::{BlockRegistry, PaletteItem};
pub use resource::{ExternalResource, ResourceField, ResourceState};
pub use settings::{Alignment, Settings};
pub use variant::{BlockVariant, Category, FieldSpec, RenderContext};
