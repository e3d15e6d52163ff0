//! Moving records in and out of files.
//!
//! - [`template`] - template snapshot/apply and the JSON export envelope
//! - [`items`] - bulk item import from JSONL
//! - [`file`] - atomic writes and JSONL reading

pub mod file;
pub mod items;
pub mod template;

pub use file::atomic_write;
pub use items::{import_items, ImportDefaults, ItemRecord};
pub use template::{TemplateEnvelope, TEMPLATE_FORMAT_VERSION};
