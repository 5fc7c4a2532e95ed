//! Conversation history engine
//!
//! This module contains the storage lifecycle core: record types, the
//! repository with its commit/eviction protocol, derived indexing, the
//! debounced autosave scheduler, and snapshot import/export.

pub mod autosave;
pub mod index;
pub mod repository;
pub mod transfer;
pub mod types;

pub use autosave::AutosaveScheduler;
pub use repository::ConversationRepository;
pub use transfer::{export_all, import_all, ImportReport, SnapshotDocument};
pub use types::{new_conversation_id, Conversation, ConversationSummary, Message, Sender};
