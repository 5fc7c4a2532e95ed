//! Carelog - On-device conversation storage engine
//!
//! This library persists multi-turn AI-assistant conversations inside a
//! capacity-bounded embedded key-value store: durable conversation
//! documents, a derived search/tag index, debounced autosave, quota
//! enforcement with oldest-first eviction, and whole-store
//! export/import with conflict-free identifier regeneration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `store`: Quota-bounded blob storage (embedded `sled` plus an
//!   in-memory implementation for tests)
//! - `history`: The conversation engine: record types, repository,
//!   derived indexing, autosave scheduler, snapshot transfer
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use carelog::config::HistoryConfig;
//! use carelog::history::{ConversationRepository, Message};
//! use carelog::store::SledBlobStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = SledBlobStore::open_default(5 * 1024 * 1024)?;
//!     let mut repository = ConversationRepository::new(store, HistoryConfig::default());
//!
//!     let messages = vec![Message::user("My blood pressure was 150 over 95")];
//!     let conversation = repository.create(&messages, None)?;
//!     println!("saved {}", conversation.id);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{CarelogError, Result};
pub use history::{
    AutosaveScheduler, Conversation, ConversationRepository, ConversationSummary, Message, Sender,
    SnapshotDocument,
};
pub use store::{BlobStore, MemoryBlobStore, SledBlobStore, StorageUsage};
