//! planner-store: Storage layer for the notes board API
//!
//! This crate provides:
//! - The [`BoardRepository`] trait over users, boards, membership and groups,
//!   implemented on PostgreSQL ([`Store`]) and in memory ([`MemoryStore`])
//! - The [`DocumentStore`] trait for schemaless note documents, implemented
//!   on a PostgreSQL JSONB table ([`PgDocumentStore`]) and in memory
//!   ([`MemoryDocumentStore`])
//! - [`NoteHierarchyStore`], note CRUD plus the group-destroy cascade/move
//! - Migration management
//!
//! # Usage
//!
//! ```rust,ignore
//! use planner_store::{BoardRepository, NoteHierarchyStore, Store, StoreConfig};
//!
//! let config = StoreConfig::from_env()?;
//! let store = Store::connect(config).await?;
//!
//! let board = store.get_board(board_id).await?;
//! let notes = notes.list(board.id.into()).await?;
//! ```

pub mod documents;
pub mod error;
pub mod memory;
pub mod models;
pub mod notes;
pub mod pg_documents;
pub mod repository;
pub mod schema;
pub mod store;

pub use documents::{CollectionPath, Document, DocumentPath, DocumentStore, MemoryDocumentStore};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{GroupChanges, NewBoard, NewGroup, NewUser};
pub use notes::{GroupNotesOutcome, NoteHierarchyStore};
pub use pg_documents::PgDocumentStore;
pub use repository::BoardRepository;
pub use store::{Store, StoreConfig};

// Re-export planner-core for downstream crates
pub use planner_core;
