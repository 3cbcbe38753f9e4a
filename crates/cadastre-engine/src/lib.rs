//! Ledger engine for the cadastre land registry.
//!
//! This crate is the heart of the cadastre. It provides:
//! - The five ledger operations behind the registry surface
//! - Pure invariant checks run before every mutation
//! - Per-parcel mutual exclusion (unrelated parcels mutate in parallel)
//! - Atomic settlement: no committed state without a recorded
//!   settlement, and no settlement without committed state
//! - Resubmission detection answered from the journal
//! - Deterministic replay of the journal on durable startup
//!
//! # Quick Start
//!
//! ```rust
//! use cadastre_engine::{AccountId, LedgerEngine, RegistryReader, RegistryWriter};
//!
//! let engine = LedgerEngine::in_memory();
//! let owner = AccountId::ephemeral();
//! let buyer = AccountId::ephemeral();
//!
//! let id = engine.register_land(&owner, "Plot 7, North Ridge", 250, 900).unwrap();
//! engine.list_for_sale(&owner, id, 1_000).unwrap();
//! engine.purchase_land(&buyer, id, 1_000).unwrap();
//!
//! assert_eq!(engine.parcel(id).unwrap().owner, buyer);
//! ```

pub mod engine;
pub mod error;
pub mod guard;
pub mod replay;
pub mod traits;

pub use engine::LedgerEngine;
pub use error::LedgerError;
pub use replay::{rebuild, ReplayStats};
pub use traits::{RegistryReader, RegistryWriter};

// Re-export key types
pub use cadastre_journal::{
    JournalConfig, OperationKind, Outcome, SettlementEntry, SettlementJournal, SyncMode,
};
pub use cadastre_store::{InMemoryParcelStore, ParcelStore};
pub use cadastre_types::{AccountId, AccountMaterial, Parcel, ParcelId};
