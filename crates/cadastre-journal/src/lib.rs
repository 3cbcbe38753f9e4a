//! Append-only settlement journal for the cadastre ledger.
//!
//! Every state-changing call the engine applies (and every rejected
//! attempt on an existing parcel) is recorded here as an immutable
//! [`SettlementEntry`]. The journal serves three purposes:
//! - Audit: reconstruct the full history of a parcel or an account
//! - Idempotence: detect resubmission of an already-applied request
//! - Durability: a write-ahead segment makes committed transitions
//!   survive a crash
//!
//! Entries are never mutated, never removed, and never reordered.

pub mod entry;
pub mod error;
pub mod journal;
pub mod wal;

pub use entry::{EntryDraft, OperationDetail, OperationKind, Outcome, SettlementEntry};
pub use error::{JournalError, JournalResult};
pub use journal::{JournalConfig, SettlementJournal};
pub use wal::{SegmentWal, SyncMode};
