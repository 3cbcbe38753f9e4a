//! Deterministic reconstruction of ledger state from the settlement
//! journal.
//!
//! Replay is how a durable engine comes back up: every applied entry is
//! folded into a fresh store in sequence order. Rejected entries are
//! audit-only and are skipped. The journal is authoritative — a mismatch
//! between what it says and what the store can reproduce is an integrity
//! violation, not something to paper over.

use tracing::debug;

use cadastre_journal::{OperationDetail, OperationKind, SettlementEntry};
use cadastre_store::ParcelStore;

use crate::error::LedgerError;

/// Counters describing a completed replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries examined, applied or not.
    pub evaluated: u64,
    /// Applied entries folded into the store.
    pub applied: u64,
}

/// Fold every applied entry of `entries` into `store`, in order.
///
/// The store must be empty (or at least agree with the journal prefix
/// already applied to it); registrations must come back from the
/// allocator with exactly the journaled identifier.
pub fn rebuild<S: ParcelStore>(
    store: &S,
    entries: &[SettlementEntry],
) -> Result<ReplayStats, LedgerError> {
    let mut stats = ReplayStats::default();

    for entry in entries {
        stats.evaluated += 1;
        if !entry.outcome.is_applied() {
            continue;
        }
        apply(store, entry)?;
        stats.applied += 1;
    }

    debug!(
        evaluated = stats.evaluated,
        applied = stats.applied,
        "journal replay complete"
    );
    Ok(stats)
}

fn apply<S: ParcelStore>(store: &S, entry: &SettlementEntry) -> Result<(), LedgerError> {
    match entry.kind {
        OperationKind::Registration => {
            let OperationDetail::Registration { location, area } = &entry.detail else {
                return Err(violation(entry, "registration entry has no detail payload"));
            };
            let price = entry
                .amount
                .ok_or_else(|| violation(entry, "registration entry has no asking price"))?;
            let id = store.create(&entry.actor, location, *area, price)?;
            if id != entry.parcel {
                return Err(violation(
                    entry,
                    format!("allocator produced {id}, journal says {}", entry.parcel),
                ));
            }
        }
        OperationKind::Listing => {
            let mut parcel = lookup(store, entry)?;
            parcel.price = entry
                .amount
                .ok_or_else(|| violation(entry, "listing entry has no price"))?;
            parcel.for_sale = true;
            store.set(entry.parcel, parcel)?;
        }
        OperationKind::Purchase => {
            let mut parcel = lookup(store, entry)?;
            parcel.owner = entry.actor;
            parcel.for_sale = false;
            store.set(entry.parcel, parcel)?;
        }
        OperationKind::Transfer => {
            let mut parcel = lookup(store, entry)?;
            parcel.owner = entry
                .counterpart
                .ok_or_else(|| violation(entry, "transfer entry has no new owner"))?;
            store.set(entry.parcel, parcel)?;
        }
    }
    Ok(())
}

fn lookup<S: ParcelStore>(
    store: &S,
    entry: &SettlementEntry,
) -> Result<cadastre_types::Parcel, LedgerError> {
    store
        .get(entry.parcel)
        .ok_or_else(|| violation(entry, format!("{} was never registered", entry.parcel)))
}

fn violation(entry: &SettlementEntry, reason: impl Into<String>) -> LedgerError {
    LedgerError::IntegrityViolation {
        seq: entry.seq,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_journal::EntryDraft;
    use cadastre_store::InMemoryParcelStore;
    use cadastre_types::{AccountId, ParcelId};

    fn account(seed: u8) -> AccountId {
        AccountId::from_raw([seed; 32])
    }

    #[test]
    fn rebuild_replays_full_lifecycle() {
        let owner = account(1);
        let buyer = account(2);
        let heir = account(3);

        let entries = vec![
            EntryDraft::registration(ParcelId(1), owner, "Plot A", 100, 500).seal(1),
            EntryDraft::listing(ParcelId(1), owner, 600).seal(2),
            EntryDraft::purchase(ParcelId(1), buyer, Some(owner), 600).seal(3),
            EntryDraft::transfer(ParcelId(1), buyer, heir).seal(4),
        ];

        let store = InMemoryParcelStore::new();
        let stats = rebuild(&store, &entries).unwrap();
        assert_eq!(stats, ReplayStats { evaluated: 4, applied: 4 });

        let parcel = store.get(ParcelId(1)).unwrap();
        assert_eq!(parcel.owner, heir);
        assert_eq!(parcel.location, "Plot A");
        assert_eq!(parcel.area, 100);
        assert_eq!(parcel.price, 600);
        assert!(!parcel.for_sale);
        assert_eq!(store.next_id(), 2);
    }

    #[test]
    fn rejected_entries_are_skipped() {
        let owner = account(1);
        let entries = vec![
            EntryDraft::registration(ParcelId(1), owner, "Plot A", 100, 500).seal(1),
            EntryDraft::rejected(
                OperationKind::Listing,
                ParcelId(1),
                account(2),
                "caller is not the owner",
            )
            .seal(2),
        ];

        let store = InMemoryParcelStore::new();
        let stats = rebuild(&store, &entries).unwrap();
        assert_eq!(stats, ReplayStats { evaluated: 2, applied: 1 });
        assert!(!store.get(ParcelId(1)).unwrap().for_sale);
    }

    #[test]
    fn listing_before_registration_is_an_integrity_violation() {
        let entries = vec![EntryDraft::listing(ParcelId(1), account(1), 600).seal(1)];
        let store = InMemoryParcelStore::new();
        let error = rebuild(&store, &entries).unwrap_err();
        assert!(matches!(
            error,
            LedgerError::IntegrityViolation { seq: 1, .. }
        ));
    }

    #[test]
    fn allocator_disagreement_is_an_integrity_violation() {
        // The journal claims the first registration got id 5.
        let entries =
            vec![EntryDraft::registration(ParcelId(5), account(1), "Plot A", 100, 500).seal(1)];
        let store = InMemoryParcelStore::new();
        let error = rebuild(&store, &entries).unwrap_err();
        assert!(matches!(
            error,
            LedgerError::IntegrityViolation { seq: 1, .. }
        ));
    }

    #[test]
    fn empty_journal_rebuilds_empty_store() {
        let store = InMemoryParcelStore::new();
        let stats = rebuild(&store, &[]).unwrap();
        assert_eq!(stats, ReplayStats::default());
        assert!(store.is_empty());
    }
}
