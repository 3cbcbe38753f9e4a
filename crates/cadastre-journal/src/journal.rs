use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, info};

use cadastre_types::{AccountId, ParcelId};

use crate::entry::{EntryDraft, SettlementEntry};
use crate::error::{JournalError, JournalResult};
use crate::wal::{SegmentWal, SyncMode};

/// Configuration for a durable settlement journal.
#[derive(Clone, Copy, Debug, Default)]
pub struct JournalConfig {
    /// Sync strategy for the durable segment.
    pub sync_mode: SyncMode,
}

struct JournalState {
    entries: Vec<SettlementEntry>,
    /// Index of the most recent entry per (actor, parcel).
    last_index: HashMap<(AccountId, ParcelId), usize>,
    /// Index of the most recent *applied* entry per parcel. Rejected
    /// attempts record nothing here: they change no state, so they do
    /// not close the resubmission window.
    last_applied: HashMap<ParcelId, usize>,
}

impl JournalState {
    fn index_of_last(&mut self) {
        if let Some(entry) = self.entries.last() {
            let position = self.entries.len() - 1;
            self.last_index.insert((entry.actor, entry.parcel), position);
            if entry.outcome.is_applied() {
                self.last_applied.insert(entry.parcel, position);
            }
        }
    }
}

/// Append-only settlement log.
///
/// Sequence numbers start at 1 and are strictly monotonic; entries are
/// never mutated, removed, or reordered. When a durable segment is
/// attached, an entry is written (and synced, per [`SyncMode`]) to the
/// segment before it is published in memory — an acknowledged append is
/// always recoverable.
pub struct SettlementJournal {
    state: Mutex<JournalState>,
    wal: Option<SegmentWal>,
}

impl SettlementJournal {
    /// A journal with no durable segment (tests and embedding).
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(JournalState {
                entries: Vec::new(),
                last_index: HashMap::new(),
                last_applied: HashMap::new(),
            }),
            wal: None,
        }
    }

    /// Open a durable journal backed by the segment file at `path`,
    /// recovering every acknowledged entry in it.
    pub fn open_durable(path: &Path, config: JournalConfig) -> JournalResult<Self> {
        let wal = SegmentWal::open(path, config.sync_mode)?;
        let entries = wal.recover()?;
        verify_continuity(&entries)?;

        let mut state = JournalState {
            entries: Vec::with_capacity(entries.len()),
            last_index: HashMap::new(),
            last_applied: HashMap::new(),
        };
        for entry in entries {
            state.entries.push(entry);
            state.index_of_last();
        }

        info!(
            recovered = state.entries.len(),
            path = %path.display(),
            "settlement journal recovered"
        );

        Ok(Self {
            state: Mutex::new(state),
            wal: Some(wal),
        })
    }

    /// Returns `true` if appends are written to a durable segment.
    pub fn is_durable(&self) -> bool {
        self.wal.is_some()
    }

    /// Seal and append a draft. Returns the recorded entry.
    ///
    /// The sequence number is assigned here; with a durable segment the
    /// frame hits the segment (and disk, under `SyncMode::EveryWrite`)
    /// before the entry becomes visible to readers.
    pub fn append(&self, draft: EntryDraft) -> JournalResult<SettlementEntry> {
        let mut state = self.state.lock().expect("journal mutex poisoned");

        let seq = state.entries.len() as u64 + 1;
        let entry = draft.seal(seq);

        if let Some(wal) = &self.wal {
            wal.append(&entry)?;
        }

        state.entries.push(entry.clone());
        state.index_of_last();

        debug!(seq, kind = %entry.kind, parcel = %entry.parcel, "settlement recorded");
        Ok(entry)
    }

    /// The most recent entry for the given (actor, parcel), if any.
    pub fn last_for(&self, actor: &AccountId, parcel: ParcelId) -> Option<SettlementEntry> {
        let state = self.state.lock().expect("journal mutex poisoned");
        state
            .last_index
            .get(&(*actor, parcel))
            .map(|&index| state.entries[index].clone())
    }

    /// The most recent *applied* entry for the given parcel, if any.
    ///
    /// This is the bounded resubmission-detection window: a retried
    /// request is answered from the journal only while no other applied
    /// operation has touched the parcel since. Rejected attempts change
    /// no state and therefore do not close the window.
    pub fn last_applied_for(&self, parcel: ParcelId) -> Option<SettlementEntry> {
        let state = self.state.lock().expect("journal mutex poisoned");
        state
            .last_applied
            .get(&parcel)
            .map(|&index| state.entries[index].clone())
    }

    /// Full copy of the stream in append order.
    pub fn entries(&self) -> Vec<SettlementEntry> {
        self.state.lock().expect("journal mutex poisoned").entries.clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.state.lock().expect("journal mutex poisoned").entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check sequence continuity of the stream (1, 2, 3, ... with no
    /// gaps or reordering).
    pub fn verify(&self) -> JournalResult<()> {
        let state = self.state.lock().expect("journal mutex poisoned");
        verify_continuity(&state.entries)
    }
}

fn verify_continuity(entries: &[SettlementEntry]) -> JournalResult<()> {
    for (index, entry) in entries.iter().enumerate() {
        let expected = index as u64 + 1;
        if entry.seq != expected {
            return Err(JournalError::IntegrityViolation {
                seq: entry.seq,
                reason: format!("expected seq {expected}, found {}", entry.seq),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{OperationKind, Outcome};

    fn actor(seed: u8) -> AccountId {
        AccountId::from_raw([seed; 32])
    }

    fn listing_draft(actor: AccountId, parcel: u64, price: u64) -> EntryDraft {
        EntryDraft::listing(ParcelId(parcel), actor, price)
    }

    #[test]
    fn append_assigns_monotonic_seqs() {
        let journal = SettlementJournal::in_memory();
        let a = journal.append(listing_draft(actor(1), 1, 100)).unwrap();
        let b = journal.append(listing_draft(actor(1), 2, 200)).unwrap();
        let c = journal.append(listing_draft(actor(2), 1, 300)).unwrap();
        assert_eq!((a.seq, b.seq, c.seq), (1, 2, 3));
        assert_eq!(journal.len(), 3);
        journal.verify().unwrap();
    }

    #[test]
    fn last_for_tracks_most_recent_entry() {
        let journal = SettlementJournal::in_memory();
        let alice = actor(1);
        let bob = actor(2);

        journal.append(listing_draft(alice, 1, 100)).unwrap();
        journal.append(listing_draft(bob, 1, 200)).unwrap();
        journal.append(listing_draft(alice, 1, 300)).unwrap();

        let last_alice = journal.last_for(&alice, ParcelId(1)).unwrap();
        assert_eq!(last_alice.seq, 3);
        assert_eq!(last_alice.amount, Some(300));

        let last_bob = journal.last_for(&bob, ParcelId(1)).unwrap();
        assert_eq!(last_bob.seq, 2);

        assert!(journal.last_for(&alice, ParcelId(9)).is_none());
    }

    #[test]
    fn last_applied_ignores_rejections_and_tracks_any_actor() {
        let journal = SettlementJournal::in_memory();
        let alice = actor(1);
        let bob = actor(2);

        journal.append(listing_draft(alice, 1, 100)).unwrap();
        journal
            .append(EntryDraft::rejected(
                OperationKind::Purchase,
                ParcelId(1),
                bob,
                "payment mismatch",
            ))
            .unwrap();

        // The rejection is Bob's latest entry, but the latest *applied*
        // entry on the parcel is still Alice's listing.
        let last_applied = journal.last_applied_for(ParcelId(1)).unwrap();
        assert_eq!(last_applied.seq, 1);
        assert_eq!(last_applied.actor, alice);

        journal.append(listing_draft(bob, 1, 300)).unwrap();
        assert_eq!(journal.last_applied_for(ParcelId(1)).unwrap().seq, 3);
        assert!(journal.last_applied_for(ParcelId(9)).is_none());
    }

    #[test]
    fn rejected_entries_are_part_of_the_stream() {
        let journal = SettlementJournal::in_memory();
        let entry = journal
            .append(EntryDraft::rejected(
                OperationKind::Purchase,
                ParcelId(1),
                actor(1),
                "payment of 500 does not match listed price 600",
            ))
            .unwrap();
        assert_eq!(entry.seq, 1);
        assert!(matches!(entry.outcome, Outcome::Rejected { .. }));
        assert_eq!(journal.last_for(&actor(1), ParcelId(1)).unwrap().seq, 1);
    }

    #[test]
    fn durable_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlements.seg");

        {
            let journal = SettlementJournal::open_durable(&path, JournalConfig::default()).unwrap();
            assert!(journal.is_durable());
            journal.append(listing_draft(actor(1), 1, 100)).unwrap();
            journal.append(listing_draft(actor(2), 1, 250)).unwrap();
        }

        let journal = SettlementJournal::open_durable(&path, JournalConfig::default()).unwrap();
        assert_eq!(journal.len(), 2);
        journal.verify().unwrap();

        let last = journal.last_for(&actor(2), ParcelId(1)).unwrap();
        assert_eq!(last.seq, 2);
        assert_eq!(last.amount, Some(250));

        // Appends continue from the recovered position.
        let next = journal.append(listing_draft(actor(1), 2, 400)).unwrap();
        assert_eq!(next.seq, 3);
    }

    #[test]
    fn verify_detects_sequence_gap() {
        let entries = vec![
            listing_draft(actor(1), 1, 100).seal(1),
            listing_draft(actor(1), 2, 100).seal(3),
        ];
        let error = verify_continuity(&entries).unwrap_err();
        assert!(matches!(
            error,
            JournalError::IntegrityViolation { seq: 3, .. }
        ));
    }

    #[test]
    fn in_memory_journal_is_not_durable() {
        let journal = SettlementJournal::in_memory();
        assert!(!journal.is_durable());
        assert!(journal.is_empty());
    }
}
