use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::entry::SettlementEntry;
use crate::error::{JournalError, JournalResult};

/// Flush/sync strategy for the settlement segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` before every append is acknowledged. Required for the
    /// no-committed-transition-lost-on-crash contract.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (faster, weaker durability).
    OsDefault,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct SegmentWriter {
    writer: BufWriter<File>,
    /// Current write offset in the segment file.
    offset: u64,
}

/// Durable append-only segment for settlement entries.
///
/// On-disk frame format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized SettlementEntry)]
/// ```
///
/// The segment is written before the corresponding entry is published in
/// memory, so every acknowledged append is recoverable. Recovery reads
/// front-to-back and **stops** at the first incomplete or corrupt frame:
/// a settlement stream must not resume past a hole, so everything from
/// the first bad frame on is treated as an unacknowledged torn tail.
pub struct SegmentWal {
    path: PathBuf,
    writer: Mutex<SegmentWriter>,
    sync_mode: SyncMode,
}

impl SegmentWal {
    /// Open (or create) a segment file at the given path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> JournalResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let offset = file.metadata()?.len();
        let writer = BufWriter::new(file);

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(SegmentWriter { writer, offset }),
            sync_mode,
        })
    }

    /// Append a single entry. Returns the byte offset of its frame.
    pub fn append(&self, entry: &SettlementEntry) -> JournalResult<u64> {
        let payload =
            bincode::serialize(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;

        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().expect("segment mutex poisoned");
        let frame_offset = w.offset;

        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }

        w.offset += HEADER_SIZE as u64 + payload.len() as u64;

        debug!(offset = frame_offset, seq = entry.seq, "segment append");
        Ok(frame_offset)
    }

    /// Recover all acknowledged entries from the segment.
    ///
    /// Reads front-to-back; stops at the first frame that is truncated,
    /// fails its CRC check, or fails to deserialize. A bad frame other
    /// than a clean end-of-file is reported at `warn` — it is either a
    /// torn write from a crash (expected) or corruption (not).
    pub fn recover(&self) -> JournalResult<Vec<SettlementEntry>> {
        let mut file = BufReader::new(File::open(&self.path)?);
        let file_len = file.get_ref().metadata()?.len();
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        while offset + HEADER_SIZE as u64 <= file_len {
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; HEADER_SIZE];
            match file.read_exact(&mut header) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if length == 0 || (offset + HEADER_SIZE as u64 + length as u64) > file_len {
                warn!(offset, length, file_len, "truncated segment frame; stopping recovery");
                break;
            }

            let mut payload = vec![0u8; length as usize];
            match file.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    warn!(offset, "torn segment frame; stopping recovery");
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let actual_crc = crc32fast::hash(&payload);
            if actual_crc != expected_crc {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "segment CRC mismatch; stopping recovery"
                );
                break;
            }

            match bincode::deserialize::<SettlementEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(offset, error = %e, "undecodable segment frame; stopping recovery");
                    break;
                }
            }

            offset += HEADER_SIZE as u64 + length as u64;
        }

        debug!(recovered = entries.len(), "segment recovery complete");
        Ok(entries)
    }

    /// Current write offset.
    pub fn offset(&self) -> u64 {
        self.writer.lock().expect("segment mutex poisoned").offset
    }

    /// Path to the segment file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryDraft;
    use cadastre_types::{AccountId, ParcelId};

    fn make_entry(seq: u64) -> SettlementEntry {
        EntryDraft::listing(ParcelId(seq), AccountId::from_raw([42; 32]), 100 * seq).seal(seq)
    }

    #[test]
    fn append_and_recover_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let wal = SegmentWal::open(&dir.path().join("settle.seg"), SyncMode::EveryWrite).unwrap();

        let entries: Vec<_> = (1..=3).map(make_entry).collect();
        for entry in &entries {
            wal.append(entry).unwrap();
        }

        let recovered = wal.recover().unwrap();
        assert_eq!(recovered, entries);
    }

    #[test]
    fn recover_empty_segment() {
        let dir = tempfile::tempdir().unwrap();
        let wal = SegmentWal::open(&dir.path().join("empty.seg"), SyncMode::default()).unwrap();
        assert!(wal.recover().unwrap().is_empty());
    }

    #[test]
    fn crc_corruption_stops_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.seg");
        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();

        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        drop(wal);

        // Flip a byte in the first frame's payload (byte 8 is the first
        // payload byte).
        {
            let mut file = OpenOptions::new().write(true).read(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        // Recovery must not skip past the corrupt frame: nothing after
        // the hole is trusted.
        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();
        assert!(wal.recover().unwrap().is_empty());
    }

    #[test]
    fn recovery_drops_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.seg");
        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();

        wal.append(&make_entry(1)).unwrap();
        wal.append(&make_entry(2)).unwrap();
        let total_len = wal.offset();
        drop(wal);

        // Truncate the file mid-frame (remove the last 4 bytes).
        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total_len - 4).unwrap();
        }

        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();
        let recovered = wal.recover().unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].seq, 1);
        assert_eq!(recovered[0].parcel, ParcelId(1));
    }

    #[test]
    fn append_returns_increasing_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let wal = SegmentWal::open(&dir.path().join("off.seg"), SyncMode::OsDefault).unwrap();

        let off1 = wal.append(&make_entry(1)).unwrap();
        let off2 = wal.append(&make_entry(2)).unwrap();
        assert_eq!(off1, 0);
        assert!(off2 > off1);
        assert!(wal.offset() > off2);
    }

    #[test]
    fn reopen_appends_after_existing_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.seg");

        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();
        wal.append(&make_entry(1)).unwrap();
        drop(wal);

        let wal = SegmentWal::open(&path, SyncMode::EveryWrite).unwrap();
        wal.append(&make_entry(2)).unwrap();

        let recovered = wal.recover().unwrap();
        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].seq, 1);
        assert_eq!(recovered[1].seq, 2);
    }
}
