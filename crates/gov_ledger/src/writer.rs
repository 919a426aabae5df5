//! The single-writer ledger handle: append, replay-on-open, corruption
//! detection.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use gov_core::{GovError, GovResult, Hash32};
use gov_io::atomic::{append_bytes_fsync, write_bytes_atomically};
use gov_io::canon::hash_canonical;

use crate::entry::{normalize_legacy_type_key, tail_hash_input, EntryType, LedgerEntry};

const GENESIS_TAIL: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Result of opening a ledger on disk: either a live writer, or a read-only
/// handle describing why the chain failed to verify (spec §4.2: "fails open
/// in read-only recovery mode ... no automatic truncation").
pub enum LedgerHandle {
    Writable(LedgerWriter),
    ReadOnly { reason: GovError, entries: Vec<LedgerEntry> },
}

pub struct LedgerWriter {
    path: PathBuf,
    tail_path: PathBuf,
    next_idx: u64,
    tail_hash: Hash32,
}

impl LedgerWriter {
    /// Open (creating if absent) the ledger at `path`, replaying all
    /// existing entries and verifying the tail-hash chain against the
    /// sibling `<path>.tail` file. A fresh ledger starts the chain from a
    /// well-known genesis hash of all zeroes.
    pub fn open(path: &Path) -> GovResult<LedgerHandle> {
        let tail_path = sibling_tail_path(path);
        let (entries, corruption) = replay(path)?;
        if let Some(reason) = corruption {
            return Ok(LedgerHandle::ReadOnly { reason, entries });
        }

        let recomputed_tail = entries
            .last()
            .map(|e| e.tail_hash.clone())
            .unwrap_or_else(genesis_hash);

        if tail_path.exists() {
            let persisted = std::fs::read_to_string(&tail_path)
                .map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
            let persisted = persisted.trim();
            if persisted != recomputed_tail.as_hex() {
                return Ok(LedgerHandle::ReadOnly {
                    reason: GovError::LedgerCorruptionDetected {
                        idx: entries.len() as u64,
                        detail: format!(
                            "persisted tail {persisted} disagrees with recomputed {}",
                            recomputed_tail.as_hex()
                        ),
                    },
                    entries,
                });
            }
        }

        Ok(LedgerHandle::Writable(LedgerWriter {
            path: path.to_path_buf(),
            tail_path,
            next_idx: entries.len() as u64,
            tail_hash: recomputed_tail,
        }))
    }

    pub fn tail_hash(&self) -> &Hash32 {
        &self.tail_hash
    }

    /// Append a new entry. Serialized through `&mut self` — callers own the
    /// single-writer discipline by holding this behind whatever lock their
    /// concurrency model uses (spec §5).
    pub fn append(
        &mut self,
        entry_type: EntryType,
        payload: serde_json::Value,
        ts: i64,
    ) -> GovResult<(u64, Hash32)> {
        let payload_hash =
            hash_canonical(&payload).map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
        let idx = self.next_idx;
        let input = tail_hash_input(idx, entry_type, ts, &payload_hash, &self.tail_hash);
        let tail_hash = gov_io::canon::sha256_hex_bytes(input.as_bytes());

        let entry = LedgerEntry {
            idx,
            entry_type,
            ts,
            payload,
            prev_tail_hash: self.tail_hash.clone(),
            tail_hash: tail_hash.clone(),
        };

        let mut line =
            serde_json::to_vec(&entry).map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
        line.push(b'\n');
        append_bytes_fsync(&self.path, &line)
            .map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
        write_bytes_atomically(&self.tail_path, tail_hash.as_hex().as_bytes())
            .map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;

        self.next_idx += 1;
        self.tail_hash = tail_hash.clone();
        if dev_log_payload_enabled() {
            tracing::debug!(idx, entry_type = %entry_type, tail_hash = %tail_hash, payload = %entry.payload, "ledger append");
        } else {
            tracing::debug!(idx, entry_type = %entry_type, payload_hash = %payload_hash, tail_hash = %tail_hash, "ledger append");
        }
        Ok((idx, tail_hash))
    }
}

/// `DEV_LOG_PAYLOAD=1` switches append logging from hash-only to the full
/// payload (spec §6 "Environment"); dev mode only, never changes what's
/// persisted to the ledger file itself.
fn dev_log_payload_enabled() -> bool {
    std::env::var("DEV_LOG_PAYLOAD").as_deref() == Ok("1")
}

fn sibling_tail_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tail");
    PathBuf::from(os)
}

fn genesis_hash() -> Hash32 {
    Hash32::from_trusted_hex(GENESIS_TAIL.to_string())
}

/// Read every line of the ledger file (if any), normalize legacy `type`
/// keys, and recompute the chain to verify internal consistency
/// (`prev_tail_hash` links and `tail_hash` recomputation per entry).
///
/// A bad line does not abort the read: it stops replay and is reported
/// alongside every entry successfully read before it, so `open` can fail
/// into `LedgerHandle::ReadOnly` with a usable partial history (spec
/// §4.2: "fails open in read-only recovery mode ... no automatic
/// truncation") instead of losing the whole ledger to a propagated `Err`.
pub(crate) fn replay(path: &Path) -> GovResult<(Vec<LedgerEntry>, Option<GovError>)> {
    if !path.exists() {
        return Ok((Vec::new(), None));
    }
    let f = std::fs::File::open(path).map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
    let reader = BufReader::new(f);

    let mut entries = Vec::new();
    let mut prev = genesis_hash();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| GovError::LedgerAppendFailed(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let reason = GovError::LedgerCorruptionDetected {
                    idx: line_no as u64,
                    detail: format!("malformed JSON: {e}"),
                };
                return Ok((entries, Some(reason)));
            }
        };
        let raw = normalize_legacy_type_key(raw);
        let entry: LedgerEntry = match serde_json::from_value(raw) {
            Ok(e) => e,
            Err(e) => {
                let reason = GovError::LedgerCorruptionDetected {
                    idx: line_no as u64,
                    detail: format!("malformed entry: {e}"),
                };
                return Ok((entries, Some(reason)));
            }
        };

        if entry.idx != line_no as u64 || entry.prev_tail_hash.as_hex() != prev.as_hex() {
            let reason = GovError::LedgerCorruptionDetected {
                idx: entry.idx,
                detail: "idx or prev_tail_hash chain break".into(),
            };
            return Ok((entries, Some(reason)));
        }
        let payload_hash = match hash_canonical(&entry.payload) {
            Ok(h) => h,
            Err(e) => {
                let reason = GovError::LedgerCorruptionDetected { idx: entry.idx, detail: e.to_string() };
                return Ok((entries, Some(reason)));
            }
        };
        let input = tail_hash_input(entry.idx, entry.entry_type, entry.ts, &payload_hash, &prev);
        let recomputed = gov_io::canon::sha256_hex_bytes(input.as_bytes());
        if recomputed.as_hex() != entry.tail_hash.as_hex() {
            let reason = GovError::LedgerCorruptionDetected {
                idx: entry.idx,
                detail: "tail_hash does not match recomputed value".into(),
            };
            return Ok((entries, Some(reason)));
        }

        prev = entry.tail_hash.clone();
        entries.push(entry);
    }

    Ok((entries, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_and_reopen_replays_consistently() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence_ledger.jsonl");

        let mut w = match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::Writable(w) => w,
            LedgerHandle::ReadOnly { .. } => panic!("expected writable on fresh ledger"),
        };
        let (idx0, _) = w
            .append(EntryType::TuningIrProposed, serde_json::json!({"a": 1}), 1000)
            .unwrap();
        let (idx1, tail1) = w
            .append(EntryType::TuningIrApplied, serde_json::json!({"a": 2}), 1001)
            .unwrap();
        assert_eq!(idx0, 0);
        assert_eq!(idx1, 1);

        match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::Writable(w2) => assert_eq!(w2.tail_hash().as_hex(), tail1.as_hex()),
            LedgerHandle::ReadOnly { reason, .. } => panic!("unexpected corruption: {reason}"),
        }
    }

    #[test]
    fn tampered_entry_is_detected_as_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evidence_ledger.jsonl");
        let mut w = match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::Writable(w) => w,
            _ => unreachable!(),
        };
        w.append(EntryType::TuningIrProposed, serde_json::json!({"a": 1}), 1000)
            .unwrap();
        drop(w);

        let content = std::fs::read_to_string(&path).unwrap();
        let tampered = content.replace("\"a\":1", "\"a\":999");
        std::fs::write(&path, tampered).unwrap();

        match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::ReadOnly { .. } => {}
            LedgerHandle::Writable(_) => panic!("tampering should be detected"),
        }
    }
}
