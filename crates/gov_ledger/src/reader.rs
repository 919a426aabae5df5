//! A parallel, read-only view of the ledger. Readers never take the writer
//! lock; each call re-replays the file, which is fine at this engine's
//! scale (spec §5: "Readers of snapshot data may run in parallel").

use std::path::{Path, PathBuf};

use gov_core::GovResult;

use crate::entry::LedgerEntry;
use crate::writer::replay;

pub struct LedgerReader {
    path: PathBuf,
}

impl LedgerReader {
    pub fn new(path: &Path) -> Self {
        LedgerReader { path: path.to_path_buf() }
    }

    /// All entries from `from_idx` (inclusive) to the current tail. On
    /// corruption this reads only the valid prefix replay reached before
    /// the break; `LedgerWriter::open` is what surfaces the corruption
    /// itself.
    pub fn iter(&self, from_idx: u64) -> GovResult<Vec<LedgerEntry>> {
        let (entries, _) = replay(&self.path)?;
        Ok(entries.into_iter().filter(|e| e.idx >= from_idx).collect())
    }

    /// A single entry by index, or `None` if the ledger doesn't reach it.
    pub fn read(&self, idx: u64) -> GovResult<Option<LedgerEntry>> {
        let (entries, _) = replay(&self.path)?;
        Ok(entries.into_iter().find(|e| e.idx == idx))
    }

    /// Entries whose `entry_type` matches `wire_name`, used by the cooldown
    /// scanner (`entry_type == "tuning_ir_rolled_back"`, spec §4.9).
    pub fn entries_of_type(&self, wire_name: &str) -> GovResult<Vec<LedgerEntry>> {
        let (entries, _) = replay(&self.path)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.entry_type.as_wire_str() == wire_name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryType;
    use crate::writer::{LedgerHandle, LedgerWriter};
    use tempfile::tempdir;

    #[test]
    fn reader_sees_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut w = match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::Writable(w) => w,
            _ => unreachable!(),
        };
        w.append(EntryType::CooldownEntered, serde_json::json!({}), 1).unwrap();
        w.append(EntryType::TuningIrRolledBack, serde_json::json!({"r": "x"}), 2)
            .unwrap();

        let reader = LedgerReader::new(&path);
        assert_eq!(reader.iter(0).unwrap().len(), 2);
        assert_eq!(reader.read(1).unwrap().unwrap().idx, 1);
        assert_eq!(reader.entries_of_type("tuning_ir_rolled_back").unwrap().len(), 1);
    }
}
