//! Atomic file persistence: temp file in the same directory, fsync, rename,
//! with a cross-device fallback. Shared by `gov_ledger` (tail-hash sibling
//! file), `gov_stats` (stabilization/effects stores), and `gov_topology`
//! (manifest relock) so there is exactly one atomic-write implementation in
//! the workspace, not three copies.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::canon::canonical_bytes;
use crate::error::IoError;

/// Serialize `value` to canonical JSON bytes and write it to `path`
/// atomically: create-unique-temp + write + fsync(temp) + rename, with
/// fsync(dir) on Unix to persist the rename, and a direct-write fallback
/// if rename fails (e.g. cross-device).
pub fn write_canonical_file<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    let bytes = canonical_bytes(value)?;
    write_bytes_atomically(path, &bytes)
}

/// Same atomic-write discipline, for callers that already hold canonical
/// bytes (e.g. the ledger appending a pre-serialized entry).
pub fn write_bytes_atomically(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let parent = path
        .parent()
        .ok_or_else(|| IoError::NoParent(path.display().to_string()))?;
    fs::create_dir_all(parent).map_err(IoError::Write)?;

    let tmp = make_unique_tmp_path(path);
    let mut tf = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)
        .map_err(IoError::Write)?;

    tf.write_all(bytes).map_err(IoError::Write)?;
    tf.sync_all().map_err(IoError::Write)?;
    drop(tf);

    match fs::rename(&tmp, path) {
        Ok(()) => {
            let _ = fsync_dir(parent);
            Ok(())
        }
        Err(_) => {
            let res: io::Result<()> = (|| {
                let mut f = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)?;
                f.write_all(bytes)?;
                f.sync_all()
            })();

            if let Err(err) = res {
                let _ = fs::remove_file(&tmp);
                return Err(IoError::Write(err));
            }
            let _ = fs::remove_file(&tmp);
            let _ = fsync_dir(parent);
            Ok(())
        }
    }
}

/// Append `bytes` (already newline-terminated by the caller if wanted) to
/// `path`, fsyncing before returning. Used by the ledger's JSONL append
/// path, which is append-only and must not go through the rename dance
/// (the whole point of JSONL is it never gets rewritten wholesale).
pub fn append_bytes_fsync(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Write)?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(IoError::Write)?;
    f.write_all(bytes).map_err(IoError::Write)?;
    f.sync_all().map_err(IoError::Write)
}

fn make_unique_tmp_path(target: &Path) -> PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let fname = target.file_name().and_then(|s| s.to_str()).unwrap_or("file");
    let tmp_name = format!("{fname}.{pid}.{n}.tmp");

    match target.parent() {
        Some(dir) => dir.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let df = OpenOptions::new().read(true).open(dir)?;
    df.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
