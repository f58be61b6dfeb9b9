//! # Gradebook File Store
//!
//! Persists every student's records in a single JSON gradebook file:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the gradebook
//! - **File locking**: an OS lock plus a `.lock` file naming the holder
//! - **Version validation**: refuse gradebooks written by a newer schema
//!
//! Snapshots are read from disk. [`AnswerStore::update`] takes the lock,
//! reloads the gradebook, hands the student's records to the caller and saves
//! the resulting batch before releasing the lock, so a second process sees
//! either none or all of a submission. The in-memory copy is only replaced
//! after the save succeeded.
//!
//! ## Example
//!
//! ```rust,no_run
//! use grader_core::store::{AnswerStore, FileAnswerStore};
//! use grader_core::roster::StudentId;
//! use std::path::Path;
//!
//! let store = FileAnswerStore::open(Path::new("gradebook.json"), "grader@school.edu")?;
//! let gate = store.get_gate_state(StudentId(7))?;
//! println!("{:?}", gate.max_unlocked_block);
//! # Ok::<(), grader_core::errors::GradeError>(())
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{GradeError, GradeResult};
use crate::roster::StudentId;
use crate::store::{AnswerStore, StudentRecords, WriteBatch};

/// Current schema version for gradebook files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Gradebook header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradebookMeta {
    /// Schema version (semver)
    pub version: String,
    /// Course or cohort the gradebook belongs to
    #[serde(default)]
    pub title: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Root gradebook container, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradebook {
    pub meta: GradebookMeta,
    #[serde(default)]
    pub students: BTreeMap<StudentId, StudentRecords>,
}

impl Gradebook {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Gradebook {
            meta: GradebookMeta {
                version: SCHEMA_VERSION.to_string(),
                title: title.into(),
                created: now,
                modified: now,
            },
            students: BTreeMap::new(),
        }
    }

    /// Update the modified timestamp
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }
}

/// Lock file metadata stored next to the gradebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Who holds the lock (operator name or service id)
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME").ok().or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a gradebook, released on drop.
///
/// Holds an OS-level lock (fs2) and writes a `.lock` file with the holder's
/// details so other operators can see who is grading.
pub struct FileLock {
    gradebook_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock without blocking.
    ///
    /// Fails with `FileLocked` when a live process already holds it. Locks
    /// left behind by dead processes, or older than a day, are taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> GradeResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    return Err(GradeError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                debug!(holder = %existing.user_id, pid = existing.pid, "taking over stale gradebook lock");
            }
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| GradeError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            GradeError::file_locked(
                path.display().to_string(),
                "another process".to_string(),
                "unknown".to_string(),
            )
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(GradeError::serialization)?;
        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| GradeError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;
        lock_file
            .sync_all()
            .map_err(|e| GradeError::file_error("sync lock", lock_path.display().to_string(), e.to_string()))?;

        Ok(FileLock {
            gradebook_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current holder, if the gradebook is locked by a live process
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    pub fn gradebook_path(&self) -> &Path {
        &self.gradebook_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(gradebook_path: &Path) -> PathBuf {
    with_suffix(gradebook_path, "lock")
}

fn tmp_path_for(gradebook_path: &Path) -> PathBuf {
    with_suffix(gradebook_path, "tmp")
}

/// `book.json` -> `book.json.<suffix>`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = out
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    out.set_extension(extension);
    out
}

fn read_lock_info(lock_path: &Path) -> GradeResult<LockInfo> {
    let mut file = File::open(lock_path)
        .map_err(|e| GradeError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| GradeError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&contents).map_err(GradeError::serialization)
}

/// A lock is stale when its process is gone (same machine) or it is older than 24 hours
fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    let age = Utc::now() - info.locked_at;
    age.num_hours() > 24
}

/// Save a gradebook atomically (temp file, fsync, rename).
pub fn save_gradebook(book: &Gradebook, path: &Path) -> GradeResult<()> {
    let json = serde_json::to_string_pretty(book).map_err(GradeError::serialization)?;
    let tmp_path = tmp_path_for(path);

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| GradeError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| GradeError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .sync_all()
        .map_err(|e| GradeError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        GradeError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a gradebook and check its schema version.
pub fn load_gradebook(path: &Path) -> GradeResult<Gradebook> {
    let mut file =
        File::open(path).map_err(|e| GradeError::file_error("open", path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| GradeError::file_error("read", path.display().to_string(), e.to_string()))?;

    let book: Gradebook = serde_json::from_str(&contents)
        .map_err(|e| GradeError::serialization(format!("Invalid JSON in {}: {}", path.display(), e)))?;

    validate_version(&book.meta.version)?;
    Ok(book)
}

/// Major must match; on 0.x a newer minor is rejected too.
fn validate_version(file_version: &str) -> GradeResult<()> {
    let mismatch = || GradeError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }
    Ok(())
}

/// Answer store backed by a gradebook file.
pub struct FileAnswerStore {
    path: PathBuf,
    user_id: String,
    book: RwLock<Gradebook>,
}

impl FileAnswerStore {
    /// Open an existing gradebook, or start an empty one that is written on
    /// the first commit.
    pub fn open(path: &Path, user_id: impl Into<String>) -> GradeResult<Self> {
        let book = if path.exists() {
            load_gradebook(path)?
        } else {
            Gradebook::new(String::new())
        };
        Ok(FileAnswerStore {
            path: path.to_path_buf(),
            user_id: user_id.into(),
            book: RwLock::new(book),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the cached gradebook
    pub fn gradebook(&self) -> GradeResult<Gradebook> {
        Ok(self.book.read().map_err(poisoned)?.clone())
    }

    /// Latest gradebook on disk, or the cache before the first save.
    fn reload(&self, cached: &Gradebook) -> GradeResult<Gradebook> {
        if self.path.exists() {
            load_gradebook(&self.path)
        } else {
            Ok(cached.clone())
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> GradeError {
    GradeError::Internal {
        message: "gradebook cache lock poisoned".to_string(),
    }
}

impl AnswerStore for FileAnswerStore {
    fn snapshot(&self, student: StudentId) -> GradeResult<StudentRecords> {
        let mut cached = self.book.write().map_err(poisoned)?;
        *cached = self.reload(&cached)?;
        Ok(cached.students.get(&student).cloned().unwrap_or_default())
    }

    fn apply(&self, student: StudentId, batch: WriteBatch) -> GradeResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.update(student, |_| Ok((batch, ())))
    }

    fn update<T, F>(&self, student: StudentId, f: F) -> GradeResult<T>
    where
        F: FnOnce(&StudentRecords) -> GradeResult<(WriteBatch, T)>,
    {
        let mut cached = self.book.write().map_err(poisoned)?;
        let _lock = FileLock::acquire(&self.path, self.user_id.clone())?;

        let mut next = self.reload(&cached)?;
        let current = next.students.get(&student).cloned().unwrap_or_default();
        let (batch, out) = f(&current)?;
        if !batch.is_empty() {
            next.students.entry(student).or_default().apply(batch);
            next.touch();
            save_gradebook(&next, &self.path)?;
            debug!(student = %student, path = %self.path.display(), "gradebook saved");
        }

        *cached = next;
        Ok(out)
    }
}
