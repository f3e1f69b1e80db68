use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use uuid::Uuid;

use crate::errors::TranslationError;

/// Reclaim attempts before giving up on a lock that keeps reappearing
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;

/// A lock file without a readable record is assumed to be mid-write for this long
const UNREADABLE_GRACE: Duration = Duration::from_secs(5);

/// Owner record stored in the lock file, one line:
/// `pid=<pid> token=<uuid> acquired=<rfc3339>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub token: Uuid,
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    fn for_current_process() -> Self {
        Self {
            pid: std::process::id(),
            token: Uuid::new_v4(),
            acquired_at: Utc::now(),
        }
    }

    pub fn to_line(&self) -> String {
        format!("pid={} token={} acquired={}\n", self.pid, self.token, self.acquired_at.to_rfc3339())
    }

    pub fn parse(line: &str) -> Option<Self> {
        let (mut pid, mut token, mut acquired_at) = (None, None, None);
        for field in line.split_whitespace() {
            match field.split_once('=')? {
                ("pid", value) => pid = value.parse().ok(),
                ("token", value) => token = Uuid::parse_str(value).ok(),
                ("acquired", value) => {
                    acquired_at = DateTime::parse_from_rfc3339(value).ok().map(|t| t.with_timezone(&Utc))
                }
                _ => {}
            }
        }
        Some(Self {
            pid: pid?,
            token: token?,
            acquired_at: acquired_at?,
        })
    }

    fn age(&self) -> Duration {
        (Utc::now() - self.acquired_at).to_std().unwrap_or_default()
    }
}

/// What was found in an existing lock file
enum Existing {
    Live(LockRecord),
    Stale(LockRecord),
    /// Unreadable but young, probably still being written
    Settling,
    /// Unreadable and old
    Garbage,
    /// Vanished between the failed create and the read
    Gone,
}

/// Cross-process exclusion for one working scope
#[derive(Debug, Clone)]
pub struct RunLock {
    path: PathBuf,
    stale_after: Option<Duration>,
}

impl RunLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stale_after: None,
        }
    }

    /// Also treat locks older than `age` as abandoned
    pub fn with_stale_after(mut self, age: Option<Duration>) -> Self {
        self.stale_after = age;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock or fail with `AlreadyRunning`
    ///
    /// The file is created with `create_new`, so two racing processes can
    /// never both succeed. Locks whose owner is gone are removed and the
    /// create is retried a bounded number of times.
    pub fn acquire(&self) -> Result<LockGuard, TranslationError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| TranslationError::io(parent, e))?;
            }
        }

        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            let record = LockRecord::for_current_process();
            match self.try_create(&record) {
                Ok(()) => {
                    debug!("Acquired run lock {:?} (token {})", self.path, record.token);
                    return Ok(LockGuard {
                        path: self.path.clone(),
                        token: record.token,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(TranslationError::io(&self.path, e)),
            }

            match self.inspect()? {
                Existing::Live(owner) => return Err(self.already_running(owner.pid, owner.acquired_at.to_rfc3339())),
                Existing::Settling => return Err(self.already_running(0, "unknown".to_string())),
                Existing::Gone => continue,
                Existing::Stale(owner) => {
                    warn!(
                        "Reclaiming stale lock {:?} left by pid {} at {} (attempt {})",
                        self.path, owner.pid, owner.acquired_at, attempt
                    );
                    self.remove_if_token(owner.token)?;
                }
                Existing::Garbage => {
                    warn!("Removing unreadable lock file {:?}", self.path);
                    remove_if_exists(&self.path).map_err(|e| TranslationError::io(&self.path, e))?;
                }
            }
        }

        Err(self.already_running(0, "unknown".to_string()))
    }

    fn try_create(&self, record: &LockRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&self.path)?;
        let written = file.write_all(record.to_line().as_bytes()).and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&self.path);
            return Err(e);
        }
        Ok(())
    }

    fn inspect(&self) -> Result<Existing, TranslationError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Existing::Gone),
            Err(e) => return Err(TranslationError::io(&self.path, e)),
        };

        let Some(record) = LockRecord::parse(content.trim()) else {
            let modified_age = fs::metadata(&self.path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|t| SystemTime::now().duration_since(t).ok())
                .unwrap_or_default();
            return Ok(if modified_age < UNREADABLE_GRACE {
                Existing::Settling
            } else {
                Existing::Garbage
            });
        };

        let too_old = self.stale_after.is_some_and(|limit| record.age() >= limit);
        if too_old || !is_pid_alive(record.pid) {
            Ok(Existing::Stale(record))
        } else {
            Ok(Existing::Live(record))
        }
    }

    /// Remove the lock only while it still carries `token`
    fn remove_if_token(&self, token: Uuid) -> Result<(), TranslationError> {
        let current = match fs::read_to_string(&self.path) {
            Ok(content) => LockRecord::parse(content.trim()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(TranslationError::io(&self.path, e)),
        };
        if current.is_some_and(|record| record.token == token) {
            remove_if_exists(&self.path).map_err(|e| TranslationError::io(&self.path, e))?;
        }
        Ok(())
    }

    fn already_running(&self, owner_pid: u32, since: String) -> TranslationError {
        TranslationError::AlreadyRunning {
            lock_path: self.path.clone(),
            owner_pid,
            since,
        }
    }
}

/// Held lock; the file is deleted when the guard is dropped
///
/// Removal checks the token first, so a guard never deletes a lock that
/// another run has since taken over.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    token: Uuid,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Release now and report failures instead of logging them
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        self.remove_own_file()
    }

    fn remove_own_file(&self) -> io::Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        match LockRecord::parse(content.trim()) {
            Some(record) if record.token == self.token => remove_if_exists(&self.path),
            _ => {
                warn!("Lock {:?} is no longer ours, leaving it in place", self.path);
                Ok(())
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self.remove_own_file() {
            Ok(()) => debug!("Released run lock {:?}", self.path),
            Err(e) => warn!("Failed to release run lock {:?}: {}", self.path, e),
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(target_os = "linux")]
fn is_pid_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

// Without /proc the owner cannot be checked; only the age limit reclaims
#[cfg(not(target_os = "linux"))]
fn is_pid_alive(_pid: u32) -> bool {
    true
}
