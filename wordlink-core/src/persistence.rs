//! Persistence backends for saved progress.
//!
//! The engine hands a backend the full encoded [`ProgressDocument`] after
//! every mutating command and reads it back once at startup. Backends treat
//! the bytes as opaque; schema handling lives in the document module.
//!
//! - [`SqliteBackend`]: one row per profile in a WAL-mode database, with a
//!   CRC-32 of the payload and online backups.
//! - [`JsonFileBackend`]: a single file replaced atomically via a temp file.
//! - [`MemoryBackend`]: a shared buffer, for tests and throwaway sessions.
//!
//! [`ProgressDocument`]: crate::progress::ProgressDocument

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{BackendKind, PersistenceConfig};
use crate::error::{Result, WordlinkError};

/// Durable storage for one encoded progress document.
pub trait ProgressBackend: Send {
    /// Read the stored bytes, or `None` if nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or fails its integrity check.
    fn read(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes could not be written.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Remove the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage could not be cleared.
    fn clear(&mut self) -> Result<()>;

    /// Take a rotating backup, if the backend supports it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup could not be written.
    fn backup(&self) -> Result<()> {
        Ok(())
    }
}

/// Open the backend selected by `config`.
///
/// # Errors
///
/// Returns [`WordlinkError::Database`] if the `SQLite` database cannot be opened.
pub fn open_backend(config: &PersistenceConfig) -> Result<Box<dyn ProgressBackend>> {
    Ok(match config.backend {
        BackendKind::Sqlite => Box::new(SqliteBackend::open(&config.path, config)?),
        BackendKind::Json => Box::new(JsonFileBackend::new(&config.path, config.backup_count)),
        BackendKind::Memory => Box::new(MemoryBackend::new()),
    })
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// Backup rotation
// ---------------------------------------------------------------------------

/// Path to a numbered backup file (e.g. `progress.db.bak.1`).
fn backup_path(base: &Path, n: u32) -> PathBuf {
    let mut p = base.to_path_buf();
    let ext = format!(
        "{}.bak.{n}",
        p.extension()
            .map_or(String::new(), |e| e.to_string_lossy().into_owned())
    );
    p.set_extension(ext);
    p
}

/// Shift `base.bak.1..max` up by one, drop the oldest, then write a fresh `.bak.1`.
fn rotate_backups(base: &Path, max: u32, write_first: impl FnOnce(&Path) -> Result<()>) -> Result<()> {
    if max == 0 {
        return Ok(());
    }
    for i in (1..max).rev() {
        let src = backup_path(base, i);
        if src.exists() {
            std::fs::rename(&src, backup_path(base, i + 1))?;
        }
    }
    let oldest = backup_path(base, max + 1);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    write_first(&backup_path(base, 1))?;
    info!(base = %base.display(), max_backups = max, "Rotating backup created");
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteBackend
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS progress (
    profile    TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// Progress stored in an `SQLite` database, one row per profile.
pub struct SqliteBackend {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("db_path", &self.db_path)
            .field("profile", &self.config.profile)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            profile = %config.profile,
            wal = config.wal_mode,
            "Progress database opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Database`] on `SQLite` failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Copy the whole database to `dest_path` with `SQLite`'s online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Database`] on `SQLite` failures.
    pub fn backup_to<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Database backup completed"
        );
        Ok(())
    }

    /// Run `PRAGMA integrity_check`.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Profiles with saved progress.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Database`] on `SQLite` failures.
    pub fn profiles(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT profile FROM progress ORDER BY profile")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Path of the database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl ProgressBackend for SqliteBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM progress WHERE profile = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = match stmt
            .query_row(params![self.config.profile], |row| Ok((row.get(0)?, row.get(1)?)))
        {
            Ok(row) => Some(row),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let Some((data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        profile = %self.config.profile,
                        expected = %expected,
                        actual = %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                    return Err(WordlinkError::Corrupt(format!(
                        "checksum {actual} does not match stored {expected}"
                    )));
                }
            }
        }

        Ok(Some(data))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(bytes));
        self.conn.execute(
            "INSERT INTO progress (profile, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(profile) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![self.config.profile, bytes, Utc::now().to_rfc3339(), checksum],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM progress WHERE profile = ?1",
            params![self.config.profile],
        )?;
        Ok(())
    }

    fn backup(&self) -> Result<()> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(());
        }
        rotate_backups(&self.db_path, self.config.backup_count, |dest| self.backup_to(dest))
    }
}

// ---------------------------------------------------------------------------
// JsonFileBackend
// ---------------------------------------------------------------------------

/// Progress stored as a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
    backup_count: u32,
}

impl JsonFileBackend {
    /// Back progress with the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, backup_count: u32) -> Self {
        Self {
            path: path.into(),
            backup_count,
        }
    }

    /// The file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressBackend for JsonFileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Progress file written");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backup(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        rotate_backups(&self.path, self.backup_count, |dest| {
            std::fs::copy(&self.path, dest)?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryInner {
    data: Option<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

/// In-process storage. Clones share the same buffer, so a test can keep a
/// handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend pre-loaded with `bytes`.
    #[must_use]
    pub fn with_data(bytes: impl Into<Vec<u8>>) -> Self {
        let backend = Self::new();
        backend.inner.lock().data = Some(bytes.into());
        backend
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Current stored bytes.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.inner.lock().data.clone()
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }
}

impl ProgressBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.lock().data.clone())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            return Err(WordlinkError::Io(std::io::Error::other("storage unavailable")));
        }
        inner.data = Some(bytes.to_vec());
        inner.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.inner.lock().data = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PersistenceConfig {
        PersistenceConfig {
            checksum_enabled: true,
            ..PersistenceConfig::default()
        }
    }

    #[test]
    fn sqlite_round_trip_and_upsert() {
        let mut backend = SqliteBackend::open_in_memory(&test_config()).expect("open");
        assert!(backend.read().expect("read").is_none());

        backend.write(b"first").expect("write");
        backend.write(b"second").expect("overwrite");
        assert_eq!(backend.read().expect("read").as_deref(), Some(&b"second"[..]));
        assert_eq!(backend.profiles().expect("profiles"), vec!["default".to_string()]);

        backend.clear().expect("clear");
        assert!(backend.read().expect("read").is_none());
    }

    #[test]
    fn sqlite_profiles_are_isolated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("progress.db");
        let alice = PersistenceConfig {
            profile: "alice".into(),
            ..test_config()
        };
        let bob = PersistenceConfig {
            profile: "bob".into(),
            ..test_config()
        };

        let mut a = SqliteBackend::open(&path, &alice).expect("open a");
        a.write(b"alice-data").expect("write a");
        let b = SqliteBackend::open(&path, &bob).expect("open b");
        assert!(b.read().expect("read b").is_none());
        assert_eq!(b.profiles().expect("profiles"), vec!["alice".to_string()]);
    }

    #[test]
    fn checksum_mismatch_is_reported_as_corrupt() {
        let mut backend = SqliteBackend::open_in_memory(&test_config()).expect("open");
        backend.write(b"{}").expect("write");
        backend
            .conn
            .execute("UPDATE progress SET checksum = 'deadbeef'", [])
            .expect("corrupt checksum");

        assert!(matches!(backend.read(), Err(WordlinkError::Corrupt(_))));
    }

    #[test]
    fn checksum_ignored_when_disabled() {
        let config = PersistenceConfig {
            checksum_enabled: false,
            ..PersistenceConfig::default()
        };
        let mut backend = SqliteBackend::open_in_memory(&config).expect("open");
        backend.write(b"{}").expect("write");
        backend
            .conn
            .execute("UPDATE progress SET checksum = 'deadbeef'", [])
            .expect("corrupt checksum");
        assert!(backend.read().expect("read").is_some());
    }

    #[test]
    fn sqlite_rotating_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("world.db");
        let config = PersistenceConfig {
            backup_count: 2,
            ..test_config()
        };
        let mut backend = SqliteBackend::open(&db_path, &config).expect("open");
        backend.write(b"{}").expect("write");
        assert!(backend.integrity_check().expect("check"));

        backend.backup().expect("backup 1");
        backend.backup().expect("backup 2");
        backend.backup().expect("backup 3");

        assert!(dir.path().join("world.db.bak.1").exists());
        assert!(dir.path().join("world.db.bak.2").exists());
        assert!(!dir.path().join("world.db.bak.3").exists());

        let restored = SqliteBackend::open(dir.path().join("world.db.bak.1"), &config).expect("open backup");
        assert_eq!(restored.read().expect("read").as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn json_file_atomic_write_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("saves").join("progress.json");
        let mut backend = JsonFileBackend::new(&path, 2);

        assert!(backend.read().expect("read").is_none());
        backend.write(b"{\"a\":1}").expect("write");
        backend.write(b"{\"a\":2}").expect("write");
        assert_eq!(backend.read().expect("read").as_deref(), Some(&b"{\"a\":2}"[..]));

        backend.backup().expect("backup");
        assert!(dir.path().join("saves").join("progress.json.bak.1").exists());

        backend.clear().expect("clear");
        backend.clear().expect("clear twice");
        assert!(backend.read().expect("read").is_none());
    }

    #[test]
    fn memory_backend_shares_buffer_and_can_fail() {
        let handle = MemoryBackend::new();
        let mut owned = handle.clone();
        owned.write(b"x").expect("write");
        assert_eq!(handle.data().as_deref(), Some(&b"x"[..]));
        assert_eq!(handle.writes(), 1);

        handle.set_fail_writes(true);
        assert!(owned.write(b"y").is_err());
        assert_eq!(handle.data().as_deref(), Some(&b"x"[..]));
    }

    #[test]
    fn open_backend_follows_config() {
        let config = PersistenceConfig {
            backend: BackendKind::Memory,
            ..PersistenceConfig::default()
        };
        let backend = open_backend(&config).expect("open");
        assert!(backend.read().expect("read").is_none());
    }

    #[test]
    fn crc32_basic() {
        // Known test vector: CRC-32 of "123456789" = 0xCBF43926
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
