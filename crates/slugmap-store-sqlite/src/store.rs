// crates/slugmap-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Mapping Store
// Description: Durable MappingStore backed by SQLite.
// Purpose: Persist mapping records with a schema-level natural key constraint.
// Dependencies: slugmap-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`MappingStore`] using `SQLite`. The
//! `mappings` table carries `PRIMARY KEY (identifier)` and
//! `UNIQUE (slug, kind)`, so a creator that loses a race hits a constraint
//! violation and re-reads the winner's row instead of writing a duplicate.
//! Database contents are untrusted: rows are validated on the way out and
//! invalid rows fail as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use slugmap_core::Kind;
use slugmap_core::MappingId;
use slugmap_core::MappingRecord;
use slugmap_core::MappingStore;
use slugmap_core::Slug;
use slugmap_core::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read connections.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Upper bound on read connections.
const MAX_READ_POOL_SIZE: usize = 64;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum records returned by a single [`SqliteMappingStore::list`] call.
pub const MAX_LIST_LIMIT: usize = 1_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` mapping store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `read_pool_size` is between 1 and 64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of read-only connections used for read path isolation.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Validates runtime limits in the store configuration.
fn validate_runtime_limits(config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    if config.read_pool_size == 0 || config.read_pool_size > MAX_READ_POOL_SIZE {
        return Err(SqliteStoreError::Invalid(format!(
            "read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw slug payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed validation.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Identifier already held by a different `(slug, kind)` pair.
    #[error("sqlite store identifier collision: {0}")]
    IdentifierCollision(MappingId),
    /// The store has been closed.
    #[error("sqlite store closed")]
    Closed,
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::IdentifierCollision(identifier) => {
                Self::IdentifierCollision(identifier)
            }
            SqliteStoreError::Closed => Self::Closed,
        }
    }
}

/// Maps a `rusqlite` error to a store error.
fn db_error(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true for `SQLite` constraint violations.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Mapping record plus its persistence timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMapping {
    /// Stored record.
    #[serde(flatten)]
    pub record: MappingRecord,
    /// Unix epoch milliseconds when the record was created.
    pub created_at_ms: i64,
}

/// Connection slot emptied on close.
type ConnectionSlot = Mutex<Option<Connection>>;

/// `SQLite`-backed mapping store with WAL support.
///
/// # Invariants
/// - Writes are serialized through one mutex-guarded connection.
/// - Reads rotate across a fixed pool of connections.
/// - After [`MappingStore::close`] every operation fails with
///   [`StoreError::Closed`].
#[derive(Clone)]
pub struct SqliteMappingStore {
    /// Shared writer connection guarded by a mutex.
    write_connection: Arc<ConnectionSlot>,
    /// Read connection pool used for read path isolation under WAL.
    read_connections: Arc<Vec<ConnectionSlot>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
}

impl SqliteMappingStore {
    /// Opens an `SQLite`-backed mapping store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        validate_runtime_limits(&config)?;
        ensure_parent_dir(&config.path)?;
        let mut write_connection = open_connection(&config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            read_connections.push(Mutex::new(Some(open_connection(&config)?)));
        }
        Ok(Self {
            write_connection: Arc::new(Mutex::new(Some(write_connection))),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Lists stored records ordered by creation time, then identifier.
    ///
    /// `after` is the identifier of the last record of the previous page.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when `limit` is out of range or
    /// `after` is unknown, and other variants when the query fails.
    pub fn list(
        &self,
        limit: usize,
        after: Option<&MappingId>,
    ) -> Result<Vec<StoredMapping>, SqliteStoreError> {
        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(SqliteStoreError::Invalid(format!(
                "list limit must be between 1 and {MAX_LIST_LIMIT}"
            )));
        }
        let limit = i64::try_from(limit)
            .map_err(|_| SqliteStoreError::Invalid("list limit too large".to_string()))?;
        self.with_read_connection(|connection| {
            let cursor = match after {
                Some(identifier) => {
                    let created_at: Option<i64> = connection
                        .query_row(
                            "SELECT created_at FROM mappings WHERE identifier = ?1",
                            params![identifier.to_string()],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(|err| db_error(&err))?;
                    let created_at = created_at.ok_or_else(|| {
                        SqliteStoreError::Invalid("unknown list cursor".to_string())
                    })?;
                    Some((created_at, identifier.to_string()))
                }
                None => None,
            };
            let (cursor_created_at, cursor_identifier) =
                cursor.unwrap_or((i64::MIN, String::new()));
            let mut statement = connection
                .prepare(
                    "SELECT identifier, slug, kind, created_at FROM mappings
                     WHERE created_at > ?1 OR (created_at = ?1 AND identifier > ?2)
                     ORDER BY created_at, identifier
                     LIMIT ?3",
                )
                .map_err(|err| db_error(&err))?;
            let rows = statement
                .query_map(params![cursor_created_at, cursor_identifier, limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|err| db_error(&err))?;
            let mut records = Vec::new();
            for row in rows {
                let (identifier, slug, kind, created_at_ms) = row.map_err(|err| db_error(&err))?;
                records.push(StoredMapping {
                    record: record_from_columns(&identifier, slug, kind)?,
                    created_at_ms,
                });
            }
            Ok(records)
        })
    }

    /// Returns the next read connection slot.
    fn read_connection(&self) -> &ConnectionSlot {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }

    /// Runs `op` on a pooled read connection.
    fn with_read_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        with_connection(self.read_connection(), op)
    }

    /// Runs `op` on the writer connection.
    fn with_write_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        with_connection(&self.write_connection, op)
    }

    /// Inserts the record or fetches the row already holding its natural key.
    fn insert_or_fetch_record(
        &self,
        record: MappingRecord,
    ) -> Result<MappingRecord, SqliteStoreError> {
        self.with_write_connection(|connection| {
            let tx = connection
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|err| db_error(&err))?;
            let inserted = tx.execute(
                "INSERT INTO mappings (identifier, slug, kind, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.identifier.to_string(),
                    record.slug.as_str(),
                    record.kind.as_str(),
                    unix_millis()
                ],
            );
            let stored = match inserted {
                Ok(_) => record,
                Err(err) if is_constraint_violation(&err) => {
                    query_by_natural_key(&tx, &record.slug, &record.kind)?
                        .ok_or(SqliteStoreError::IdentifierCollision(record.identifier))?
                }
                Err(err) => return Err(db_error(&err)),
            };
            tx.commit().map_err(|err| db_error(&err))?;
            Ok(stored)
        })
    }

    /// Verifies both connection paths can execute a simple statement.
    fn check_connection(&self) -> Result<(), SqliteStoreError> {
        self.with_read_connection(|connection| select_one(connection))?;
        self.with_write_connection(|connection| select_one(connection))
    }

    /// Closes every connection; later operations fail with `Closed`.
    fn close_connections(&self) -> Result<(), SqliteStoreError> {
        close_slot(&self.write_connection)?;
        for slot in self.read_connections.iter() {
            close_slot(slot)?;
        }
        Ok(())
    }
}

impl MappingStore for SqliteMappingStore {
    fn find_by_natural_key(
        &self,
        slug: &Slug,
        kind: &Kind,
    ) -> Result<Option<MappingRecord>, StoreError> {
        self.with_read_connection(|connection| query_by_natural_key(connection, slug, kind))
            .map_err(StoreError::from)
    }

    fn find_by_id(&self, identifier: &MappingId) -> Result<Option<MappingRecord>, StoreError> {
        self.with_read_connection(|connection| query_by_id(connection, identifier))
            .map_err(StoreError::from)
    }

    fn insert_or_fetch(&self, record: MappingRecord) -> Result<MappingRecord, StoreError> {
        self.insert_or_fetch_record(record).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.check_connection().map_err(StoreError::from)
    }

    fn close(&self) -> Result<(), StoreError> {
        self.close_connections().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Locks a connection slot and runs `op`, failing when the slot is closed.
fn with_connection<T>(
    slot: &ConnectionSlot,
    op: impl FnOnce(&mut Connection) -> Result<T, SqliteStoreError>,
) -> Result<T, SqliteStoreError> {
    let mut guard = slot
        .lock()
        .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
    let connection = guard.as_mut().ok_or(SqliteStoreError::Closed)?;
    op(connection)
}

/// Takes and closes the connection held by `slot`, if any.
fn close_slot(slot: &ConnectionSlot) -> Result<(), SqliteStoreError> {
    let connection = slot
        .lock()
        .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?
        .take();
    match connection {
        Some(connection) => connection.close().map_err(|(_, err)| db_error(&err)),
        None => Ok(()),
    }
}

/// Executes `SELECT 1`.
fn select_one(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(|err| db_error(&err))
}

/// Fetches the record holding `(slug, kind)`.
fn query_by_natural_key(
    connection: &Connection,
    slug: &Slug,
    kind: &Kind,
) -> Result<Option<MappingRecord>, SqliteStoreError> {
    let row: Option<(String, String, String)> = connection
        .query_row(
            "SELECT identifier, slug, kind FROM mappings WHERE slug = ?1 AND kind = ?2",
            params![slug.as_str(), kind.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    row.map(|(identifier, slug, kind)| record_from_columns(&identifier, slug, kind)).transpose()
}

/// Fetches the record holding `identifier`.
fn query_by_id(
    connection: &Connection,
    identifier: &MappingId,
) -> Result<Option<MappingRecord>, SqliteStoreError> {
    let row: Option<(String, String, String)> = connection
        .query_row(
            "SELECT identifier, slug, kind FROM mappings WHERE identifier = ?1",
            params![identifier.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|err| db_error(&err))?;
    row.map(|(identifier, slug, kind)| record_from_columns(&identifier, slug, kind)).transpose()
}

/// Validates stored columns and builds a record.
fn record_from_columns(
    identifier: &str,
    slug: String,
    kind: String,
) -> Result<MappingRecord, SqliteStoreError> {
    let Some(identifier) = MappingId::parse_canonical(identifier) else {
        return Err(SqliteStoreError::Corrupt("stored identifier is not canonical".to_string()));
    };
    if slug.is_empty() {
        return Err(SqliteStoreError::Corrupt(format!("empty slug stored for {identifier}")));
    }
    if kind.is_empty() {
        return Err(SqliteStoreError::Corrupt(format!("empty kind stored for {identifier}")));
    }
    Ok(MappingRecord::new(identifier, Slug::new(slug), Kind::new(kind)))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS mappings (
                    identifier TEXT NOT NULL PRIMARY KEY,
                    slug TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    UNIQUE (slug, kind)
                );
                CREATE INDEX IF NOT EXISTS idx_mappings_created
                    ON mappings (created_at, identifier);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
