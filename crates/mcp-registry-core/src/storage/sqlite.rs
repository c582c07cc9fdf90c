//! SQLite-backed persistent storage.
//!
//! Each entry is one row keyed by `id`, with a unique index on
//! `(name, version)` and a secondary index on `name`. The full detail is kept
//! as a JSON document next to the indexed columns; `is_latest` lives in both
//! and publish keeps them in sync.
//!
//! Publish runs its check, insert and demotion inside one `IMMEDIATE`
//! transaction, which serializes publishers even across processes sharing the
//! file. The unique index remains the last line: a losing insert surfaces as
//! `AlreadyExists`.

use super::filter::{normalize_limit, validate_cursor, FilterField, ListFilter, ListPage};
use super::publish::{check_version, latest_entry, stamp_new_entry, validate_publish};
use super::seed::{load_seed_file, parse_seed_record, SeedReport};
use super::traits::{ConnectionInfo, StorageBackend};
use crate::config::{BackendKind, SqliteConfig};
use crate::error::{RegistryError, Result};
use crate::models::{Server, ServerDetail};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// SQLite storage backend.
///
/// Thread-safe via an internal mutex on the connection; queries run on the
/// blocking thread pool.
pub struct SqliteBackend {
    inner: Arc<Inner>,
}

struct Inner {
    /// `None` once the backend is closed.
    conn: Mutex<Option<Connection>>,
    connected: AtomicBool,
    table: String,
    location: String,
}

impl Inner {
    fn lock_conn(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| RegistryError::Database {
            message: "Failed to acquire database connection lock".to_string(),
            source: None,
        })
    }
}

impl SqliteBackend {
    /// Open (or create) the registry at `database_url`.
    ///
    /// `database_url` is a file path, optionally prefixed with `sqlite://`;
    /// `:memory:` opens a private in-memory database. `table` must be a plain
    /// identifier.
    pub fn open(database_url: &str, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        let location = database_url
            .strip_prefix(SqliteConfig::URL_SCHEME)
            .unwrap_or(database_url);

        let conn = if location == SqliteConfig::IN_MEMORY_URL {
            Connection::open_in_memory()?
        } else {
            let path = Path::new(location);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| RegistryError::Io {
                        message: format!("Failed to create database directory: {}", e),
                        path: Some(parent.to_path_buf()),
                        source: Some(e),
                    })?;
                }
            }
            Connection::open(path)?
        };

        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn, table)?;

        info!("Opened SQLite registry at {} (table {})", location, table);

        Ok(Self {
            inner: Arc::new(Inner {
                conn: Mutex::new(Some(conn)),
                connected: AtomicBool::new(true),
                table: table.to_string(),
                location: location.to_string(),
            }),
        })
    }

    /// Open a private in-memory database with the default table.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(SqliteConfig::IN_MEMORY_URL, SqliteConfig::DEFAULT_TABLE)
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;\n\
             PRAGMA temp_store=MEMORY;",
            SqliteConfig::BUSY_TIMEOUT_MS,
        ))?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection, table: &str) -> Result<()> {
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                repository_url TEXT NOT NULL,
                is_latest INTEGER NOT NULL DEFAULT 0,
                release_date TEXT NOT NULL,
                document TEXT NOT NULL
            );

            -- One row per (name, version)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_name_version
                ON {table}(name, version);

            -- Publish looks up every version of a name
            CREATE INDEX IF NOT EXISTS idx_{table}_name
                ON {table}(name);

            -- Listing walks latest entries in id order
            CREATE INDEX IF NOT EXISTS idx_{table}_latest_id
                ON {table}(is_latest, id);
            "#,
        ))?;
        Ok(())
    }

    /// Run `f` against the open connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock_conn()?;
            let conn = guard
                .as_mut()
                .ok_or_else(|| RegistryError::invalid_input("Database not connected"))?;
            f(conn, &inner.table)
        })
        .await
        .map_err(|e| RegistryError::Other(format!("Database task failed: {}", e)))?
    }
}

/// Table names are spliced into SQL, so only plain identifiers are allowed.
fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RegistryError::invalid_input(format!(
            "Invalid collection name: {:?}",
            table
        )))
    }
}

fn column_for(field: FilterField) -> &'static str {
    match field {
        FilterField::Name => "name",
        FilterField::RepositoryUrl => "repository_url",
        FilterField::Id => "id",
        FilterField::Version => "version",
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// JSON path for a dotted filter key, each label quoted.
///
/// `None` when the key cannot name a document field (an empty label, or a
/// `"` that a quoted label cannot carry); such a filter matches nothing.
fn document_path(key: &str) -> Option<String> {
    let mut path = String::from("$");
    for label in key.split('.') {
        if label.is_empty() || label.contains('"') {
            return None;
        }
        path.push_str(".\"");
        path.push_str(label);
        path.push('"');
    }
    Some(path)
}

fn decode_document(document: &str, is_latest: bool) -> Result<ServerDetail> {
    let mut detail: ServerDetail = serde_json::from_str(document)?;
    detail.version_detail.is_latest = is_latest;
    Ok(detail)
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    async fn list(
        &self,
        filter: &ListFilter,
        cursor: Option<&str>,
        limit: i64,
    ) -> Result<ListPage> {
        if let Some(cursor) = cursor {
            validate_cursor(cursor)?;
        }
        let limit = normalize_limit(limit);
        let filter = filter.clone();
        let cursor = cursor.map(str::to_string);

        self.run(move |conn, table| {
            let mut sql = format!(
                "SELECT id, document, is_latest FROM {} WHERE is_latest = 1",
                table
            );
            let mut values: Vec<SqlValue> = Vec::new();

            for (key, value) in filter.iter() {
                match FilterField::from_key(key) {
                    Some(field) => {
                        sql.push_str(&format!(" AND {} = ?", column_for(field)));
                    }
                    None => match document_path(key) {
                        // Unrecognized keys address the stored document.
                        Some(path) => {
                            sql.push_str(" AND json_extract(document, ?) = ?");
                            values.push(SqlValue::Text(path));
                        }
                        None => {
                            sql.push_str(" AND 0");
                            continue;
                        }
                    },
                }
                values.push(SqlValue::Text(value.to_string()));
            }

            // An unknown cursor restarts from the first entry.
            if let Some(cursor) = cursor {
                let known: bool = conn.query_row(
                    &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table),
                    params![cursor],
                    |row| row.get(0),
                )?;
                if known {
                    sql.push_str(" AND id > ?");
                    values.push(SqlValue::Text(cursor));
                }
            }

            // One extra row tells us whether another page exists.
            sql.push_str(" ORDER BY id ASC LIMIT ?");
            values.push(SqlValue::Integer(limit.saturating_add(1)));

            let mut stmt = conn.prepare(&sql)?;
            let mut rows: Vec<(String, String, bool)> = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<_>>()?;

            let has_more = rows.len() as i64 > limit;
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));

            let next_cursor = if has_more {
                rows.last().map(|(id, _, _)| id.clone())
            } else {
                None
            };

            let servers: Vec<Server> = rows
                .into_iter()
                .filter_map(|(id, document, is_latest)| {
                    match decode_document(&document, is_latest) {
                        Ok(detail) => Some(detail.summary()),
                        Err(e) => {
                            warn!("Error parsing server document {}: {}", id, e);
                            None
                        }
                    }
                })
                .collect();

            Ok(ListPage {
                servers,
                next_cursor,
            })
        })
        .await
    }

    async fn get_by_id(&self, id: &str) -> Result<ServerDetail> {
        let id = id.to_string();
        self.run(move |conn, table| {
            let row: Option<(String, bool)> = {
                use rusqlite::OptionalExtension;
                conn.query_row(
                    &format!("SELECT document, is_latest FROM {} WHERE id = ?1", table),
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
            };

            match row {
                Some((document, is_latest)) => decode_document(&document, is_latest),
                None => Err(RegistryError::NotFound { id }),
            }
        })
        .await
    }

    async fn publish(&self, detail: ServerDetail) -> Result<ServerDetail> {
        validate_publish(&detail)?;

        self.run(move |conn, table| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Vec<String> = {
                let mut stmt = tx.prepare(&format!("SELECT version FROM {} WHERE name = ?1", table))?;
                let versions = stmt
                    .query_map(params![detail.name], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                versions
            };
            check_version(
                &detail.name,
                detail.version(),
                existing.iter().map(String::as_str),
            )?;

            let stored = stamp_new_entry(detail);
            let document = serde_json::to_string(&stored)?;

            tx.execute(
                &format!(
                    "INSERT INTO {} (id, name, version, repository_url, is_latest, release_date, document)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
                    table
                ),
                params![
                    stored.id,
                    stored.name,
                    stored.version(),
                    stored.repository.url,
                    stored.version_detail.release_date.to_rfc3339(),
                    document,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RegistryError::AlreadyExists {
                        name: stored.name.clone(),
                        version: stored.version().to_string(),
                    }
                } else {
                    e.into()
                }
            })?;

            let demoted = tx.execute(
                &format!(
                    "UPDATE {} SET is_latest = 0,
                         document = json_set(document, '$.version_detail.is_latest', json('false'))
                     WHERE name = ?1 AND id != ?2 AND is_latest = 1",
                    table
                ),
                params![stored.name, stored.id],
            )?;

            tx.commit()?;

            debug!(
                "Published {} version {} as {} (demoted {})",
                stored.name,
                stored.version(),
                stored.id,
                demoted
            );

            Ok(stored)
        })
        .await
    }

    async fn import_seed(&self, path: &Path) -> Result<SeedReport> {
        let records = load_seed_file(path).await?;

        self.run(move |conn, table| {
            let total = records.len();
            info!("Importing {} servers into table {}", total, table);

            let mut report = SeedReport {
                total,
                ..Default::default()
            };

            let tx = conn.transaction()?;
            let mut touched: BTreeSet<String> = BTreeSet::new();
            for (i, record) in records.into_iter().enumerate() {
                let Some(detail) = parse_seed_record(i, record) else {
                    report.skipped += 1;
                    continue;
                };

                let document = match serde_json::to_string(&detail) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!("Error importing server {}: {}", i + 1, e);
                        report.skipped += 1;
                        continue;
                    }
                };

                let previous_name: Option<String> = tx
                    .query_row(
                        &format!("SELECT name FROM {} WHERE id = ?1", table),
                        params![detail.id],
                        |row| row.get(0),
                    )
                    .optional()?;

                // Upsert by id: re-running the import overwrites matching ids.
                let result = tx.execute(
                    &format!(
                        "INSERT INTO {} (id, name, version, repository_url, is_latest, release_date, document)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(id) DO UPDATE SET
                             name = excluded.name,
                             version = excluded.version,
                             repository_url = excluded.repository_url,
                             is_latest = excluded.is_latest,
                             release_date = excluded.release_date,
                             document = excluded.document",
                        table
                    ),
                    params![
                        detail.id,
                        detail.name,
                        detail.version(),
                        detail.repository.url,
                        detail.is_latest(),
                        detail.version_detail.release_date.to_rfc3339(),
                        document,
                    ],
                );

                match result {
                    Ok(_) => {
                        report.imported += 1;
                        touched.insert(detail.name.clone());
                        if let Some(previous) = previous_name {
                            debug!("[{}/{}] Updated server: {}", i + 1, total, detail.name);
                            touched.insert(previous);
                        } else {
                            debug!("[{}/{}] Created server: {}", i + 1, total, detail.name);
                        }
                    }
                    Err(e) if is_unique_violation(&e) => {
                        warn!(
                            "Skipping server {}: {} version {} already exists under another id",
                            i + 1,
                            detail.name,
                            detail.version()
                        );
                        report.skipped += 1;
                    }
                    Err(e) => {
                        warn!("Error importing server {}: {}", i + 1, e);
                        report.skipped += 1;
                    }
                }
            }

            for name in &touched {
                let versions = {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT id, version FROM {} WHERE name = ?1",
                        table
                    ))?;
                    let rows = stmt.query_map(params![name], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                };
                let Some(latest) =
                    latest_entry(versions.iter().map(|(id, v)| (id.as_str(), v.as_str())))
                else {
                    continue;
                };

                tx.execute(
                    &format!(
                        "UPDATE {} SET is_latest = (id = ?2),
                             document = json_set(document, '$.version_detail.is_latest',
                                 json(CASE WHEN id = ?2 THEN 'true' ELSE 'false' END))
                         WHERE name = ?1",
                        table
                    ),
                    params![name, latest],
                )?;
            }
            tx.commit()?;

            info!(
                "SQLite import completed: {} imported, {} skipped",
                report.imported, report.skipped
            );
            Ok(report)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock_conn()?;
            if let Some(conn) = guard.take() {
                inner.connected.store(false, Ordering::SeqCst);
                conn.close().map_err(|(_, e)| RegistryError::from(e))?;
                info!("Closed SQLite registry at {}", inner.location);
            }
            Ok(())
        })
        .await
        .map_err(|e| RegistryError::Other(format!("Database task failed: {}", e)))?
    }

    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            kind: BackendKind::Sqlite,
            is_connected: self.inner.connected.load(Ordering::SeqCst),
            location: Some(self.inner.location.clone()),
        }
    }
}
