use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::error::IndexError;
use super::models::{FileRecord, IndexStats, PeerActivity, PeerUpdate, SearchPage};
use super::{recent_cutoff, MetadataIndex, MAX_PAGE_SIZE};

const MIGRATIONS: &str = r#"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_hash TEXT UNIQUE NOT NULL,
        original_name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        mime_type TEXT,
        upload_time INTEGER NOT NULL,
        download_count INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        uploader_ip TEXT,
        description TEXT,
        tags TEXT,
        search_text TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS peers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        file_hash TEXT NOT NULL,
        peer_ip TEXT NOT NULL,
        peer_port INTEGER NOT NULL,
        last_seen INTEGER NOT NULL,
        upload_speed INTEGER NOT NULL DEFAULT 0,
        download_speed INTEGER NOT NULL DEFAULT 0,
        UNIQUE (file_hash, peer_ip),
        FOREIGN KEY (file_hash) REFERENCES files(file_hash) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_files_upload_time ON files(upload_time);
    CREATE INDEX IF NOT EXISTS idx_peers_last_seen ON peers(last_seen);
"#;

const FILE_COLUMNS: &str = "file_hash, original_name, file_path, file_size, mime_type, \
    upload_time, download_count, is_active, uploader_ip, description, tags";

// `search_text` is lowercased in Rust at insert; SQLite's LOWER() folds ASCII only.
const SEARCH_FILTER: &str = "is_active = 1 AND (?1 = '' OR search_text LIKE ?2 ESCAPE '\\')";

/// Relational backend for the metadata index.
#[derive(Clone)]
pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndex {
    /// Open or create the index at the given directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, IndexError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let conn = Connection::open(data_dir.as_ref().join("bitswap-index.sqlite"))?;
        conn.execute_batch(MIGRATIONS)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Poisoned)
    }
}

fn to_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

fn from_micros(micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, micros))
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        hash: row.get(0)?,
        original_name: row.get(1)?,
        storage_path: row.get(2)?,
        size_bytes: row.get::<_, i64>(3)? as u64,
        mime_type: row.get(4)?,
        upload_time: from_micros(row.get(5)?)?,
        download_count: row.get::<_, i64>(6)? as u64,
        is_active: row.get(7)?,
        uploader_address: row.get(8)?,
        description: row.get(9)?,
        tags: row.get(10)?,
    })
}

/// Escape LIKE wildcards so the query is matched literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

impl MetadataIndex for SqliteIndex {
    fn insert(&self, record: &FileRecord) -> Result<(), IndexError> {
        let conn = self.conn()?;
        let result = conn.execute(
            r#"
            INSERT INTO files (file_hash, original_name, file_path, file_size, mime_type,
                               upload_time, download_count, is_active, uploader_ip,
                               description, tags, search_text)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                record.hash,
                record.original_name,
                record.storage_path,
                record.size_bytes as i64,
                record.mime_type,
                to_micros(record.upload_time),
                record.download_count as i64,
                record.is_active,
                record.uploader_address,
                record.description,
                record.tags,
                record.search_text(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(IndexError::Conflict(record.hash.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn lookup(&self, hash: &str) -> Result<Option<FileRecord>, IndexError> {
        let conn = self.conn()?;
        let sql =
            format!("SELECT {FILE_COLUMNS} FROM files WHERE file_hash = ?1 AND is_active = 1");
        Ok(conn.query_row(&sql, params![hash], row_to_file).optional()?)
    }

    fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchPage, IndexError> {
        let conn = self.conn()?;
        let pattern = like_pattern(query);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM files WHERE {SEARCH_FILTER}"),
            params![query, pattern],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE {SEARCH_FILTER} \
             ORDER BY upload_time DESC, id DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt.query_map(
            params![
                query,
                pattern,
                i64::from(limit.min(MAX_PAGE_SIZE)),
                i64::from(offset)
            ],
            row_to_file,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(SearchPage {
            records,
            total: total as u64,
        })
    }

    fn increment_download_count(&self, hash: &str) -> Result<(), IndexError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE files SET download_count = download_count + 1 WHERE file_hash = ?1",
            params![hash],
        )?;
        Ok(())
    }

    fn set_active(&self, hash: &str, active: bool) -> Result<bool, IndexError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE files SET is_active = ?2 WHERE file_hash = ?1",
            params![hash, active],
        )?;
        Ok(changed > 0)
    }

    fn aggregate_stats(&self, now: DateTime<Utc>) -> Result<IndexStats, IndexError> {
        let conn = self.conn()?;
        let (file_count, total_bytes, total_downloads): (i64, i64, i64) = conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(file_size), 0), COALESCE(SUM(download_count), 0)
            FROM files
            WHERE is_active = 1
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let recent_peers: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT peer_ip) FROM peers WHERE last_seen > ?1",
            params![to_micros(recent_cutoff(now))],
            |row| row.get(0),
        )?;

        Ok(IndexStats {
            file_count: file_count as u64,
            total_bytes: total_bytes as u64,
            distinct_recent_peers: recent_peers as u64,
            total_downloads: total_downloads as u64,
        })
    }

    fn upsert_peer(&self, update: &PeerUpdate) -> Result<(), IndexError> {
        let (column, speed) = match update.activity {
            PeerActivity::Upload(speed) => ("upload_speed", speed),
            PeerActivity::Download(speed) => ("download_speed", speed),
        };

        let conn = self.conn()?;
        conn.execute(
            &format!(
                r#"
                INSERT INTO peers (file_hash, peer_ip, peer_port, last_seen, {column})
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(file_hash, peer_ip) DO UPDATE SET
                    peer_port = excluded.peer_port,
                    last_seen = excluded.last_seen,
                    {column} = excluded.{column}
                "#
            ),
            params![
                update.hash,
                update.address,
                update.port,
                to_micros(update.seen_at),
                speed as i64,
            ],
        )?;
        Ok(())
    }

    fn count_peers(&self, hash: &str) -> Result<u64, IndexError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM peers WHERE file_hash = ?1",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
