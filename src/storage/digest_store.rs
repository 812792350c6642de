// SQLite store of produced digests
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

use crate::pipeline::TextbookDigest;
use crate::types::{BooksumError, Result};

pub struct DigestStore {
    conn: Connection,
}

impl DigestStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening digest store {}", path.display());
        let conn = Connection::open(path)?;
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Processed PDF files
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                title TEXT,
                total_pages INTEGER NOT NULL,
                file_size INTEGER,
                created_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL
            );

            -- One row per summarize run, digest stored as JSON
            CREATE TABLE IF NOT EXISTS digests (
                id INTEGER PRIMARY KEY,
                document_id INTEGER NOT NULL,
                chapter_count INTEGER NOT NULL,
                topic_count INTEGER NOT NULL,
                digest_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (document_id) REFERENCES documents(id)
            );

            CREATE INDEX IF NOT EXISTS idx_digests_document
                ON digests(document_id, created_at);
            "#,
        )?;
        Ok(())
    }

    /// Store a digest, registering or refreshing its document; returns the
    /// digest id
    pub fn save_digest(&self, digest: &TextbookDigest, file_size: u64) -> Result<i64> {
        let path_str = digest.source.to_string_lossy();
        let filename = digest
            .source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.pdf");
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r#"INSERT INTO documents (path, filename, title, total_pages, file_size, created_at, last_accessed)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
               ON CONFLICT(path) DO UPDATE SET
                   last_accessed = excluded.last_accessed,
                   title = excluded.title,
                   total_pages = excluded.total_pages,
                   file_size = excluded.file_size"#,
            params![
                path_str,
                filename,
                digest.metadata.title,
                digest.metadata.page_count as i64,
                file_size as i64,
                now
            ],
        )?;

        let document_id: i64 = self.conn.query_row(
            "SELECT id FROM documents WHERE path = ?1",
            params![path_str],
            |row| row.get(0),
        )?;

        let json = serde_json::to_string(digest)?;
        self.conn.execute(
            r#"INSERT INTO digests (document_id, chapter_count, topic_count, digest_json, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                document_id,
                digest.chapters.len() as i64,
                digest.topic_count() as i64,
                json,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Saved digest {} for {}", id, path_str);
        Ok(id)
    }

    pub fn load_digest(&self, id: i64) -> Result<TextbookDigest> {
        let json: String = self
            .conn
            .query_row("SELECT digest_json FROM digests WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| BooksumError::NotFound(format!("digest {}", id)))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Most recent digest of the document at `path`
    pub fn latest_for(&self, path: &Path) -> Result<Option<TextbookDigest>> {
        let json: Option<String> = self
            .conn
            .query_row(
                r#"SELECT g.digest_json
                   FROM digests g
                   JOIN documents d ON g.document_id = d.id
                   WHERE d.path = ?1
                   ORDER BY g.id DESC
                   LIMIT 1"#,
                params![path.to_string_lossy()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All stored digests, newest first
    pub fn list_digests(&self) -> Result<Vec<DigestInfo>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT g.id, d.filename, d.path, d.title, g.chapter_count, g.topic_count, g.created_at
               FROM digests g
               JOIN documents d ON g.document_id = d.id
               ORDER BY g.id DESC"#,
        )?;

        let digests = stmt.query_map([], |row| {
            Ok(DigestInfo {
                id: row.get(0)?,
                filename: row.get(1)?,
                path: row.get(2)?,
                title: row.get(3)?,
                chapter_count: row.get(4)?,
                topic_count: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        Ok(digests.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let document_count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let digest_count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM digests", [], |row| row.get(0))?;
        let topic_count: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(topic_count), 0) FROM digests",
            [],
            |row| row.get(0),
        )?;
        let total_file_size: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(file_size), 0) FROM documents",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            document_count: document_count as usize,
            digest_count: digest_count as usize,
            topic_count: topic_count as usize,
            total_file_size: total_file_size as u64,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DigestInfo {
    pub id: i64,
    pub filename: String,
    pub path: String,
    pub title: Option<String>,
    pub chapter_count: i64,
    pub topic_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub document_count: usize,
    pub digest_count: usize,
    pub topic_count: usize,
    pub total_file_size: u64,
}
