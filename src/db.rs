use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use serde::Serialize;
use url::Url;

use crate::config::DuplicatePolicy;
use crate::error::StoreError;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

/// One post as extracted from a thread page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub post_id: i64,
    pub author: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub body: Option<String>,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
    Skipped,
}

/// An open post database. The connection closes when this is dropped.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open an existing post database without changing it: no journal mode
    /// switch and no schema step. Files without a `posts` table are refused.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let has_posts: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'posts')",
            [],
            |row| row.get(0),
        )?;
        if !has_posts {
            return Err(StoreError::NotAPostStore {
                path: path.to_path_buf(),
            });
        }
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert a post. An existing `(thread, post_id)` is `DuplicatePost`.
    pub fn write_post(&self, thread: &str, post: &Post) -> Result<(), StoreError> {
        match self.insert("INSERT", thread, post) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(StoreError::DuplicatePost {
                    post_id: post.post_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn replace_post(&self, thread: &str, post: &Post) -> Result<(), StoreError> {
        self.insert("INSERT OR REPLACE", thread, post)?;
        Ok(())
    }

    fn insert(&self, verb: &str, thread: &str, post: &Post) -> rusqlite::Result<usize> {
        let sql = format!(
            "{} INTO posts (thread_url, post_id, author, date, time, body, page)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            verb
        );
        self.conn.execute(
            &sql,
            params![
                thread,
                post.post_id,
                post.author,
                post.date.format(DATE_FMT).to_string(),
                post.time.format(TIME_FMT).to_string(),
                post.body,
                post.page,
            ],
        )
    }

    /// Write a post, resolving an already-stored id with `policy`.
    pub fn save_post(
        &self,
        thread: &str,
        post: &Post,
        policy: DuplicatePolicy,
    ) -> Result<WriteOutcome, StoreError> {
        match self.write_post(thread, post) {
            Ok(()) => Ok(WriteOutcome::Inserted),
            Err(StoreError::DuplicatePost { .. }) if policy == DuplicatePolicy::Skip => {
                Ok(WriteOutcome::Skipped)
            }
            Err(StoreError::DuplicatePost { .. }) if policy == DuplicatePolicy::Overwrite => {
                self.replace_post(thread, post)?;
                Ok(WriteOutcome::Replaced)
            }
            Err(e) => Err(e),
        }
    }

    /// Stored posts of a thread, by id.
    pub fn posts(&self, thread: &str) -> Result<Vec<Post>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT post_id, author, date, time, body, page
             FROM posts WHERE thread_url = ?1 ORDER BY post_id",
        )?;
        let rows = stmt
            .query_map([thread], |row| {
                let date: String = row.get(2)?;
                let time: String = row.get(3)?;
                Ok(Post {
                    post_id: row.get(0)?,
                    author: row.get(1)?,
                    date: NaiveDate::parse_from_str(&date, DATE_FMT)
                        .map_err(|e| bad_column(2, e))?,
                    time: NaiveTime::parse_from_str(&time, TIME_FMT)
                        .map_err(|e| bad_column(3, e))?,
                    body: row.get(4)?,
                    page: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_posts(&self, thread: Option<&str>) -> Result<i64, StoreError> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE ?1 IS NULL OR thread_url = ?1",
            [thread],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    pub fn threads(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT thread_url FROM posts ORDER BY thread_url")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS posts (
            thread_url TEXT NOT NULL,
            post_id    INTEGER NOT NULL,
            author     TEXT NOT NULL,
            date       TEXT NOT NULL,
            time       TEXT NOT NULL,
            body       TEXT,
            page       INTEGER NOT NULL,
            scraped_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (thread_url, post_id)
        );
        CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(thread_url, author);
        ",
    )?;
    Ok(())
}

fn bad_column(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Default database file for a thread: its title slug plus `.db`.
///
/// Thread URLs end in `<title>/<board>-<id>/`, so the slug is the second-to-last
/// path segment.
pub fn default_store_path(thread: &Url) -> PathBuf {
    let segments: Vec<&str> = thread
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let pick = match segments.len() {
        0 => "",
        1 => segments[0],
        n => segments[n - 2],
    };
    let name: String = pick
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if name.is_empty() {
        PathBuf::from("thread.db")
    } else {
        PathBuf::from(format!("{}.db", name))
    }
}
