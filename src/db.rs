use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

pub const DEFAULT_DB_PATH: &str = "data/comments.sqlite";

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS videos (
            video_id     TEXT PRIMARY KEY,
            published_at TEXT
        );

        CREATE TABLE IF NOT EXISTS comments (
            comment_id         TEXT PRIMARY KEY,
            video_id           TEXT NOT NULL,
            video_published_at TEXT,
            published_at       TEXT,
            updated_at         TEXT,
            like_count         INTEGER NOT NULL DEFAULT 0,
            total_reply_count  INTEGER NOT NULL DEFAULT 0,
            text               TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);
        ",
    )?;
    Ok(())
}

// ── Collection ──

/// One comment as stored at collection time (raw API fields).
#[derive(Debug, Clone)]
pub struct StoredComment {
    pub comment_id: String,
    pub video_id: String,
    pub video_published_at: String,
    pub published_at: String,
    pub updated_at: String,
    pub like_count: i64,
    pub total_reply_count: i64,
    pub text: String,
}

pub fn insert_videos(conn: &Connection, videos: &[(String, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO videos (video_id, published_at) VALUES (?1, ?2)")?;
        for (video_id, published_at) in videos {
            count += stmt.execute(rusqlite::params![video_id, published_at])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Insert comments, skipping ids already present. Returns the number of new
/// rows; re-collecting the same video is a no-op.
pub fn insert_comments(conn: &Connection, comments: &[StoredComment]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO comments
             (comment_id, video_id, video_published_at, published_at, updated_at,
              like_count, total_reply_count, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for c in comments {
            count += stmt.execute(rusqlite::params![
                c.comment_id,
                c.video_id,
                c.video_published_at,
                c.published_at,
                c.updated_at,
                c.like_count,
                c.total_reply_count,
                c.text,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Sampling extractor ──

/// One comment as fed to the labeler and coding sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub comment_id: String,
    pub video_id: String,
    pub published_at: String,
    pub like_count: i64,
    pub total_reply_count: i64,
    pub text: String,
}

/// Extract comments in a reproducible order.
///
/// Without a seed, rows come back in insertion (rowid) order. With a seed,
/// the ordering key is `(length(comment_id) * seed) % 100` with ties broken
/// by `comment_id` — a deterministic pseudo-shuffle, not a uniform random
/// sample. The same `(seed, limit)` on the same data always yields the same
/// sequence; downstream reproducibility depends on keeping this expression
/// as is.
pub fn extract_comments(
    conn: &Connection,
    limit: Option<usize>,
    seed: Option<i64>,
) -> Result<Vec<Comment>> {
    let mut sql = String::from(
        "SELECT comment_id, video_id, published_at, like_count, total_reply_count, text
         FROM comments",
    );
    if let Some(seed) = seed {
        sql.push_str(&format!(
            " ORDER BY ((length(comment_id) * {}) % 100), comment_id",
            seed
        ));
    }
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Comment {
                comment_id: row.get(0)?,
                video_id: row.get(1)?,
                published_at: row.get(2)?,
                like_count: row.get(3)?,
                total_reply_count: row.get(4)?,
                text: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_comments_for_video(conn: &Connection, video_id: &str) -> Result<usize> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE video_id = ?1",
        [video_id],
        |r| r.get(0),
    )?;
    Ok(count)
}

// ── Stats ──

pub struct VideoStats {
    pub video_id: String,
    pub n_comments: usize,
    pub first_comment: String,
    pub last_comment: String,
}

pub struct DatasetStats {
    pub total_comments: usize,
    pub total_videos: usize,
    pub per_video: Vec<VideoStats>,
}

pub fn get_stats(conn: &Connection) -> Result<DatasetStats> {
    let total_comments: usize =
        conn.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
    let total_videos: usize = conn.query_row(
        "SELECT COUNT(DISTINCT video_id) FROM comments",
        [],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT video_id, COUNT(*), MIN(published_at), MAX(published_at)
         FROM comments GROUP BY video_id ORDER BY video_id",
    )?;
    let per_video = stmt
        .query_map([], |row| {
            Ok(VideoStats {
                video_id: row.get(0)?,
                n_comments: row.get(1)?,
                first_comment: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                last_comment: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DatasetStats {
        total_comments,
        total_videos,
        per_video,
    })
}

// ── Tests ──
