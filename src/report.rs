use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Store;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PosterCount {
    pub author: String,
    pub posts: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub posts: i64,
}

/// Everything the CLI prints after a run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub thread: Option<String>,
    pub total_posts: i64,
    pub top_posters: Vec<PosterCount>,
    pub posts_per_day: Vec<DayCount>,
}

impl Report {
    pub fn build(store: &Store, thread: Option<&str>, top: usize) -> Result<Self, StoreError> {
        Ok(Report {
            thread: thread.map(str::to_string),
            total_posts: store.count_posts(thread)?,
            top_posters: top_posters(store, thread, top)?,
            posts_per_day: posts_per_day(store, thread)?,
        })
    }
}

/// Most prolific authors, busiest first. `thread = None` covers the whole store.
pub fn top_posters(
    store: &Store,
    thread: Option<&str>,
    n: usize,
) -> Result<Vec<PosterCount>, StoreError> {
    let mut stmt = store.conn().prepare(
        "SELECT author, COUNT(*) AS n FROM posts
         WHERE ?1 IS NULL OR thread_url = ?1
         GROUP BY author
         ORDER BY n DESC, author ASC
         LIMIT ?2",
    )?;
    let limit = i64::try_from(n).unwrap_or(i64::MAX);
    let rows = stmt
        .query_map(rusqlite::params![thread, limit], |row| {
            Ok(PosterCount {
                author: row.get(0)?,
                posts: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Post count per calendar day, oldest first.
pub fn posts_per_day(store: &Store, thread: Option<&str>) -> Result<Vec<DayCount>, StoreError> {
    let mut stmt = store.conn().prepare(
        "SELECT date, COUNT(*) FROM posts
         WHERE ?1 IS NULL OR thread_url = ?1
         GROUP BY date
         ORDER BY date",
    )?;
    let rows = stmt
        .query_map([thread], |row| {
            let date: String = row.get(0)?;
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(DayCount {
                date,
                posts: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn render_top_posters(rows: &[PosterCount]) -> String {
    let mut out = String::new();
    let name_w = rows
        .iter()
        .map(|r| r.author.chars().count())
        .max()
        .unwrap_or(0)
        .max("Author".len());

    let _ = writeln!(out, "{:>3} | {:<name_w$} | {:>5}", "#", "Author", "Posts");
    let _ = writeln!(out, "{}", "-".repeat(name_w + 14));
    for (i, r) in rows.iter().enumerate() {
        let _ = writeln!(out, "{:>3} | {:<name_w$} | {:>5}", i + 1, r.author, r.posts);
    }
    out
}

/// Horizontal bar chart, one line per day, scaled so the busiest day fills `width`.
pub fn render_histogram(days: &[DayCount], width: usize) -> String {
    let mut out = String::new();
    let Some(peak) = days.iter().map(|d| d.posts).max().filter(|&p| p > 0) else {
        return out;
    };
    for d in days {
        // Round up so a day with any posts always shows a mark.
        let len = (d.posts.max(0) as usize * width).div_ceil(peak as usize);
        let _ = writeln!(out, "{} | {:<width$} {}", d.date, "#".repeat(len), d.posts);
    }
    out
}
