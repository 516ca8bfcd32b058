use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::models::Hashtag;
use crate::error::AppResult;

#[derive(Debug, Default, Deserialize)]
pub struct HashtagFilter {
    pub name: Option<String>,
}

pub fn list(conn: &Connection, filter: &HashtagFilter) -> AppResult<Vec<Hashtag>> {
    let hashtags = match filter.name.as_deref().filter(|s| !s.is_empty()) {
        Some(name) => {
            let mut stmt = conn.prepare(
                "SELECT id, name FROM hashtags WHERE casefold(name) LIKE ?1 ESCAPE '\\' ORDER BY name, id",
            )?;
            let rows = stmt
                .query_map(params![super::contains_pattern(name)], Hashtag::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare("SELECT id, name FROM hashtags ORDER BY name, id")?;
            let rows = stmt
                .query_map([], Hashtag::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(hashtags)
}

pub fn get(conn: &Connection, id: i64) -> AppResult<Option<Hashtag>> {
    Ok(conn
        .query_row(
            "SELECT id, name FROM hashtags WHERE id = ?1",
            params![id],
            Hashtag::from_row,
        )
        .optional()?)
}

pub fn name_taken(conn: &Connection, name: &str, except: Option<i64>) -> AppResult<bool> {
    Ok(conn.query_row(
        "SELECT COUNT(*) > 0 FROM hashtags WHERE name = ?1 AND id IS NOT ?2",
        params![name, except],
        |row| row.get(0),
    )?)
}

pub fn create(conn: &Connection, name: &str) -> AppResult<Hashtag> {
    conn.execute("INSERT INTO hashtags (name) VALUES (?1)", params![name])?;
    Ok(Hashtag {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Look a hashtag up by exact name, creating it when missing.
pub fn find_or_create(conn: &Connection, name: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO hashtags (name) VALUES (?1)",
        params![name],
    )?;
    Ok(conn.query_row(
        "SELECT id FROM hashtags WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?)
}

/// Returns false when no hashtag has this id.
pub fn rename(conn: &Connection, id: i64, name: &str) -> AppResult<bool> {
    let rows = conn.execute(
        "UPDATE hashtags SET name = ?2 WHERE id = ?1",
        params![id, name],
    )?;
    Ok(rows > 0)
}

/// Delete a hashtag; post links go with it.
pub fn delete(conn: &Connection, id: i64) -> AppResult<bool> {
    let rows = conn.execute("DELETE FROM hashtags WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Hashtags attached to a post, by name.
pub fn for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Hashtag>> {
    let mut stmt = conn.prepare(
        "SELECT h.id, h.name FROM hashtags h
         JOIN post_hashtags ph ON ph.hashtag_id = h.id
         WHERE ph.post_id = ?1
         ORDER BY h.name, h.id",
    )?;
    let hashtags = stmt
        .query_map(params![post_id], Hashtag::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hashtags)
}
