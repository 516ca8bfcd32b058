use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::models::Comment;
use crate::error::AppResult;

#[derive(Debug, Default, Deserialize)]
pub struct CommentFilter {
    pub post: Option<i64>,
}

fn select() -> String {
    format!(
        "SELECT {} FROM comments c JOIN profiles a ON a.id = c.author_id",
        Comment::COLUMNS
    )
}

/// Comments oldest first, optionally restricted to one post.
pub fn list(conn: &Connection, filter: &CommentFilter) -> AppResult<Vec<Comment>> {
    let sql = format!(
        "{} WHERE ?1 IS NULL OR c.post_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
        select()
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map(params![filter.post], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn for_post(conn: &Connection, post_id: i64) -> AppResult<Vec<Comment>> {
    list(
        conn,
        &CommentFilter {
            post: Some(post_id),
        },
    )
}

pub fn get(conn: &Connection, id: i64) -> AppResult<Option<Comment>> {
    let sql = format!("{} WHERE c.id = ?1", select());
    Ok(conn
        .query_row(&sql, params![id], Comment::from_row)
        .optional()?)
}

pub fn create(conn: &Connection, post_id: i64, author_id: i64, text: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, author_id, text, super::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_text(conn: &Connection, id: i64, text: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE comments SET text = ?2 WHERE id = ?1",
        params![id, text],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(())
}
