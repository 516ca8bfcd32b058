use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::models::Profile;
use crate::error::AppResult;

/// Which slice of the profile graph a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileScope {
    /// Every profile, newest-joined first.
    Directory,
    /// Profiles followed by the given profile, by nickname.
    FollowedBy(i64),
    /// Profiles following the given profile, by nickname.
    FollowersOf(i64),
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileFilter {
    pub nickname: Option<String>,
}

/// Base query for a scope; every variant leaves `WHERE` open for more
/// `AND` clauses.
fn scoped_query(scope: ProfileScope) -> (String, Option<i64>, &'static str) {
    let base = format!(
        "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id",
        Profile::COLUMNS
    );
    match scope {
        ProfileScope::Directory => (
            format!("{} WHERE 1 = 1", base),
            None,
            "u.date_joined DESC, p.id DESC",
        ),
        ProfileScope::FollowedBy(id) => (
            format!(
                "{} JOIN profile_following f ON f.followed_id = p.id WHERE f.follower_id = ?1",
                base
            ),
            Some(id),
            "p.nickname ASC",
        ),
        ProfileScope::FollowersOf(id) => (
            format!(
                "{} JOIN profile_following f ON f.follower_id = p.id WHERE f.followed_id = ?1",
                base
            ),
            Some(id),
            "p.nickname ASC",
        ),
    }
}

pub fn list(
    conn: &Connection,
    scope: ProfileScope,
    filter: &ProfileFilter,
) -> AppResult<Vec<Profile>> {
    let (mut sql, anchor, order) = scoped_query(scope);
    let mut args: Vec<Value> = Vec::new();
    if let Some(anchor) = anchor {
        args.push(Value::Integer(anchor));
    }

    if let Some(nickname) = filter.nickname.as_deref().filter(|s| !s.is_empty()) {
        args.push(Value::Text(super::contains_pattern(nickname)));
        sql.push_str(&format!(
            " AND casefold(p.nickname) LIKE ?{} ESCAPE '\\'",
            args.len()
        ));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order);

    let mut stmt = conn.prepare(&sql)?;
    let profiles = stmt
        .query_map(params_from_iter(args.iter()), Profile::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

/// Fetch one profile, but only if it belongs to `scope`.
pub fn get_in_scope(conn: &Connection, scope: ProfileScope, id: i64) -> AppResult<Option<Profile>> {
    let (sql, anchor, _) = scoped_query(scope);
    let sql = format!("{} AND p.id = ?{}", sql, if anchor.is_some() { 2 } else { 1 });
    let profile = match anchor {
        Some(anchor) => conn
            .query_row(&sql, params![anchor, id], Profile::from_row)
            .optional()?,
        None => conn
            .query_row(&sql, params![id], Profile::from_row)
            .optional()?,
    };
    Ok(profile)
}

pub fn get(conn: &Connection, id: i64) -> AppResult<Option<Profile>> {
    get_in_scope(conn, ProfileScope::Directory, id)
}

pub fn find_by_nickname(conn: &Connection, nickname: &str) -> AppResult<Option<Profile>> {
    let sql = format!(
        "SELECT {} FROM profiles p JOIN users u ON u.id = p.user_id WHERE p.nickname = ?1",
        Profile::COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![nickname], Profile::from_row)
        .optional()?)
}

pub fn nickname_taken(conn: &Connection, nickname: &str, except: Option<i64>) -> AppResult<bool> {
    Ok(conn.query_row(
        "SELECT COUNT(*) > 0 FROM profiles WHERE nickname = ?1 AND id IS NOT ?2",
        params![nickname, except],
        |row| row.get(0),
    )?)
}

pub fn create(conn: &Connection, user_id: i64, nickname: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO profiles (user_id, nickname) VALUES (?1, ?2)",
        params![user_id, nickname],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the profile's own scalar fields.
pub fn update(
    conn: &Connection,
    id: i64,
    nickname: &str,
    bio: Option<&str>,
    profile_image: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE profiles SET nickname = ?2, bio = ?3, profile_image = ?4 WHERE id = ?1",
        params![id, nickname, bio, profile_image],
    )?;
    Ok(())
}

/// Add the edge `follower -> followed`. Returns false if it already existed.
pub fn follow(conn: &Connection, follower: i64, followed: i64) -> AppResult<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO profile_following (follower_id, followed_id) VALUES (?1, ?2)",
        params![follower, followed],
    )?;
    Ok(rows > 0)
}

/// Remove the edge `follower -> followed`. Returns false if there was none.
pub fn unfollow(conn: &Connection, follower: i64, followed: i64) -> AppResult<bool> {
    let rows = conn.execute(
        "DELETE FROM profile_following WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower, followed],
    )?;
    Ok(rows > 0)
}

/// `(followers, following)` counts for a profile.
pub fn follow_counts(conn: &Connection, id: i64) -> AppResult<(i64, i64)> {
    Ok(conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM profile_following WHERE followed_id = ?1),
            (SELECT COUNT(*) FROM profile_following WHERE follower_id = ?1)",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
