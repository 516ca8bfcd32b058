use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;
use crate::error::AppResult;

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Partial update of account fields. `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

pub fn create(conn: &Connection, user: &NewUser<'_>) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO users (email, password_hash, first_name, last_name, date_joined)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.email,
            user.password_hash,
            user.first_name,
            user.last_name,
            super::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", User::COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], User::from_row)
        .optional()?)
}

pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.email = ?1", User::COLUMNS);
    Ok(conn
        .query_row(&sql, params![email], User::from_row)
        .optional()?)
}

/// Whether another account already uses `email`.
pub fn email_taken(conn: &Connection, email: &str, except: Option<i64>) -> AppResult<bool> {
    Ok(conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1 AND id IS NOT ?2",
        params![email, except],
        |row| row.get(0),
    )?)
}

pub fn update(conn: &Connection, id: i64, changes: &UserChanges) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET
            email = COALESCE(?2, email),
            first_name = COALESCE(?3, first_name),
            last_name = COALESCE(?4, last_name),
            password_hash = COALESCE(?5, password_hash)
         WHERE id = ?1",
        params![
            id,
            changes.email,
            changes.first_name,
            changes.last_name,
            changes.password_hash
        ],
    )?;
    Ok(())
}

/// Set the staff flag by email. Returns false when no such account exists.
pub fn set_staff(conn: &Connection, email: &str, is_staff: bool) -> AppResult<bool> {
    let rows = conn.execute(
        "UPDATE users SET is_staff = ?2 WHERE email = ?1",
        params![email, is_staff],
    )?;
    Ok(rows > 0)
}
