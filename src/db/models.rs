use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub date_joined: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "u.id, u.email, u.password_hash, u.first_name, u.last_name, u.is_staff, u.date_joined";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            is_staff: row.get("is_staff")?,
            date_joined: row.get("date_joined")?,
        })
    }
}

/// A profile joined with the summary fields of its owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Profile {
    pub const COLUMNS: &'static str = "p.id, p.user_id, p.nickname, p.bio, p.profile_image, \
         u.email, u.first_name, u.last_name";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            nickname: row.get("nickname")?,
            bio: row.get("bio")?,
            profile_image: row.get("profile_image")?,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }
}

/// A post annotated with its author's public fields and its like count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub author_nickname: String,
    pub author_image: Option<String>,
    pub title: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub like_count: i64,
}

impl Post {
    pub const COLUMNS: &'static str = "p.id, p.author_id, a.nickname AS author_nickname, \
         a.profile_image AS author_image, p.title, p.text, p.image, p.created_at, \
         (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            author_id: row.get("author_id")?,
            author_nickname: row.get("author_nickname")?,
            author_image: row.get("author_image")?,
            title: row.get("title")?,
            text: row.get("text")?,
            image: row.get("image")?,
            created_at: row.get("created_at")?,
            like_count: row.get("like_count")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashtag {
    pub id: i64,
    pub name: String,
}

impl Hashtag {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_nickname: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub const COLUMNS: &'static str = "c.id, c.post_id, c.author_id, \
         a.nickname AS author_nickname, c.text, c.created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            post_id: row.get("post_id")?,
            author_id: row.get("author_id")?,
            author_nickname: row.get("author_nickname")?,
            text: row.get("text")?,
            created_at: row.get("created_at")?,
        })
    }
}
