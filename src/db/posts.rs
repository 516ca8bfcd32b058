//! Post storage and the queries behind the catalog, "my posts" and the
//! followed-profiles feed.

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::Deserialize;

use crate::db::hashtags;
use crate::db::models::Post;
use crate::error::AppResult;

/// Which posts a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post.
    Catalog,
    /// Posts written by the given profile.
    AuthoredBy(i64),
    /// Posts written by any profile the given profile follows.
    FollowedBy(i64),
}

/// Case-insensitive substring filters, combined with AND.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub hashtag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

/// Scalar fields of a post as written by its author.
#[derive(Debug, Clone, Default)]
pub struct PostFields {
    pub title: String,
    pub text: Option<String>,
    pub image: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Build the `WHERE` clause for a scope, a filter and an optional id.
fn where_clause(
    scope: PostScope,
    filter: &PostFilter,
    id: Option<i64>,
    args: &mut Vec<Value>,
) -> String {
    let mut clauses: Vec<String> = Vec::new();

    match scope {
        PostScope::Catalog => {}
        PostScope::AuthoredBy(profile_id) => {
            args.push(Value::Integer(profile_id));
            clauses.push(format!("p.author_id = ?{}", args.len()));
        }
        PostScope::FollowedBy(profile_id) => {
            args.push(Value::Integer(profile_id));
            clauses.push(format!(
                "p.author_id IN (SELECT followed_id FROM profile_following WHERE follower_id = ?{})",
                args.len()
            ));
        }
    }

    if let Some(id) = id {
        args.push(Value::Integer(id));
        clauses.push(format!("p.id = ?{}", args.len()));
    }
    if let Some(title) = non_empty(&filter.title) {
        args.push(Value::Text(super::contains_pattern(title)));
        clauses.push(format!("casefold(p.title) LIKE ?{} ESCAPE '\\'", args.len()));
    }
    if let Some(author) = non_empty(&filter.author) {
        args.push(Value::Text(super::contains_pattern(author)));
        clauses.push(format!("casefold(a.nickname) LIKE ?{} ESCAPE '\\'", args.len()));
    }
    if let Some(hashtag) = non_empty(&filter.hashtag) {
        args.push(Value::Text(super::contains_pattern(hashtag)));
        // EXISTS keeps one row per post even with several matching tags.
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM post_hashtags ph JOIN hashtags h ON h.id = ph.hashtag_id \
             WHERE ph.post_id = p.id AND casefold(h.name) LIKE ?{} ESCAPE '\\')",
            args.len()
        ));
    }

    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

fn select() -> String {
    format!(
        "SELECT {} FROM posts p JOIN profiles a ON a.id = p.author_id",
        Post::COLUMNS
    )
}

/// Posts visible in `scope` that match `filter`, newest first.
pub fn list(conn: &Connection, scope: PostScope, filter: &PostFilter) -> AppResult<Vec<Post>> {
    let mut args = Vec::new();
    let sql = format!(
        "{}{} ORDER BY p.created_at DESC, p.id DESC",
        select(),
        where_clause(scope, filter, None, &mut args)
    );

    let mut stmt = conn.prepare(&sql)?;
    let posts = stmt
        .query_map(params_from_iter(args.iter()), Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// One post, only if `scope` can see it.
pub fn get(conn: &Connection, scope: PostScope, id: i64) -> AppResult<Option<Post>> {
    let mut args = Vec::new();
    let sql = format!(
        "{}{}",
        select(),
        where_clause(scope, &PostFilter::default(), Some(id), &mut args)
    );
    Ok(conn
        .query_row(&sql, params_from_iter(args.iter()), Post::from_row)
        .optional()?)
}

pub fn exists(conn: &Connection, id: i64) -> AppResult<bool> {
    Ok(conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?)
}

pub fn create(conn: &Connection, author_id: i64, fields: &PostFields) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO posts (author_id, title, text, image, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            author_id,
            fields.title,
            fields.text,
            fields.image,
            super::now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite a post's scalar fields. Returns false when `author_id` does
/// not own a post with this id.
pub fn update(conn: &Connection, author_id: i64, id: i64, fields: &PostFields) -> AppResult<bool> {
    let rows = conn.execute(
        "UPDATE posts SET title = ?3, text = ?4, image = ?5 WHERE id = ?1 AND author_id = ?2",
        params![id, author_id, fields.title, fields.text, fields.image],
    )?;
    Ok(rows > 0)
}

pub fn delete(conn: &Connection, author_id: i64, id: i64) -> AppResult<bool> {
    let rows = conn.execute(
        "DELETE FROM posts WHERE id = ?1 AND author_id = ?2",
        params![id, author_id],
    )?;
    Ok(rows > 0)
}

/// Replace the post's hashtags with `names`, creating missing hashtags.
/// Repeated names attach once.
pub fn set_hashtags<S: AsRef<str>>(conn: &Connection, post_id: i64, names: &[S]) -> AppResult<()> {
    conn.execute(
        "DELETE FROM post_hashtags WHERE post_id = ?1",
        params![post_id],
    )?;
    for name in names {
        let hashtag_id = hashtags::find_or_create(conn, name.as_ref())?;
        conn.execute(
            "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id) VALUES (?1, ?2)",
            params![post_id, hashtag_id],
        )?;
    }
    Ok(())
}

/// Flip the like edge between a profile and a post.
pub fn toggle_like(conn: &Connection, post_id: i64, profile_id: i64) -> AppResult<LikeToggle> {
    let removed = conn.execute(
        "DELETE FROM post_likes WHERE post_id = ?1 AND profile_id = ?2",
        params![post_id, profile_id],
    )?;
    if removed > 0 {
        return Ok(LikeToggle::Unliked);
    }

    conn.execute(
        "INSERT OR IGNORE INTO post_likes (post_id, profile_id) VALUES (?1, ?2)",
        params![post_id, profile_id],
    )?;
    Ok(LikeToggle::Liked)
}

/// Nicknames of profiles liking a post.
pub fn likers(conn: &Connection, post_id: i64) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT pr.nickname FROM post_likes l
         JOIN profiles pr ON pr.id = l.profile_id
         WHERE l.post_id = ?1
         ORDER BY pr.nickname",
    )?;
    let names = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{profiles, test_pool, users};

    fn profile(conn: &Connection, nickname: &str) -> i64 {
        let email = format!("{}@example.com", nickname);
        let user_id = users::create(
            conn,
            &users::NewUser {
                email: &email,
                password_hash: "hash",
                first_name: "",
                last_name: "",
            },
        )
        .unwrap();
        profiles::create(conn, user_id, nickname).unwrap()
    }

    fn post(conn: &Connection, author: i64, title: &str, tags: &[&str]) -> i64 {
        let id = create(
            conn,
            author,
            &PostFields {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        set_hashtags(conn, id, tags).unwrap();
        id
    }

    fn ids(posts: &[Post]) -> Vec<i64> {
        posts.iter().map(|p| p.id).collect()
    }

    #[test]
    fn catalog_is_newest_first() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "a");
        let first = post(&conn, a, "one", &[]);
        let second = post(&conn, a, "two", &[]);

        let all = list(&conn, PostScope::Catalog, &PostFilter::default()).unwrap();
        assert_eq!(ids(&all), vec![second, first]);
    }

    #[test]
    fn filters_narrow_and_combine() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "alice");
        let b = profile(&conn, "bob");
        let boxing = post(&conn, a, "test", &["box"]);
        let sport = post(&conn, b, "sport", &["sport"]);
        let music = post(&conn, b, "music", &["music", "sport"]);

        let by_tag = PostFilter {
            hashtag: Some("SPORT".into()),
            ..Default::default()
        };
        assert_eq!(
            ids(&list(&conn, PostScope::Catalog, &by_tag).unwrap()),
            vec![music, sport]
        );

        let by_author = PostFilter {
            author: Some("ali".into()),
            ..Default::default()
        };
        assert_eq!(
            ids(&list(&conn, PostScope::Catalog, &by_author).unwrap()),
            vec![boxing]
        );

        let combined = PostFilter {
            title: Some("mus".into()),
            hashtag: Some("sport".into()),
            author: Some("bob".into()),
        };
        assert_eq!(
            ids(&list(&conn, PostScope::Catalog, &combined).unwrap()),
            vec![music]
        );
    }

    #[test]
    fn filters_fold_non_ascii_case() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let emile = profile(&conn, "Émile");
        let other = profile(&conn, "other");
        let cafe = post(&conn, emile, "Café Über", &["Öl"]);
        post(&conn, other, "cafe uber", &["ol"]);

        for filter in [
            PostFilter {
                title: Some("CAFÉ ÜB".into()),
                ..Default::default()
            },
            PostFilter {
                author: Some("émi".into()),
                ..Default::default()
            },
            PostFilter {
                hashtag: Some("öl".into()),
                ..Default::default()
            },
        ] {
            let found = list(&conn, PostScope::Catalog, &filter).unwrap();
            assert_eq!(ids(&found), vec![cafe], "{:?}", filter);
        }
    }

    #[test]
    fn hashtag_filter_does_not_duplicate_posts() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "a");
        post(&conn, a, "p", &["sport", "sports"]);

        let filter = PostFilter {
            hashtag: Some("sport".into()),
            ..Default::default()
        };
        assert_eq!(list(&conn, PostScope::Catalog, &filter).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_hashtag_names_attach_once() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "a");
        let id = post(&conn, a, "p", &["box", "box"]);

        let tags = hashtags::for_post(&conn, id).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "box");
    }

    #[test]
    fn feed_only_shows_followed_authors() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let me = profile(&conn, "me");
        let p = profile(&conn, "p");
        let q = profile(&conn, "q");
        let p1 = post(&conn, p, "p1", &[]);
        let p2 = post(&conn, p, "p2", &[]);
        let q1 = post(&conn, q, "q1", &[]);
        profiles::follow(&conn, me, p).unwrap();

        let feed = list(&conn, PostScope::FollowedBy(me), &PostFilter::default()).unwrap();
        assert_eq!(ids(&feed), vec![p2, p1]);
        assert!(get(&conn, PostScope::FollowedBy(me), q1).unwrap().is_none());
        assert!(get(&conn, PostScope::FollowedBy(me), p1).unwrap().is_some());
    }

    #[test]
    fn like_toggle_is_its_own_inverse() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "a");
        let id = post(&conn, a, "p", &[]);

        for round in 0..5 {
            let outcome = toggle_like(&conn, id, a).unwrap();
            let expected = if round % 2 == 0 {
                LikeToggle::Liked
            } else {
                LikeToggle::Unliked
            };
            assert_eq!(outcome, expected);
            let count = get(&conn, PostScope::Catalog, id).unwrap().unwrap().like_count;
            assert!(count <= 1);
        }
        assert_eq!(likers(&conn, id).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn only_author_can_update_or_delete() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let a = profile(&conn, "a");
        let b = profile(&conn, "b");
        let id = post(&conn, a, "p", &[]);

        let fields = PostFields {
            title: "changed".into(),
            ..Default::default()
        };
        assert!(!update(&conn, b, id, &fields).unwrap());
        assert!(!delete(&conn, b, id).unwrap());
        assert!(update(&conn, a, id, &fields).unwrap());
        assert!(delete(&conn, a, id).unwrap());
        assert!(!exists(&conn, id).unwrap());
    }
}
