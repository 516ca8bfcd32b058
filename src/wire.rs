//! Wire shapes: one flat struct per request or response body.
//!
//! Response structs are assembled from database rows by the `*_item` /
//! `*_detail` builders below. Request structs never carry server-owned
//! fields such as a post's or comment's author.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::models::{Comment, Hashtag, Post, Profile, User};
use crate::db::{comments, hashtags, posts, profiles};
use crate::error::AppResult;
use crate::validation::double_option;

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileListItem {
    pub id: i64,
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub user: UserSummary,
}

impl From<Profile> for ProfileListItem {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            nickname: p.nickname,
            bio: p.bio,
            profile_image: p.profile_image,
            user: UserSummary {
                id: p.user_id,
                email: p.email,
                first_name: p.first_name,
                last_name: p.last_name,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileDetail {
    pub id: i64,
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub user: UserSummary,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts: Vec<PostListItem>,
}

/// Restricted shape echoed after a "my profile" write.
#[derive(Debug, Serialize)]
pub struct MyProfileOut {
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub user: UserSummary,
}

impl From<Profile> for MyProfileOut {
    fn from(p: Profile) -> Self {
        let item = ProfileListItem::from(p);
        Self {
            nickname: item.nickname,
            bio: item.bio,
            profile_image: item.profile_image,
            user: item.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyProfileDetail {
    pub id: i64,
    pub nickname: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub user: UserSummary,
    pub posts: Vec<MyProfilePost>,
}

#[derive(Debug, Serialize)]
pub struct MyProfilePost {
    pub id: i64,
    pub title: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub hashtags: Vec<Hashtag>,
    pub comments: Vec<PostComment>,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: i64,
    pub title: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub author: String,
    pub hashtags: Vec<String>,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct PostAuthor {
    pub id: i64,
    pub nickname: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub title: String,
    pub text: Option<String>,
    pub image: Option<String>,
    pub created_at: String,
    pub author: PostAuthor,
    pub hashtags: Vec<Hashtag>,
    pub liked_by: Vec<String>,
    pub comments: Vec<PostComment>,
    pub like_count: i64,
}

/// A comment nested under its post.
#[derive(Debug, Serialize)]
pub struct PostComment {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

impl From<Comment> for PostComment {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            author: c.author_nickname,
            text: c.text,
            created_at: c.created_at,
        }
    }
}

/// A comment on its own, carrying its post reference.
#[derive(Debug, Serialize)]
pub struct CommentOut {
    pub id: i64,
    pub post: i64,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

impl From<Comment> for CommentOut {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            post: c.post_id,
            author: c.author_nickname,
            text: c.text,
            created_at: c.created_at,
        }
    }
}

// --- Builders ---

pub fn post_list_item(conn: &Connection, post: Post) -> AppResult<PostListItem> {
    let hashtags = hashtags::for_post(conn, post.id)?
        .into_iter()
        .map(|h| h.name)
        .collect();
    Ok(PostListItem {
        id: post.id,
        title: post.title,
        text: post.text,
        image: post.image,
        created_at: post.created_at,
        author: post.author_nickname,
        hashtags,
        like_count: post.like_count,
    })
}

pub fn post_list(conn: &Connection, posts: Vec<Post>) -> AppResult<Vec<PostListItem>> {
    posts
        .into_iter()
        .map(|p| post_list_item(conn, p))
        .collect()
}

pub fn post_detail(conn: &Connection, post: Post) -> AppResult<PostDetail> {
    Ok(PostDetail {
        hashtags: hashtags::for_post(conn, post.id)?,
        liked_by: posts::likers(conn, post.id)?,
        comments: comments::for_post(conn, post.id)?
            .into_iter()
            .map(PostComment::from)
            .collect(),
        id: post.id,
        title: post.title,
        text: post.text,
        image: post.image,
        created_at: post.created_at,
        author: PostAuthor {
            id: post.author_id,
            nickname: post.author_nickname,
            profile_image: post.author_image,
        },
        like_count: post.like_count,
    })
}

pub fn profile_detail(conn: &Connection, profile: Profile) -> AppResult<ProfileDetail> {
    let (followers_count, following_count) = profiles::follow_counts(conn, profile.id)?;
    let authored = posts::list(
        conn,
        posts::PostScope::AuthoredBy(profile.id),
        &posts::PostFilter::default(),
    )?;
    let posts = post_list(conn, authored)?;
    let item = ProfileListItem::from(profile);
    Ok(ProfileDetail {
        id: item.id,
        nickname: item.nickname,
        bio: item.bio,
        profile_image: item.profile_image,
        user: item.user,
        followers_count,
        following_count,
        posts,
    })
}

pub fn my_profile_detail(conn: &Connection, profile: Profile) -> AppResult<MyProfileDetail> {
    let authored = posts::list(
        conn,
        posts::PostScope::AuthoredBy(profile.id),
        &posts::PostFilter::default(),
    )?;
    let posts = authored
        .into_iter()
        .map(|post| {
            Ok(MyProfilePost {
                hashtags: hashtags::for_post(conn, post.id)?,
                comments: comments::for_post(conn, post.id)?
                    .into_iter()
                    .map(PostComment::from)
                    .collect(),
                id: post.id,
                title: post.title,
                text: post.text,
                image: post.image,
                created_at: post.created_at,
                like_count: post.like_count,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    let item = ProfileListItem::from(profile);
    Ok(MyProfileDetail {
        id: item.id,
        nickname: item.nickname,
        bio: item.bio,
        profile_image: item.profile_image,
        user: item.user,
        posts,
    })
}

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NestedUserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyProfilePayload {
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub profile_image: Option<Option<String>>,
    pub user: Option<NestedUserPatch>,
}

#[derive(Debug, Deserialize)]
pub struct HashtagPayload {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostPayload {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub text: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    pub hashtags: Option<Vec<HashtagPayload>>,
}

#[derive(Debug, Deserialize)]
pub struct CommentCreate {
    pub post: Option<i64>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdate {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub post_id: Option<i64>,
}
