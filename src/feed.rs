//! Feed assembly: joins identity, content, and engagement into the
//! per-viewer home feed and the per-profile view.

use serde::Serialize;

use crate::db::models::{Post, User};
use crate::engagement::EngagementRepository;
use crate::error::AppResult;
use crate::posts::PostRepository;
use crate::state::DbPool;
use crate::users::UserRepository;

#[derive(Debug, Serialize)]
pub struct FeedComment {
    pub id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct FeedPost {
    pub id: i64,
    pub author: String,
    pub content: Option<String>,
    pub media_path: Option<String>,
    pub media_type: Option<String>,
    pub created_at: String,
    pub likes: i64,
    pub viewer_has_liked: bool,
    pub comments: Vec<FeedComment>,
}

/// Profile view: the user plus their posts, newest first. Comments and
/// per-viewer like flags are intentionally not attached here.
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub posts: Vec<Post>,
}

/// Every post, newest first, with author, full comment thread (oldest
/// first), and the viewer's like membership.
pub fn build_home_feed(pool: &DbPool, viewer_id: i64) -> AppResult<Vec<FeedPost>> {
    let posts = PostRepository::new(pool.clone());
    let engagement = EngagementRepository::new(pool.clone());

    let liked = engagement.liked_post_ids(viewer_id)?;

    let mut feed = Vec::new();
    for (post, author) in posts.list_all()? {
        let comments = engagement
            .list_comments(post.id)?
            .into_iter()
            .map(|(c, username)| FeedComment {
                id: c.id,
                author: username,
                content: c.content,
                created_at: c.created_at,
            })
            .collect();

        feed.push(FeedPost {
            viewer_has_liked: liked.contains(&post.id),
            id: post.id,
            author,
            content: post.content,
            media_path: post.media_path,
            media_type: post.media_type,
            created_at: post.created_at,
            likes: post.likes,
            comments,
        });
    }
    Ok(feed)
}

/// A user's public page: profile record plus their posts, newest first.
/// Fails NotFound when the username does not resolve.
pub fn build_profile(pool: &DbPool, username: &str) -> AppResult<ProfileView> {
    let users = UserRepository::new(pool.clone());
    let posts = PostRepository::new(pool.clone());

    let user = users.find_by_username(username)?;
    let posts = posts.list_by_author(user.id)?;
    Ok(ProfileView { user, posts })
}
