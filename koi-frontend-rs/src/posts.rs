//! The post repository: rows in, viewer-relative `Post` values out.
//!
//! Every public read or write here swallows store errors. A broken or
//! unconfigured store must never take the page down, so failures are logged
//! and the caller gets an empty list or `None`. Auth errors do not pass
//! through this layer and keep their own surfacing rules.

use std::collections::HashSet;

use chrono::DateTime;
use koi_utils::{Post, PostDraft, User};

use crate::store::{Marker, NewPostRow, PostRow, PostStore, StoreError};
use crate::supabase::default_avatar;

/// Render an RFC 3339 creation time as the display date the views show.
/// Unparseable values pass through untouched rather than failing the row.
fn format_created_at(created_at: &str) -> String {
    DateTime::parse_from_rfc3339(created_at)
        .map(|dt| dt.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

/// Project a row into a `Post` for a viewer whose marked post ids are in the
/// two sets. Anonymous viewers pass empty sets, so both flags stay false.
fn map_row(row: PostRow, liked: &HashSet<String>, bookmarked: &HashSet<String>) -> Post {
    let author_id = row.user_id.clone().unwrap_or_default();
    Post {
        is_liked: liked.contains(&row.id),
        is_bookmarked: bookmarked.contains(&row.id),
        author: User {
            avatar: default_avatar(&author_id),
            id: author_id,
            name: row.author,
            role: row.role.parse().unwrap_or_default(),
            email: None,
        },
        tag: row
            .tags
            .first()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default(),
        timestamp: format_created_at(&row.created_at),
        likes: row.likes.max(0) as u32,
        id: row.id,
        title: row.title,
        category: row.category,
        content: row.content,
        images: Vec::new(),
        comments: Vec::new(),
    }
}

pub struct PostRepository<S: PostStore> {
    store: S,
}

impl<S: PostStore> PostRepository<S> {
    pub fn new(store: S) -> PostRepository<S> {
        PostRepository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn viewer_markers(
        &self,
        viewer: Option<&str>,
    ) -> Result<(HashSet<String>, HashSet<String>), StoreError> {
        let Some(user_id) = viewer else {
            return Ok((HashSet::new(), HashSet::new()));
        };
        let liked = self
            .store
            .marked_post_ids(Marker::Like, user_id)
            .await?
            .into_iter()
            .collect();
        let bookmarked = self
            .store
            .marked_post_ids(Marker::Bookmark, user_id)
            .await?
            .into_iter()
            .collect();
        Ok((liked, bookmarked))
    }

    fn annotate(
        &self,
        rows: Vec<PostRow>,
        liked: &HashSet<String>,
        bookmarked: &HashSet<String>,
    ) -> Vec<Post> {
        rows.into_iter()
            .map(|row| map_row(row, liked, bookmarked))
            .collect()
    }

    async fn list_posts_inner(&self, viewer: Option<&str>) -> Result<Vec<Post>, StoreError> {
        let rows = self.store.fetch_posts().await?;
        let (liked, bookmarked) = self.viewer_markers(viewer).await?;
        Ok(self.annotate(rows, &liked, &bookmarked))
    }

    /// Newest-first feed with the viewer's flags filled in.
    pub async fn list_posts(&self, viewer: Option<&str>) -> Vec<Post> {
        self.list_posts_inner(viewer).await.unwrap_or_else(|err| {
            log::error!("failed to load posts: {err}");
            Vec::new()
        })
    }

    async fn list_posts_by_author_inner(&self, user_id: &str) -> Result<Vec<Post>, StoreError> {
        let rows = self.store.fetch_posts_by_author(user_id).await?;
        let (liked, bookmarked) = self.viewer_markers(Some(user_id)).await?;
        Ok(self.annotate(rows, &liked, &bookmarked))
    }

    pub async fn list_posts_by_author(&self, user_id: &str) -> Vec<Post> {
        self.list_posts_by_author_inner(user_id)
            .await
            .unwrap_or_else(|err| {
                log::error!("failed to load posts for {user_id}: {err}");
                Vec::new()
            })
    }

    async fn list_marked_inner(
        &self,
        marker: Marker,
        user_id: &str,
    ) -> Result<Vec<Post>, StoreError> {
        let ids = self.store.marked_post_ids(marker, user_id).await?;
        let rows = self.store.fetch_posts_by_ids(&ids).await?;
        let (liked, bookmarked) = self.viewer_markers(Some(user_id)).await?;
        Ok(self.annotate(rows, &liked, &bookmarked))
    }

    pub async fn list_liked_posts(&self, user_id: &str) -> Vec<Post> {
        self.list_marked_inner(Marker::Like, user_id)
            .await
            .unwrap_or_else(|err| {
                log::error!("failed to load liked posts: {err}");
                Vec::new()
            })
    }

    pub async fn list_bookmarked_posts(&self, user_id: &str) -> Vec<Post> {
        self.list_marked_inner(Marker::Bookmark, user_id)
            .await
            .unwrap_or_else(|err| {
                log::error!("failed to load bookmarked posts: {err}");
                Vec::new()
            })
    }

    /// Persist a draft for `author` and return the durable post. `None` means
    /// the write failed; the optimistic copy the feed already shows stays.
    pub async fn create_post(&self, draft: &PostDraft, author: &User) -> Option<Post> {
        let row = NewPostRow {
            title: draft.title.clone(),
            content: draft.content.clone(),
            category: draft.category.clone(),
            author: author.name.clone(),
            role: author.role.to_string(),
            tags: vec![draft.tag.to_string()],
            likes: 0,
            user_id: author.id.clone(),
        };
        match self.store.insert_post(&row).await {
            Ok(stored) => {
                let mut post = map_row(stored, &HashSet::new(), &HashSet::new());
                post.images = draft.images.clone();
                Some(post)
            }
            Err(err) => {
                log::error!("failed to create post: {err}");
                None
            }
        }
    }

    async fn toggle_like_inner(&self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        let was_liked = self
            .store
            .marker_exists(Marker::Like, user_id, post_id)
            .await?;
        if was_liked {
            self.store
                .remove_marker(Marker::Like, user_id, post_id)
                .await?;
        } else {
            self.store
                .add_marker(Marker::Like, user_id, post_id)
                .await?;
        }
        // Count maintenance is a separate read-modify-write; concurrent
        // toggles can drift it and the marker rows stay authoritative.
        let likes = self.store.fetch_likes(post_id).await?;
        let next = if was_liked { (likes - 1).max(0) } else { likes + 1 };
        self.store.store_likes(post_id, next).await?;
        Ok(!was_liked)
    }

    /// Flip the viewer's like. Returns the new liked state, or `None` when
    /// the store rejected some part of the exchange.
    pub async fn toggle_like(&self, user_id: &str, post_id: &str) -> Option<bool> {
        match self.toggle_like_inner(user_id, post_id).await {
            Ok(now_liked) => Some(now_liked),
            Err(err) => {
                log::error!("failed to toggle like on {post_id}: {err}");
                None
            }
        }
    }

    async fn toggle_bookmark_inner(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError> {
        let was_marked = self
            .store
            .marker_exists(Marker::Bookmark, user_id, post_id)
            .await?;
        if was_marked {
            self.store
                .remove_marker(Marker::Bookmark, user_id, post_id)
                .await?;
        } else {
            self.store
                .add_marker(Marker::Bookmark, user_id, post_id)
                .await?;
        }
        Ok(!was_marked)
    }

    pub async fn toggle_bookmark(&self, user_id: &str, post_id: &str) -> Option<bool> {
        match self.toggle_bookmark_inner(user_id, post_id).await {
            Ok(now_marked) => Some(now_marked),
            Err(err) => {
                log::error!("failed to toggle bookmark on {post_id}: {err}");
                None
            }
        }
    }

    pub async fn delete_post(&self, post_id: &str) {
        if let Err(err) = self.store.delete_post(post_id).await {
            log::error!("failed to delete post {post_id}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPostStore;
    use koi_utils::{PostTag, UserRole};

    fn senior() -> User {
        User {
            id: "u2".to_string(),
            name: "林長青".to_string(),
            role: UserRole::Senior,
            avatar: String::new(),
            email: None,
        }
    }

    fn draft(title: &str) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            content: "內容".to_string(),
            category: "varieties".to_string(),
            tag: PostTag::ExperienceShare,
            images: Vec::new(),
        }
    }

    fn repo() -> PostRepository<MemoryPostStore> {
        PostRepository::new(MemoryPostStore::new())
    }

    fn capture_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Store whose every operation fails, standing in for a dead backend.
    struct FailingStore;

    impl PostStore for FailingStore {
        async fn fetch_posts(&self) -> Result<Vec<PostRow>, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn fetch_posts_by_author(&self, _: &str) -> Result<Vec<PostRow>, StoreError> {
            self.fetch_posts().await
        }
        async fn fetch_posts_by_ids(&self, _: &[String]) -> Result<Vec<PostRow>, StoreError> {
            self.fetch_posts().await
        }
        async fn insert_post(&self, _: &NewPostRow) -> Result<PostRow, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn delete_post(&self, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn marker_exists(&self, _: Marker, _: &str, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn add_marker(&self, _: Marker, _: &str, _: &str) -> Result<(), StoreError> {
            self.delete_post("").await
        }
        async fn remove_marker(&self, _: Marker, _: &str, _: &str) -> Result<(), StoreError> {
            self.delete_post("").await
        }
        async fn marked_post_ids(&self, _: Marker, _: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn fetch_likes(&self, _: &str) -> Result<i64, StoreError> {
            Err(StoreError::Status {
                status: 500,
                body: "down".to_string(),
            })
        }
        async fn store_likes(&self, _: &str, _: i64) -> Result<(), StoreError> {
            self.delete_post("").await
        }
    }

    #[tokio::test]
    async fn created_posts_lead_the_feed_and_carry_the_author() {
        let repo = repo();
        repo.create_post(&draft("older"), &senior()).await.unwrap();
        let newest = repo.create_post(&draft("newer"), &senior()).await.unwrap();
        assert_eq!(newest.likes, 0);
        assert_eq!(newest.author.name, "林長青");
        assert_eq!(newest.author.role, UserRole::Senior);
        assert_eq!(newest.tag, PostTag::ExperienceShare);

        let posts = repo.list_posts(None).await;
        assert_eq!(posts[0].id, newest.id);
        assert_eq!(posts[0].title, "newer");
    }

    #[tokio::test]
    async fn flags_are_set_exactly_for_the_viewers_markers() {
        let repo = repo();
        let liked = repo.create_post(&draft("liked"), &senior()).await.unwrap();
        let plain = repo.create_post(&draft("plain"), &senior()).await.unwrap();
        repo.store().seed_marker(Marker::Like, "u2", &liked.id);
        repo.store().seed_marker(Marker::Bookmark, "u2", &plain.id);

        let posts = repo.list_posts(Some("u2")).await;
        let liked_view = posts.iter().find(|p| p.id == liked.id).unwrap();
        let plain_view = posts.iter().find(|p| p.id == plain.id).unwrap();
        assert!(liked_view.is_liked && !liked_view.is_bookmarked);
        assert!(!plain_view.is_liked && plain_view.is_bookmarked);

        // another viewer sees neither flag
        let other = repo.list_posts(Some("u9")).await;
        assert!(other.iter().all(|p| !p.is_liked && !p.is_bookmarked));
    }

    #[tokio::test]
    async fn toggling_twice_restores_marker_and_count() {
        let repo = repo();
        let post = repo.create_post(&draft("post"), &senior()).await.unwrap();

        assert_eq!(repo.toggle_like("u2", &post.id).await, Some(true));
        let posts = repo.list_posts(Some("u2")).await;
        assert!(posts[0].is_liked);
        assert_eq!(posts[0].likes, 1);

        assert_eq!(repo.toggle_like("u2", &post.id).await, Some(false));
        let posts = repo.list_posts(Some("u2")).await;
        assert!(!posts[0].is_liked);
        assert_eq!(posts[0].likes, 0);
    }

    #[tokio::test]
    async fn unliking_never_drives_the_count_negative() {
        let repo = repo();
        let post = repo.create_post(&draft("post"), &senior()).await.unwrap();
        // marker present but count already at zero
        repo.store().seed_marker(Marker::Like, "u2", &post.id);
        assert_eq!(repo.toggle_like("u2", &post.id).await, Some(false));
        assert_eq!(repo.list_posts(None).await[0].likes, 0);
    }

    #[tokio::test]
    async fn scoped_lists_follow_author_and_markers() {
        let repo = repo();
        let beginner = User {
            id: "u3".to_string(),
            name: "小王".to_string(),
            role: UserRole::Beginner,
            avatar: String::new(),
            email: None,
        };
        let mine = repo.create_post(&draft("mine"), &senior()).await.unwrap();
        let theirs = repo.create_post(&draft("theirs"), &beginner).await.unwrap();
        repo.toggle_like("u2", &theirs.id).await;
        repo.toggle_bookmark("u2", &mine.id).await;

        let authored = repo.list_posts_by_author("u2").await;
        assert_eq!(authored.len(), 1);
        assert_eq!(authored[0].id, mine.id);

        let liked = repo.list_liked_posts("u2").await;
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].id, theirs.id);
        assert!(liked[0].is_liked);

        let bookmarked = repo.list_bookmarked_posts("u2").await;
        assert_eq!(bookmarked.len(), 1);
        assert_eq!(bookmarked[0].id, mine.id);
        assert!(bookmarked[0].is_bookmarked);
    }

    #[tokio::test]
    async fn store_failures_degrade_to_empty_results() {
        capture_logs();
        let repo = PostRepository::new(FailingStore);
        assert!(repo.list_posts(Some("u2")).await.is_empty());
        assert!(repo.list_liked_posts("u2").await.is_empty());
        assert!(repo.create_post(&draft("post"), &senior()).await.is_none());
        assert!(repo.toggle_like("u2", "p1").await.is_none());
        assert!(repo.toggle_bookmark("u2", "p1").await.is_none());
        // delete just logs
        repo.delete_post("p1").await;
    }

    #[test]
    fn created_at_formats_to_a_display_date() {
        assert_eq!(format_created_at("2024-03-10T08:30:00+00:00"), "2024/03/10");
        assert_eq!(format_created_at("not a date"), "not a date");
    }
}
