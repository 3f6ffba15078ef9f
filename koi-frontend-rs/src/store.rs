//! Post storage: the PostgREST-backed store and an in-memory one for tests.
//!
//! Rows are the canonical shape; viewer-relative projection happens one layer
//! up in the repository. Like counts live denormalized on the post row and are
//! adjusted with a separate read-modify-write after the marker mutation, so
//! two racing toggles can drift the count. That drift is accepted; the count
//! is advisory, the marker rows are the ground truth.

use std::cell::RefCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::supabase::SupabaseConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store payload error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A `posts` table row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    /// Author display name, denormalized at insert time.
    pub author: String,
    /// Author role label, same treatment.
    pub role: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub likes: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: String,
}

/// What an insert sends; the store assigns `id` and `created_at`.
#[derive(Clone, Debug, Serialize)]
pub struct NewPostRow {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub role: String,
    pub tags: Vec<String>,
    pub likes: i64,
    pub user_id: String,
}

/// The two per-viewer marker tables. Both hold `(user_id, post_id)` pairs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Marker {
    Like,
    Bookmark,
}

impl Marker {
    pub fn table(self) -> &'static str {
        match self {
            Marker::Like => "post_likes",
            Marker::Bookmark => "bookmarks",
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait PostStore {
    /// All posts, newest first.
    async fn fetch_posts(&self) -> Result<Vec<PostRow>, StoreError>;
    async fn fetch_posts_by_author(&self, user_id: &str) -> Result<Vec<PostRow>, StoreError>;
    async fn fetch_posts_by_ids(&self, ids: &[String]) -> Result<Vec<PostRow>, StoreError>;
    /// Insert and return the durable row the store produced.
    async fn insert_post(&self, row: &NewPostRow) -> Result<PostRow, StoreError>;
    async fn delete_post(&self, post_id: &str) -> Result<(), StoreError>;

    async fn marker_exists(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError>;
    async fn add_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError>;
    async fn remove_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError>;
    /// Post ids the viewer has marked.
    async fn marked_post_ids(
        &self,
        marker: Marker,
        user_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn fetch_likes(&self, post_id: &str) -> Result<i64, StoreError>;
    async fn store_likes(&self, post_id: &str, likes: i64) -> Result<(), StoreError>;

    /// Rebind the viewer's access token after sign-in or sign-out. Stores
    /// without row policies ignore it.
    fn set_access_token(&self, _token: Option<String>) {}
}

async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Store backed by the PostgREST endpoints under `/rest/v1`.
///
/// A fresh `Postgrest` client is built per call so the Authorization header
/// always reflects the current session token.
pub struct SupabasePostStore {
    config: SupabaseConfig,
    access_token: RefCell<Option<String>>,
}

impl SupabasePostStore {
    pub fn new(config: SupabaseConfig) -> SupabasePostStore {
        SupabasePostStore {
            config,
            access_token: RefCell::new(None),
        }
    }

    fn client(&self) -> postgrest::Postgrest {
        let bearer = self
            .access_token
            .borrow()
            .clone()
            .unwrap_or_else(|| self.config.supabase_anon_key.clone());
        postgrest::Postgrest::new(format!("{}/rest/v1", self.config.supabase_url))
            .insert_header("apikey", &self.config.supabase_anon_key)
            .insert_header("Authorization", format!("Bearer {bearer}"))
    }
}

impl PostStore for SupabasePostStore {
    async fn fetch_posts(&self) -> Result<Vec<PostRow>, StoreError> {
        let response = self
            .client()
            .from("posts")
            .select("*")
            .order("created_at.desc")
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_posts_by_author(&self, user_id: &str) -> Result<Vec<PostRow>, StoreError> {
        let response = self
            .client()
            .from("posts")
            .select("*")
            .eq("user_id", user_id)
            .order("created_at.desc")
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_posts_by_ids(&self, ids: &[String]) -> Result<Vec<PostRow>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client()
            .from("posts")
            .select("*")
            .in_("id", ids)
            .order("created_at.desc")
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn insert_post(&self, row: &NewPostRow) -> Result<PostRow, StoreError> {
        let response = self
            .client()
            .from("posts")
            .insert(serde_json::to_string(row)?)
            .single()
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        Ok(response.json().await?)
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), StoreError> {
        let response = self
            .client()
            .from("posts")
            .delete()
            .eq("id", post_id)
            .execute()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    async fn marker_exists(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError> {
        let response = self
            .client()
            .from(marker.table())
            .select("post_id")
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(!rows.is_empty())
    }

    async fn add_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError> {
        let body = serde_json::json!({ "user_id": user_id, "post_id": post_id });
        let response = self
            .client()
            .from(marker.table())
            .insert(body.to_string())
            .execute()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    async fn remove_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .client()
            .from(marker.table())
            .delete()
            .eq("user_id", user_id)
            .eq("post_id", post_id)
            .execute()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    async fn marked_post_ids(
        &self,
        marker: Marker,
        user_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        #[derive(Deserialize)]
        struct MarkerRow {
            post_id: String,
        }
        let response = self
            .client()
            .from(marker.table())
            .select("post_id")
            .eq("user_id", user_id)
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        let rows: Vec<MarkerRow> = response.json().await?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    async fn fetch_likes(&self, post_id: &str) -> Result<i64, StoreError> {
        #[derive(Deserialize)]
        struct LikesRow {
            likes: i64,
        }
        let response = self
            .client()
            .from("posts")
            .select("likes")
            .eq("id", post_id)
            .single()
            .execute()
            .await?;
        let response = expect_ok(response).await?;
        let row: LikesRow = response.json().await?;
        Ok(row.likes)
    }

    async fn store_likes(&self, post_id: &str, likes: i64) -> Result<(), StoreError> {
        let response = self
            .client()
            .from("posts")
            .update(serde_json::json!({ "likes": likes }).to_string())
            .eq("id", post_id)
            .execute()
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    fn set_access_token(&self, token: Option<String>) {
        *self.access_token.borrow_mut() = token;
    }
}

#[derive(Default)]
struct MemoryInner {
    seq: u64,
    posts: Vec<(u64, PostRow)>,
    likes: BTreeSet<(String, String)>,
    bookmarks: BTreeSet<(String, String)>,
}

impl MemoryInner {
    fn markers(&mut self, marker: Marker) -> &mut BTreeSet<(String, String)> {
        match marker {
            Marker::Like => &mut self.likes,
            Marker::Bookmark => &mut self.bookmarks,
        }
    }
}

/// In-memory store with the same ordering and marker semantics as the real
/// one. Used by the engine tests.
#[derive(Default)]
pub struct MemoryPostStore {
    inner: RefCell<MemoryInner>,
}

impl MemoryPostStore {
    pub fn new() -> MemoryPostStore {
        MemoryPostStore::default()
    }

    /// Seed a marker directly, as if another session had written it.
    pub fn seed_marker(&self, marker: Marker, user_id: &str, post_id: &str) {
        let mut inner = self.inner.borrow_mut();
        inner
            .markers(marker)
            .insert((user_id.to_string(), post_id.to_string()));
    }
}

impl PostStore for MemoryPostStore {
    async fn fetch_posts(&self) -> Result<Vec<PostRow>, StoreError> {
        let inner = self.inner.borrow();
        let mut rows: Vec<(u64, PostRow)> = inner.posts.clone();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, r)| r).collect())
    }

    async fn fetch_posts_by_author(&self, user_id: &str) -> Result<Vec<PostRow>, StoreError> {
        let all = self.fetch_posts().await?;
        Ok(all
            .into_iter()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .collect())
    }

    async fn fetch_posts_by_ids(&self, ids: &[String]) -> Result<Vec<PostRow>, StoreError> {
        let all = self.fetch_posts().await?;
        Ok(all.into_iter().filter(|r| ids.contains(&r.id)).collect())
    }

    async fn insert_post(&self, row: &NewPostRow) -> Result<PostRow, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.seq += 1;
        let seq = inner.seq;
        let stored = PostRow {
            id: uuid::Uuid::new_v4().to_string(),
            title: row.title.clone(),
            content: row.content.clone(),
            category: row.category.clone(),
            author: row.author.clone(),
            role: row.role.clone(),
            tags: row.tags.clone(),
            likes: row.likes,
            user_id: Some(row.user_id.clone()),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        inner.posts.push((seq, stored.clone()));
        Ok(stored)
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.posts.retain(|(_, r)| r.id != post_id);
        inner.likes.retain(|(_, p)| p != post_id);
        inner.bookmarks.retain(|(_, p)| p != post_id);
        Ok(())
    }

    async fn marker_exists(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.borrow_mut();
        Ok(inner
            .markers(marker)
            .contains(&(user_id.to_string(), post_id.to_string())))
    }

    async fn add_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError> {
        self.seed_marker(marker, user_id, post_id);
        Ok(())
    }

    async fn remove_marker(
        &self,
        marker: Marker,
        user_id: &str,
        post_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .markers(marker)
            .remove(&(user_id.to_string(), post_id.to_string()));
        Ok(())
    }

    async fn marked_post_ids(
        &self,
        marker: Marker,
        user_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        Ok(inner
            .markers(marker)
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn fetch_likes(&self, post_id: &str) -> Result<i64, StoreError> {
        let inner = self.inner.borrow();
        inner
            .posts
            .iter()
            .find(|(_, r)| r.id == post_id)
            .map(|(_, r)| r.likes)
            .ok_or(StoreError::Status {
                status: 406,
                body: "no rows".to_string(),
            })
    }

    async fn store_likes(&self, post_id: &str, likes: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if let Some((_, row)) = inner.posts.iter_mut().find(|(_, r)| r.id == post_id) {
            row.likes = likes;
        }
        Ok(())
    }
}
