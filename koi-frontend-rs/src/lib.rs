//! Client engine for the Koi Legacy forum.
//!
//! The host UI owns rendering only; everything stateful lives here. `Forum`
//! holds the feed and session behind `RefCell` because all calls arrive on
//! one logical timeline. The standing rule for every async method: never hold
//! a borrow across an `.await`.
//!
//! Writes are optimistic. Likes, bookmarks and deletes mutate the held state
//! before the store round-trips and the result of the remote write is not
//! folded back; the next full reload reconciles. Post creation is the one
//! write that does reconcile, swapping the provisional entry for the durable
//! row.

pub mod ai;
pub mod feed;
pub mod posts;
pub mod session;
pub mod store;
pub mod supabase;

use std::cell::RefCell;

use koi_utils::{Post, PostDraft, User};

use crate::ai::{AiError, GeminiClient};
use crate::feed::Feed;
use crate::posts::PostRepository;
use crate::session::{SessionListenerKey, SessionState};
use crate::store::PostStore;
use crate::supabase::{AuthClient, AuthError, AuthSession, SupabaseConfig};

pub struct Forum<S: PostStore> {
    feed: RefCell<Feed>,
    session: RefCell<SessionState>,
    repo: PostRepository<S>,
    auth: AuthClient,
    ai: Option<GeminiClient>,
}

impl<S: PostStore> Forum<S> {
    pub fn new(store: S, config: SupabaseConfig) -> Forum<S> {
        Forum {
            feed: RefCell::new(Feed::new()),
            session: RefCell::new(SessionState::new()),
            repo: PostRepository::new(store),
            auth: AuthClient::new(config),
            ai: GeminiClient::from_env().ok(),
        }
    }

    pub fn with_ai(mut self, client: GeminiClient) -> Forum<S> {
        self.ai = Some(client);
        self
    }

    /// Resolve a possibly-stored token into a session and load the feed.
    /// A token the auth service rejects degrades to the signed-out state.
    pub async fn init(&self, access_token: Option<String>) {
        let session = match access_token {
            Some(token) => match self.auth.current_user(&token).await {
                Ok(user) => Some(AuthSession {
                    access_token: token,
                    user,
                }),
                Err(err) => {
                    log::warn!("stored session did not restore: {err}");
                    None
                }
            },
            None => None,
        };
        self.handle_auth_change(session).await;
    }

    /// Install a new session (or none), rebind the store's token, and reload
    /// the feed so viewer-relative flags are recomputed.
    pub async fn handle_auth_change(&self, session: Option<AuthSession>) {
        let token = session.as_ref().map(|s| s.access_token.clone());
        self.repo.store().set_access_token(token);
        self.session.borrow_mut().set_session(session);
        self.load_posts().await;
    }

    pub async fn load_posts(&self) {
        self.feed.borrow_mut().begin_load();
        let (viewer, signed_in) = {
            let session = self.session.borrow();
            (session.user().map(|u| u.id.clone()), session.is_signed_in())
        };
        let fetched = self.repo.list_posts(viewer.as_deref()).await;
        self.feed.borrow_mut().finish_load(fetched, signed_in);
    }

    // --- feed reads, cloned snapshots for the host UI ---

    pub fn visible_posts(&self) -> Vec<Post> {
        self.feed.borrow().visible().into_iter().cloned().collect()
    }

    pub fn is_feed_loading(&self) -> bool {
        self.feed.borrow().is_loading()
    }

    pub fn set_category(&self, category: &str) {
        self.feed.borrow_mut().set_category(category);
    }

    pub fn set_search(&self, search: &str) {
        self.feed.borrow_mut().set_search(search);
    }

    pub fn select_post(&self, post_id: &str) -> bool {
        self.feed.borrow_mut().select(post_id)
    }

    pub fn clear_selection(&self) {
        self.feed.borrow_mut().clear_selection();
    }

    pub fn selected_post(&self) -> Option<Post> {
        self.feed.borrow().selected().cloned()
    }

    // --- writes ---

    /// Create a post optimistically. The draft appears at the head of the
    /// feed immediately under a provisional id; on a successful write the
    /// durable row replaces it. On failure the provisional copy stays until
    /// the next reload. Returns false when no one is signed in.
    pub async fn create_post(&self, draft: PostDraft) -> bool {
        let Some(author) = self.session.borrow().user().cloned() else {
            self.session.borrow_mut().open_auth_modal();
            return false;
        };
        let provisional_id = uuid::Uuid::new_v4().to_string();
        let provisional = Post {
            id: provisional_id.clone(),
            title: draft.title.clone(),
            author: author.clone(),
            category: draft.category.clone(),
            tag: draft.tag,
            content: draft.content.clone(),
            images: draft.images.clone(),
            timestamp: chrono::Utc::now().format("%Y/%m/%d").to_string(),
            comments: Vec::new(),
            likes: 0,
            is_liked: false,
            is_bookmarked: false,
        };
        self.feed.borrow_mut().insert_provisional(provisional);

        if let Some(saved) = self.repo.create_post(&draft, &author).await {
            self.feed.borrow_mut().confirm_created(&provisional_id, saved);
        }
        true
    }

    /// Flip the viewer's like on a post. The held state flips before the
    /// store write goes out; the write's outcome is not folded back. `None`
    /// means no one is signed in (the auth modal opens) or the post is not
    /// held.
    pub async fn toggle_like(&self, post_id: &str) -> Option<bool> {
        let Some(viewer) = self.session.borrow().user().map(|u| u.id.clone()) else {
            self.session.borrow_mut().open_auth_modal();
            return None;
        };
        let now_liked = self.feed.borrow_mut().toggle_like_local(post_id)?;
        let _ = self.repo.toggle_like(&viewer, post_id).await;
        Some(now_liked)
    }

    pub async fn toggle_bookmark(&self, post_id: &str) -> Option<bool> {
        let Some(viewer) = self.session.borrow().user().map(|u| u.id.clone()) else {
            self.session.borrow_mut().open_auth_modal();
            return None;
        };
        let now_marked = self.feed.borrow_mut().toggle_bookmark_local(post_id)?;
        let _ = self.repo.toggle_bookmark(&viewer, post_id).await;
        Some(now_marked)
    }

    /// Remove a post locally (clearing a matching selection) and then from
    /// the store.
    pub async fn delete_post(&self, post_id: &str) {
        self.feed.borrow_mut().remove_post(post_id);
        self.repo.delete_post(post_id).await;
    }

    // --- profile reads ---

    pub async fn my_posts(&self) -> Vec<Post> {
        let Some(viewer) = self.session.borrow().user().map(|u| u.id.clone()) else {
            return Vec::new();
        };
        self.repo.list_posts_by_author(&viewer).await
    }

    pub async fn liked_posts(&self) -> Vec<Post> {
        let Some(viewer) = self.session.borrow().user().map(|u| u.id.clone()) else {
            return Vec::new();
        };
        self.repo.list_liked_posts(&viewer).await
    }

    pub async fn bookmarked_posts(&self) -> Vec<Post> {
        let Some(viewer) = self.session.borrow().user().map(|u| u.id.clone()) else {
            return Vec::new();
        };
        self.repo.list_bookmarked_posts(&viewer).await
    }

    // --- auth ---

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self.auth.sign_in(email, password).await?;
        self.session.borrow_mut().close_auth_modal();
        self.handle_auth_change(Some(session)).await;
        Ok(())
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(), AuthError> {
        let session = self.auth.sign_up(email, password, full_name).await?;
        self.session.borrow_mut().close_auth_modal();
        self.handle_auth_change(Some(session)).await;
        Ok(())
    }

    /// Sign out locally even when the remote revocation fails.
    pub async fn sign_out(&self) {
        let token = self.session.borrow().access_token().map(str::to_string);
        if let Some(token) = token {
            if let Err(err) = self.auth.sign_out(&token).await {
                log::warn!("sign-out revocation failed: {err}");
            }
        }
        self.handle_auth_change(None).await;
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.borrow().user().cloned()
    }

    pub fn is_session_loading(&self) -> bool {
        self.session.borrow().is_loading()
    }

    pub fn open_auth_modal(&self) {
        self.session.borrow_mut().open_auth_modal();
    }

    pub fn close_auth_modal(&self) {
        self.session.borrow_mut().close_auth_modal();
    }

    pub fn is_auth_modal_open(&self) -> bool {
        self.session.borrow().is_auth_modal_open()
    }

    pub fn subscribe_session(
        &self,
        listener: Box<dyn Fn(Option<&User>)>,
    ) -> SessionListenerKey {
        self.session.borrow_mut().subscribe(listener)
    }

    pub fn unsubscribe_session(&self, key: SessionListenerKey) {
        self.session.borrow_mut().unsubscribe(key);
    }

    // --- ai ---

    pub async fn grade_photo(&self, image_bytes: &[u8]) -> Result<koi_utils::grading::GradingResult, AiError> {
        match &self.ai {
            Some(client) => client.grade_photo(image_bytes).await,
            None => Err(AiError::MissingApiKey),
        }
    }

    pub async fn explain_term(&self, term: &str) -> Result<String, AiError> {
        match &self.ai {
            Some(client) => client.explain_term(term).await,
            None => Err(AiError::MissingApiKey),
        }
    }
}
