//! Feed state: the held post list, selection, filters and the optimistic
//! local mutations the engine applies before a write round-trips.
//!
//! The selected post is a copy of its list entry, so local mutations touch
//! both or the detail view would lag the list.

use koi_utils::filter::FeedFilter;
use koi_utils::{Post, demo};

#[derive(Default)]
pub struct Feed {
    posts: Vec<Post>,
    selected: Option<Post>,
    filter: FeedFilter,
    loading: bool,
}

fn flip_like(post: &mut Post) -> bool {
    if post.is_liked {
        post.is_liked = false;
        post.likes = post.likes.saturating_sub(1);
    } else {
        post.is_liked = true;
        post.likes += 1;
    }
    post.is_liked
}

impl Feed {
    pub fn new() -> Feed {
        Feed::default()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    /// Install a fetch result. An empty result with no signed-in viewer falls
    /// back to the demo dataset with its counts zeroed; an empty result for a
    /// signed-in viewer is shown as-is, because their store is simply empty.
    pub fn finish_load(&mut self, fetched: Vec<Post>, signed_in: bool) {
        self.posts = if fetched.is_empty() && !signed_in {
            demo::demo_posts()
                .into_iter()
                .map(|p| Post { likes: 0, ..p })
                .collect()
        } else {
            fetched
        };
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// The held list projected through the active filter. Never mutates the
    /// held list.
    pub fn visible(&self) -> Vec<&Post> {
        self.posts.iter().filter(|p| self.filter.matches(p)).collect()
    }

    pub fn set_category(&mut self, category: &str) {
        self.filter.category = category.to_string();
    }

    pub fn set_search(&mut self, search: &str) {
        self.filter.search = search.to_string();
    }

    pub fn filter(&self) -> &FeedFilter {
        &self.filter
    }

    pub fn selected(&self) -> Option<&Post> {
        self.selected.as_ref()
    }

    /// Select by id. Selection only changes when the post is actually held.
    pub fn select(&mut self, post_id: &str) -> bool {
        match self.posts.iter().find(|p| p.id == post_id) {
            Some(post) => {
                self.selected = Some(post.clone());
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Show a not-yet-persisted post at the head of the feed.
    pub fn insert_provisional(&mut self, post: Post) {
        self.posts.insert(0, post);
    }

    /// Replace the provisional entry with the durable row the store returned.
    /// The durable post goes to the head regardless of where the provisional
    /// one sat.
    pub fn confirm_created(&mut self, provisional_id: &str, saved: Post) {
        self.posts.retain(|p| p.id != provisional_id);
        self.posts.insert(0, saved);
    }

    pub fn toggle_like_local(&mut self, post_id: &str) -> Option<bool> {
        let now_liked = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(flip_like)?;
        if let Some(selected) = self.selected.as_mut().filter(|p| p.id == post_id) {
            selected.is_liked = now_liked;
            selected.likes = if now_liked {
                selected.likes + 1
            } else {
                selected.likes.saturating_sub(1)
            };
        }
        Some(now_liked)
    }

    pub fn toggle_bookmark_local(&mut self, post_id: &str) -> Option<bool> {
        let post = self.posts.iter_mut().find(|p| p.id == post_id)?;
        post.is_bookmarked = !post.is_bookmarked;
        let now_marked = post.is_bookmarked;
        if let Some(selected) = self.selected.as_mut().filter(|p| p.id == post_id) {
            selected.is_bookmarked = now_marked;
        }
        Some(now_marked)
    }

    /// Drop a post locally and clear the selection if it pointed at it.
    pub fn remove_post(&mut self, post_id: &str) {
        self.posts.retain(|p| p.id != post_id);
        if self.selected.as_ref().is_some_and(|p| p.id == post_id) {
            self.selected = None;
        }
    }
}
