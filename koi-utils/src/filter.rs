//! Feed filtering: a pure projection over the held post list.

use serde::{Deserialize, Serialize};

use crate::Post;

/// The category id that selects every board.
pub const ALL_CATEGORIES: &str = "all";

/// Active feed filters: a category id plus a case-insensitive search over
/// title and body. Filtering never mutates the held list; it is recomputed on
/// every render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct FeedFilter {
    pub category: String,
    pub search: String,
}

impl Default for FeedFilter {
    fn default() -> Self {
        FeedFilter {
            category: ALL_CATEGORIES.to_string(),
            search: String::new(),
        }
    }
}

impl FeedFilter {
    pub fn matches(&self, post: &Post) -> bool {
        let category_ok = self.category == ALL_CATEGORIES || post.category == self.category;
        let needle = self.search.to_lowercase();
        let search_ok = post.title.to_lowercase().contains(&needle)
            || post.content.to_lowercase().contains(&needle);
        category_ok && search_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_posts;

    #[test]
    fn all_category_matches_everything() {
        let filter = FeedFilter::default();
        assert!(demo_posts().iter().all(|p| filter.matches(p)));
    }

    #[test]
    fn category_filter_narrows_the_list() {
        let filter = FeedFilter {
            category: "competition".to_string(),
            search: String::new(),
        };
        let posts = demo_posts();
        let visible: Vec<_> = posts.iter().filter(|p| filter.matches(p)).collect();
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|p| p.category == "competition"));
        assert!(visible.len() < posts.len());
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_body() {
        let mut post = demo_posts().remove(0);
        post.title = "Kohaku Quality Notes".to_string();
        post.content = "Sumi placement matters".to_string();

        let by_title = FeedFilter {
            category: ALL_CATEGORIES.to_string(),
            search: "kohaku".to_string(),
        };
        let by_body = FeedFilter {
            category: ALL_CATEGORIES.to_string(),
            search: "SUMI".to_string(),
        };
        let miss = FeedFilter {
            category: ALL_CATEGORIES.to_string(),
            search: "shiro utsuri".to_string(),
        };
        assert!(by_title.matches(&post));
        assert!(by_body.matches(&post));
        assert!(!miss.matches(&post));
    }

    #[test]
    fn category_and_search_intersect() {
        let posts = demo_posts();
        let filter = FeedFilter {
            category: posts[0].category.clone(),
            search: "nothing matches this".to_string(),
        };
        assert!(posts.iter().all(|p| !filter.matches(p)));
    }
}
