//! The fixed demo dataset.
//!
//! Shown only when an unconfigured deployment has no rows and no signed-in
//! viewer, so a first visit is not an empty page. The comment trees here are
//! the only comments in the system: comments have no persistence path in this
//! revision and stay read-only.

use crate::{Comment, Post, PostTag, User, UserRole};

fn moderator() -> User {
    User {
        id: "u1".to_string(),
        name: "中島大輔".to_string(),
        role: UserRole::Moderator,
        avatar: "https://picsum.photos/seed/daisuke/100/100".to_string(),
        email: None,
    }
}

fn senior() -> User {
    User {
        id: "u2".to_string(),
        name: "林長青".to_string(),
        role: UserRole::Senior,
        avatar: "https://picsum.photos/seed/lin/100/100".to_string(),
        email: None,
    }
}

fn beginner() -> User {
    User {
        id: "u3".to_string(),
        name: "小王".to_string(),
        role: UserRole::Beginner,
        avatar: "https://picsum.photos/seed/wang/100/100".to_string(),
        email: None,
    }
}

pub fn demo_users() -> Vec<User> {
    vec![
        moderator(),
        senior(),
        beginner(),
        User {
            id: "u4".to_string(),
            name: "新潟錦鯉場".to_string(),
            role: UserRole::Producer,
            avatar: "https://picsum.photos/seed/farm/100/100".to_string(),
            email: None,
        },
    ]
}

pub fn demo_posts() -> Vec<Post> {
    vec![
        Post {
            id: "p1".to_string(),
            title: "【分享】紅白錦鯉的質地判斷標準與經驗談".to_string(),
            author: senior(),
            category: "management".to_string(),
            tag: PostTag::ExperienceShare,
            content: "春季氣溫回暖，是細菌最容易滋生的季節。建議各位魚友注意以下幾點：1. 逐步增加餵食量 2. 定期檢測氨氮數值 3. 過濾槽的大清洗...".to_string(),
            images: Vec::new(),
            timestamp: "2024/03/10".to_string(),
            comments: vec![
                Comment {
                    id: "c1".to_string(),
                    author: beginner(),
                    content: "請問氨氮數值多少算安全？我的池子剛做好一個月。".to_string(),
                    timestamp: "2024/03/10".to_string(),
                    likes: 3,
                    replies: vec![Comment {
                        id: "c1-1".to_string(),
                        author: senior(),
                        content: "新池建議壓在 0.25ppm 以下，穩定後以測不到為目標。".to_string(),
                        timestamp: "2024/03/11".to_string(),
                        likes: 8,
                        replies: Vec::new(),
                    }],
                },
                Comment {
                    id: "c2".to_string(),
                    author: moderator(),
                    content: "好文已置頂，春季管理是每年都該複習的功課。".to_string(),
                    timestamp: "2024/03/12".to_string(),
                    likes: 5,
                    replies: Vec::new(),
                },
            ],
            likes: 24,
            is_liked: false,
            is_bookmarked: false,
        },
        Post {
            id: "p2".to_string(),
            title: "第55屆全日本錦鯉品評會參賽心得".to_string(),
            author: moderator(),
            category: "competition".to_string(),
            tag: PostTag::CompetitionDiscuss,
            content: "這次有幸參加全日本品評會，見識到了許多頂級的紅白。特別是冠軍魚的體型，真的是教科書級別的...".to_string(),
            images: vec![
                "https://images.unsplash.com/photo-1544551763-77ef2d0cfc6c?auto=format&fit=crop&q=80&w=1000".to_string(),
            ],
            timestamp: "2024/02/28".to_string(),
            comments: Vec::new(),
            likes: 156,
            is_liked: false,
            is_bookmarked: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_posts_carry_a_read_only_comment_tree() {
        let posts = demo_posts();
        let first = &posts[0];
        assert_eq!(first.comments.len(), 2);
        assert_eq!(first.comments[0].replies.len(), 1);
        assert!(first.comments[0].replies[0].replies.is_empty());
    }

    #[test]
    fn demo_posts_never_claim_viewer_markers() {
        // The demo dataset stands in for an anonymous view, so no
        // viewer-relative flag may be set.
        assert!(demo_posts().iter().all(|p| !p.is_liked && !p.is_bookmarked));
    }
}
