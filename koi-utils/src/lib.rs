//! Shared domain types for the Koi Legacy forum.
//!
//! Everything here is plain data: the engine crate and the TS frontend both
//! consume these shapes, so they carry `tsify` derives and serialize with the
//! same field names the web client always used.

pub mod demo;
pub mod filter;
pub mod grading;

use serde::{Deserialize, Serialize};

/// Member role, shown as a badge next to the author name. Roles are purely
/// cosmetic in this layer; authorization lives in the store's row policies.
///
/// The store keeps the Traditional-Chinese labels as the wire values, so the
/// serde names and the display form are the same string.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    tsify::Tsify,
    parse_display::Display,
    parse_display::FromStr,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum UserRole {
    #[serde(rename = "新手")]
    #[display("新手")]
    Beginner,
    #[default]
    #[serde(rename = "一般會員")]
    #[display("一般會員")]
    Member,
    #[serde(rename = "資深玩家")]
    #[display("資深玩家")]
    Senior,
    #[serde(rename = "認證生產者")]
    #[display("認證生產者")]
    Producer,
    #[serde(rename = "管理員")]
    #[display("管理員")]
    Moderator,
}

/// Post tag, one per post. Stored as the first element of the row's `tags`
/// array; unknown strings degrade to the general tag.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    tsify::Tsify,
    parse_display::Display,
    parse_display::FromStr,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum PostTag {
    #[serde(rename = "新手提問")]
    #[display("新手提問")]
    BeginnerQa,
    #[serde(rename = "經驗分享")]
    #[display("經驗分享")]
    ExperienceShare,
    #[serde(rename = "比賽討論")]
    #[display("比賽討論")]
    CompetitionDiscuss,
    #[default]
    #[serde(rename = "一般交流")]
    #[display("一般交流")]
    General,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: UserRole,
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A comment and its nested replies. Comments are read-only in this revision:
/// they come from the demo dataset only, and no create/update path exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Comment {
    pub id: String,
    pub author: User,
    pub content: String,
    pub timestamp: String,
    pub likes: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

/// A forum post as the views consume it.
///
/// `is_liked` and `is_bookmarked` are viewer-relative projections computed at
/// fetch time from the viewer's marker rows; they are never stored on the
/// canonical row. `likes >= 0` holds by construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: User,
    pub category: String,
    pub tag: PostTag,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Display date, e.g. "2024/03/10".
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    pub likes: u32,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
}

/// What the compose form produces. The engine fills in the author, the
/// provisional id and the timestamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub category: String,
    pub tag: PostTag,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// The fixed board catalog.
pub fn categories() -> Vec<Category> {
    [
        ("basics", "新手入門", "養鯉基礎、名詞解釋", "🌱"),
        ("management", "飼養與池子管理", "水質、濾材、疾病", "💧"),
        ("varieties", "品種討論", "紅白、昭和、三色", "🐟"),
        ("competition", "錦鯉比賽專區", "品評會資訊、觀賽討論", "🏆"),
        ("ai-tech", "AI 品評與科技", "智慧輔助、影像分析", "🤖"),
        ("gallery", "圖片分享區", "美魚賞析", "🖼️"),
        ("community", "閒聊交流", "社群互動", "💬"),
    ]
    .into_iter()
    .map(|(id, name, description, icon)| Category {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}
