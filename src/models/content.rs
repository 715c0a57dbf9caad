use serde::{Deserialize, Serialize};

pub type ContentId = u64;
pub type EpisodeId = u64;

/// A list entry from `GET /api/contents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub release_date: Option<String>,
    /// Minutes, movies only.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub stream_links: Vec<StreamLink>,
    #[serde(default)]
    pub download_links: Vec<DownloadLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    #[serde(default)]
    pub content_id: ContentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub episode_number: u32,
    #[serde(default)]
    pub season_number: u32,
    #[serde(default)]
    pub video_path: String,
    /// Seconds.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamLink {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quality: String,
    pub url: String,
    #[serde(default, rename = "type")]
    pub link_type: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub episode_number: u32,
    #[serde(default)]
    pub season_number: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadLink {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quality: String,
    pub url: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub episode_number: u32,
    #[serde(default)]
    pub season_number: u32,
}

/// Body of `GET /api/contents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPage {
    pub contents: Vec<ContentSummary>,
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, rename = "pageSize")]
    pub page_size: Option<u32>,
}

/// Body of `GET /api/contents/{id}/episodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeList {
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub content: Option<Content>,
}
