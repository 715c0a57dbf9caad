use serde::{Deserialize, Serialize};

use super::{Content, ContentId, Episode, EpisodeId};

/// Body of `POST /api/watch-history`. Progress is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub content_id: ContentId,
    pub episode_id: Option<EpisodeId>,
    pub progress: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchHistory {
    pub id: u64,
    #[serde(default)]
    pub user_id: u64,
    pub content_id: ContentId,
    #[serde(default)]
    pub episode_id: Option<EpisodeId>,
    #[serde(default)]
    pub watch_progress: u32,
    #[serde(default)]
    pub watched_at: Option<String>,
    #[serde(default)]
    pub completed_watch: bool,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub episode: Option<Episode>,
}

/// Body of `GET /api/watch-history/user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub history: Vec<WatchHistory>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_update_uses_camel_case() {
        let body = serde_json::to_value(ProgressUpdate {
            content_id: 4,
            episode_id: Some(9),
            progress: 120,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "contentId": 4, "episodeId": 9, "progress": 120 })
        );
    }
}
