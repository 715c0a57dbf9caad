use std::sync::{Arc, RwLock};

use serde::de::IgnoredAny;
use tracing::{debug, info};

use super::{GENERIC_ERROR, InFlight, Sequencer, content::Pagination, read, write};
use crate::{
    error::ApiError,
    http::ApiClient,
    models::{ContentId, EpisodeId, HistoryPage, WatchHistory},
};

pub const DEFAULT_CONTINUE_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryState {
    pub entries: Vec<WatchHistory>,
    pub continue_watching: Vec<WatchHistory>,
    pub current_progress: Option<WatchHistory>,
    pub pagination: Pagination,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct Slots {
    entries: Sequencer,
    progress: Sequencer,
    continue_watching: Sequencer,
}

/// The signed-in user's viewing history.
#[derive(Clone)]
pub struct HistoryStore {
    api: Arc<ApiClient>,
    state: Arc<RwLock<HistoryState>>,
    slots: Arc<Slots>,
    in_flight: InFlight,
}

impl HistoryStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(HistoryState::default())),
            slots: Arc::new(Slots::default()),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        write(&self.state).pagination = Pagination::new(page_size);
        self
    }

    pub fn state(&self) -> HistoryState {
        let mut state = read(&self.state).clone();
        state.loading = self.in_flight.is_active();
        state
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    pub fn set_page(&self, page: u32) {
        write(&self.state).pagination.page = page.max(1);
    }

    /// Saved progress for a content or one of its episodes. A missing
    /// record is not an error.
    pub async fn fetch_progress(
        &self,
        content_id: ContentId,
        episode_id: Option<EpisodeId>,
    ) -> Result<Option<WatchHistory>, ApiError> {
        let ticket = self.slots.progress.issue();
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        let query = episode_id
            .map(|id| vec![("episodeId", id.to_string())])
            .unwrap_or_default();

        let result = match self
            .api
            .get_json::<WatchHistory>(&format!("/api/watch-history/content/{content_id}"), query)
            .await
        {
            Ok(progress) => Ok(Some(progress)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        };

        if self.slots.progress.is_current(ticket) {
            let mut state = write(&self.state);
            match &result {
                Ok(progress) => state.current_progress = progress.clone(),
                Err(err) => state.error = Some(describe(err)),
            }
        }
        result
    }

    pub async fn fetch_history(&self) -> Result<(), ApiError> {
        let ticket = self.slots.entries.issue();
        let _loading = self.in_flight.begin();

        let query = {
            let mut state = write(&self.state);
            state.error = None;
            state.pagination.query()
        };

        let result = self
            .api
            .get_json::<HistoryPage>("/api/watch-history/user", query)
            .await;

        if !self.slots.entries.is_current(ticket) {
            debug!(slot = "entries", "discarding_superseded_response");
            return result.map(|_| ());
        }

        let mut state = write(&self.state);
        match result {
            Ok(page) => {
                debug!(count = page.history.len(), total = page.total, "history_fetched");
                state.entries = page.history;
                state.pagination.total = page.total;
                Ok(())
            }
            Err(err) => {
                state.error = Some(describe(&err));
                Err(err)
            }
        }
    }

    pub async fn fetch_continue_watching(&self, limit: u32) -> Result<(), ApiError> {
        let ticket = self.slots.continue_watching.issue();
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        let result = self
            .api
            .get_json::<Vec<WatchHistory>>(
                "/api/watch-history/continue-watching",
                vec![("limit", limit.max(1).to_string())],
            )
            .await;

        if !self.slots.continue_watching.is_current(ticket) {
            return result.map(|_| ());
        }

        let mut state = write(&self.state);
        match result {
            Ok(entries) => {
                state.continue_watching = entries;
                Ok(())
            }
            Err(err) => {
                state.error = Some(describe(&err));
                Err(err)
            }
        }
    }

    pub async fn delete_entry(&self, id: u64) -> Result<(), ApiError> {
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        match self
            .api
            .delete_json::<IgnoredAny>(&format!("/api/watch-history/{id}"))
            .await
        {
            Ok(_) => {
                let mut state = write(&self.state);
                let before = state.entries.len();
                state.entries.retain(|entry| entry.id != id);
                if state.entries.len() < before {
                    state.pagination.total = state.pagination.total.saturating_sub(1);
                }
                state.continue_watching.retain(|entry| entry.id != id);
                if state.current_progress.as_ref().is_some_and(|p| p.id == id) {
                    state.current_progress = None;
                }
                info!(id, "history_entry_deleted");
                Ok(())
            }
            Err(err) => {
                write(&self.state).error = Some(describe(&err));
                Err(err)
            }
        }
    }
}

fn describe(err: &ApiError) -> String {
    err.server_error()
        .or_else(|| err.server_message())
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}
