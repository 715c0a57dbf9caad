use std::sync::{Arc, Mutex, PoisonError, RwLock};

use flume::Sender;
use serde::de::IgnoredAny;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{GENERIC_ERROR, InFlight, Sequencer, Ticket, read, write};
use crate::{
    config::DEFAULT_PAGE_SIZE,
    error::ApiError,
    event::events::Event,
    http::{ApiClient, VideoFile},
    models::{
        Category, Content, ContentId, ContentPage, ContentSummary, Episode, EpisodeId,
        EpisodeList, Genre, ProgressUpdate,
    },
    util::task::TaskManager,
};

const REFRESH_TASK: &str = "contents";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilters {
    pub content_type: Option<String>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ContentFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge(&mut self, patch: FilterPatch) {
        if let Some(value) = patch.content_type {
            self.content_type = value;
        }
        if let Some(value) = patch.genre {
            self.genre = value;
        }
        if let Some(value) = patch.category {
            self.category = value;
        }
        if let Some(value) = patch.search {
            self.search = value;
        }
    }

    /// Query pairs for the filters that are set; blank values are omitted.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        [
            ("type", &self.content_type),
            ("genre", &self.genre),
            ("category", &self.category),
            ("search", &self.search),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.to_string()))
        })
        .collect()
    }
}

/// A partial update to [`ContentFilters`]. An outer `None` leaves the field
/// untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub content_type: Option<Option<String>>,
    pub genre: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub search: Option<Option<String>>,
}

impl FilterPatch {
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(Some(value.into()));
        self
    }

    pub fn genre(mut self, value: impl Into<String>) -> Self {
        self.genre = Some(Some(value.into()));
        self
    }

    pub fn category(mut self, value: impl Into<String>) -> Self {
        self.category = Some(Some(value.into()));
        self
    }

    pub fn search(mut self, value: impl Into<String>) -> Self {
        self.search = Some(Some(value.into()));
        self
    }

    pub fn clear_content_type(mut self) -> Self {
        self.content_type = Some(None);
        self
    }

    pub fn clear_genre(mut self) -> Self {
        self.genre = Some(None);
        self
    }

    pub fn clear_category(mut self) -> Self {
        self.category = Some(None);
        self
    }

    pub fn clear_search(mut self) -> Self {
        self.search = Some(None);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    /// As reported by the last successful list response.
    pub total: u64,
}

impl Pagination {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total: 0,
        }
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < self.total
    }

    /// The page after this one, if the total says there is one.
    pub fn next_page(&self) -> Option<u32> {
        self.page.checked_add(1).filter(|_| self.has_next_page())
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentState {
    pub contents: Vec<ContentSummary>,
    pub current_content: Option<Content>,
    pub current_episode: Option<Episode>,
    pub episodes: Vec<Episode>,
    pub genres: Vec<Genre>,
    pub categories: Vec<Category>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: ContentFilters,
    pub pagination: Pagination,
}

impl ContentState {
    pub fn has_next_page(&self) -> bool {
        self.pagination.has_next_page()
    }
}

#[derive(Debug, Default)]
struct Slots {
    contents: Sequencer,
    content: Sequencer,
    episode: Sequencer,
    episodes: Sequencer,
}

/// Catalog browsing state: the filtered page of contents, the selected
/// content and episode, and the lookup lists that drive the filters.
///
/// Every state-replacing fetch is sequenced per slot; a response that
/// arrives after a newer request for the same slot was issued is dropped.
#[derive(Clone)]
pub struct ContentStore {
    api: Arc<ApiClient>,
    state: Arc<RwLock<ContentState>>,
    slots: Arc<Slots>,
    in_flight: InFlight,
    tasks: Arc<Mutex<TaskManager>>,
    event_tx: Option<Sender<Event>>,
}

impl ContentStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(ContentState::default())),
            slots: Arc::new(Slots::default()),
            in_flight: InFlight::default(),
            tasks: Arc::new(Mutex::new(TaskManager::new())),
            event_tx: None,
        }
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        write(&self.state).pagination = Pagination::new(page_size);
        self
    }

    pub fn with_events(mut self, event_tx: Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn state(&self) -> ContentState {
        let mut state = read(&self.state).clone();
        state.loading = self.in_flight.is_active();
        state
    }

    pub fn contents(&self) -> Vec<ContentSummary> {
        read(&self.state).contents.clone()
    }

    pub fn current_content(&self) -> Option<Content> {
        read(&self.state).current_content.clone()
    }

    pub fn current_episode(&self) -> Option<Episode> {
        read(&self.state).current_episode.clone()
    }

    pub fn filters(&self) -> ContentFilters {
        read(&self.state).filters.clone()
    }

    pub fn pagination(&self) -> Pagination {
        read(&self.state).pagination
    }

    pub fn has_next_page(&self) -> bool {
        read(&self.state).has_next_page()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_active()
    }

    pub fn error(&self) -> Option<String> {
        read(&self.state).error.clone()
    }

    pub async fn fetch_contents(&self) -> Result<(), ApiError> {
        let ticket = self.slots.contents.issue();
        let _loading = self.in_flight.begin();

        let query = {
            let mut state = write(&self.state);
            state.error = None;
            let mut query = state.pagination.query();
            query.extend(state.filters.query());
            query
        };

        match self.api.get_json::<ContentPage>("/api/contents", query).await {
            Ok(page) => {
                if !self.accept(&self.slots.contents, ticket, "contents") {
                    return Ok(());
                }
                let (count, total) = (page.contents.len(), page.total);
                {
                    let mut state = write(&self.state);
                    state.contents = page.contents;
                    state.pagination.total = page.total;
                }
                debug!(count, total, "contents_fetched");
                self.emit(Event::ContentsFetched { count, total });
                Ok(())
            }
            Err(err) => {
                self.fail(&self.slots.contents, ticket, message_or_generic(&err));
                Err(err)
            }
        }
    }

    /// Failures are reported through [`ContentStore::error`] only. A missing
    /// or zero id clears the selection and supersedes any detail fetch
    /// still in flight.
    pub async fn fetch_content_by_id(&self, id: Option<ContentId>) {
        let ticket = self.slots.content.issue();
        let Some(id) = id.filter(|id| *id != 0) else {
            error!(id = ?id, "Invalid content ID");
            let mut state = write(&self.state);
            state.current_content = None;
            state.error = Some("Invalid content ID".to_string());
            return;
        };

        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        debug!(content_id = id, "fetching_content");

        match self
            .api
            .get_json::<Content>(&format!("/api/contents/{id}"), Vec::new())
            .await
        {
            Ok(content) => {
                if !self.accept(&self.slots.content, ticket, "current_content") {
                    return;
                }
                info!(content_id = content.id, title = content.title.as_str(), "content_fetched");
                write(&self.state).current_content = Some(content.clone());
                self.emit(Event::ContentFetched(content));
            }
            Err(err) => {
                error!(content_id = id, status = ?err.status(), "Error fetching content: {err}");
                if self.slots.content.is_current(ticket) {
                    let message = err
                        .server_error()
                        .map(str::to_string)
                        .unwrap_or_else(|| err.to_string());
                    let mut state = write(&self.state);
                    state.current_content = None;
                    state.error = Some(message.clone());
                    drop(state);
                    self.emit(Event::FetchError(message));
                }
            }
        }
    }

    pub async fn fetch_episode_by_id(
        &self,
        content_id: ContentId,
        episode_id: EpisodeId,
    ) -> Result<(), ApiError> {
        let path = format!("/api/contents/{content_id}/episodes/{episode_id}");
        self.load_episode(content_id, &path, Vec::new()).await
    }

    /// The episode following `season`/`episode` of a series.
    pub async fn fetch_next_episode(
        &self,
        content_id: ContentId,
        season: u32,
        episode: u32,
    ) -> Result<(), ApiError> {
        let path = format!("/api/contents/{content_id}/episodes/next");
        let query = vec![("season", season.to_string()), ("episode", episode.to_string())];
        self.load_episode(content_id, &path, query).await
    }

    async fn load_episode(
        &self,
        content_id: ContentId,
        path: &str,
        query: Vec<(&str, String)>,
    ) -> Result<(), ApiError> {
        let ticket = self.slots.episode.issue();
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        match self.api.get_json::<Episode>(path, query).await {
            Ok(episode) => {
                if self.accept(&self.slots.episode, ticket, "current_episode") {
                    debug!(content_id, episode_id = episode.id, "episode_fetched");
                    write(&self.state).current_episode = Some(episode.clone());
                    self.emit(Event::EpisodeFetched(content_id, episode));
                }
                Ok(())
            }
            Err(err) => {
                self.fail(&self.slots.episode, ticket, message_or_generic(&err));
                Err(err)
            }
        }
    }

    pub async fn fetch_episodes(&self, content_id: ContentId) -> Result<(), ApiError> {
        let ticket = self.slots.episodes.issue();
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        match self
            .api
            .get_json::<EpisodeList>(&format!("/api/contents/{content_id}/episodes"), Vec::new())
            .await
        {
            Ok(list) => {
                if self.accept(&self.slots.episodes, ticket, "episodes") {
                    debug!(content_id, count = list.episodes.len(), "episodes_fetched");
                    write(&self.state).episodes = list.episodes;
                }
                Ok(())
            }
            Err(err) => {
                self.fail(&self.slots.episodes, ticket, message_or_generic(&err));
                Err(err)
            }
        }
    }

    pub async fn fetch_genres(&self) -> Result<(), ApiError> {
        let genres = self.fetch_lookup::<Genre>("/api/genres").await?;
        write(&self.state).genres = genres;
        Ok(())
    }

    pub async fn fetch_categories(&self) -> Result<(), ApiError> {
        let categories = self.fetch_lookup::<Category>("/api/categories").await?;
        write(&self.state).categories = categories;
        Ok(())
    }

    async fn fetch_lookup<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, ApiError> {
        let _loading = self.in_flight.begin();
        write(&self.state).error = None;

        self.api
            .get_json::<Vec<T>>(path, Vec::new())
            .await
            .inspect_err(|err| {
                write(&self.state).error = Some(message_or_generic(err));
            })
    }

    /// Reports playback position. Failures are logged and never surface.
    pub async fn update_watch_progress(
        &self,
        content_id: ContentId,
        episode_id: Option<EpisodeId>,
        progress: u32,
    ) {
        let update = ProgressUpdate {
            content_id,
            episode_id,
            progress,
        };
        match self
            .api
            .post_json::<_, IgnoredAny>("/api/watch-history", &update)
            .await
        {
            Ok(_) => debug!(content_id, ?episode_id, progress, "watch_progress_updated"),
            Err(err) => warn!(content_id, ?episode_id, "Failed to update watch progress: {err}"),
        }
    }

    /// Uploads a video for a content, or for one of its episodes when
    /// `episode_id` is given.
    pub async fn upload_video(
        &self,
        content_id: ContentId,
        episode_id: Option<EpisodeId>,
        file: VideoFile,
    ) -> Result<Value, ApiError> {
        let path = match episode_id.filter(|id| *id != 0) {
            Some(episode_id) => {
                format!("/api/media/content/{content_id}/episodes/{episode_id}/video")
            }
            None => format!("/api/media/content/{content_id}/video"),
        };

        info!(
            content_id,
            ?episode_id,
            file = file.file_name.as_str(),
            bytes = file.bytes.len(),
            "uploading_video"
        );

        self.api
            .post_multipart::<Value>(&path, "video", file)
            .await
            .inspect_err(|err| error!(content_id, ?episode_id, "Failed to upload video: {err}"))
    }

    /// Merges `patch` into the filters, returns to page 1 and schedules a
    /// refetch.
    pub fn set_filters(&self, patch: FilterPatch) {
        {
            let mut state = write(&self.state);
            state.filters.merge(patch);
            state.pagination.page = 1;
        }
        self.schedule_refresh();
    }

    /// Advances one page and schedules a refetch, if there is a next page.
    pub fn next_page(&self) -> bool {
        {
            let mut state = write(&self.state);
            let Some(next) = state.pagination.next_page() else {
                return false;
            };
            state.pagination.page = next;
        }
        self.schedule_refresh();
        true
    }

    pub fn reset_filters(&self) {
        {
            let mut state = write(&self.state);
            state.filters = ContentFilters::default();
            state.pagination.page = 1;
        }
        self.schedule_refresh();
    }

    /// Waits for the refetch scheduled by the last filter or page change.
    pub async fn wait_for_refresh(&self) {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take(REFRESH_TASK);
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            debug!("refresh task did not complete: {e}");
        }
    }

    fn schedule_refresh(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping contents refresh");
            return;
        };

        let store = self.clone();
        let handle = runtime.spawn(async move {
            if let Err(err) = store.fetch_contents().await {
                warn!("Scheduled contents refresh failed: {err}");
            }
        });

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .spawn(REFRESH_TASK, handle);
    }

    fn accept(&self, slot: &Sequencer, ticket: Ticket, name: &str) -> bool {
        let current = slot.is_current(ticket);
        if !current {
            debug!(slot = name, "discarding_superseded_response");
        }
        current
    }

    fn fail(&self, slot: &Sequencer, ticket: Ticket, message: String) {
        if slot.is_current(ticket) {
            write(&self.state).error = Some(message.clone());
            self.emit(Event::FetchError(message));
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn message_or_generic(err: &ApiError) -> String {
    err.server_message()
        .map(str::to_string)
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}
