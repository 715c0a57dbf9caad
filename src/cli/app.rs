use std::sync::Arc;

use color_eyre::{Result, eyre::eyre};
use flume::Receiver;
use streamcat::{
    config::ClientConfig,
    event::events::Event,
    http::{ApiClient, VideoFile},
    models::{ContentSummary, WatchHistory},
    navigation::{ChannelNavigator, Route},
    storage,
    store::{ContentStore, FilterPatch, HistoryStore, SessionStore},
};
use tracing::info;

use super::args::Command;

pub struct App {
    pub event_rx: Receiver<Event>,
    pub session: SessionStore,
    pub content: ContentStore,
    pub history: HistoryStore,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let (event_tx, event_rx) = flume::unbounded();
        let storage = storage::open(&config)?;
        let navigator = Arc::new(ChannelNavigator::new(event_tx.clone()));
        let api = Arc::new(ApiClient::new(&config, storage, navigator)?);

        info!(base_url = config.base_url.as_str(), storage = ?config.storage, "client_ready");

        Ok(Self {
            session: SessionStore::new(api.clone()).with_events(event_tx.clone()),
            content: ContentStore::new(api.clone())
                .with_page_size(config.page_size)
                .with_events(event_tx.clone()),
            history: HistoryStore::new(api.clone()).with_page_size(config.page_size),
            event_rx,
        })
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        let result = self.dispatch(command).await;
        self.drain_events();
        result
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email, password } => {
                let body = self.session.login(&email, &password).await?;
                let name = body.user.map(|u| u.username).unwrap_or_default();
                println!("Signed in as {name}");
            }
            Command::Register {
                username,
                email,
                password,
            } => {
                let body = self.session.register(&username, &email, &password).await?;
                let message = body
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Registered");
                println!("{message}");
            }
            Command::Logout => {
                self.session.logout();
                println!("Signed out");
            }
            Command::Whoami => match self.session.user() {
                Some(user) => {
                    let role = if self.session.is_admin() { "admin" } else { "user" };
                    println!("{} <{}> ({role})", user.username, user.email);
                }
                None => println!("Not signed in"),
            },
            Command::List {
                content_type,
                genre,
                category,
                search,
                page,
            } => {
                let patch = FilterPatch::default();
                let patch = match content_type {
                    Some(value) => patch.content_type(value),
                    None => patch.clear_content_type(),
                };
                let patch = match genre {
                    Some(value) => patch.genre(value),
                    None => patch.clear_genre(),
                };
                let patch = match category {
                    Some(value) => patch.category(value),
                    None => patch.clear_category(),
                };
                let patch = match search {
                    Some(value) => patch.search(value),
                    None => patch.clear_search(),
                };

                self.content.set_filters(patch);
                self.content.wait_for_refresh().await;
                while self.content.pagination().page < page && self.content.next_page() {
                    self.content.wait_for_refresh().await;
                }

                if let Some(error) = self.content.error() {
                    return Err(eyre!(error));
                }
                let state = self.content.state();
                for item in &state.contents {
                    print_summary(item);
                }
                println!(
                    "page {} · {} total{}",
                    state.pagination.page,
                    state.pagination.total,
                    if state.has_next_page() { " · more available" } else { "" }
                );
            }
            Command::Show { id } => {
                self.content.fetch_content_by_id(Some(id)).await;
                let content = self
                    .content
                    .current_content()
                    .ok_or_else(|| eyre!(self.content.error().unwrap_or_default()))?;
                println!("{} [{}] ★ {:.1}", content.title, content.content_type, content.rating);
                if !content.description.is_empty() {
                    println!("{}", content.description);
                }
                for episode in &content.episodes {
                    println!(
                        "  S{:02}E{:02} #{} {}",
                        episode.season_number, episode.episode_number, episode.id, episode.title
                    );
                }
                for link in &content.stream_links {
                    println!("  stream {} {} {}", link.quality, link.server, link.url);
                }
            }
            Command::Episode {
                content_id,
                episode_id,
            } => {
                self.content.fetch_episode_by_id(content_id, episode_id).await?;
                self.print_current_episode();
            }
            Command::Episodes { content_id } => {
                self.content.fetch_episodes(content_id).await?;
                for episode in &self.content.state().episodes {
                    println!(
                        "S{:02}E{:02} #{} {}",
                        episode.season_number, episode.episode_number, episode.id, episode.title
                    );
                }
            }
            Command::Next {
                content_id,
                season,
                episode,
            } => {
                self.content
                    .fetch_next_episode(content_id, season, episode)
                    .await?;
                self.print_current_episode();
            }
            Command::Progress {
                content_id,
                seconds,
                episode,
            } => {
                self.content
                    .update_watch_progress(content_id, episode, seconds)
                    .await;
                println!("Progress reported");
            }
            Command::Upload {
                content_id,
                file,
                episode,
            } => {
                let file = VideoFile::from_path(&file).await?;
                let body = self.content.upload_video(content_id, episode, file).await?;
                println!("{body}");
            }
            Command::History { page } => {
                self.history.set_page(page);
                self.history.fetch_history().await?;
                let state = self.history.state();
                state.entries.iter().for_each(print_history);
                println!("page {} · {} total", state.pagination.page, state.pagination.total);
            }
            Command::Continue { limit } => {
                self.history.fetch_continue_watching(limit).await?;
                self.history
                    .state()
                    .continue_watching
                    .iter()
                    .for_each(print_history);
            }
            Command::Forget { id } => {
                self.history.delete_entry(id).await?;
                println!("Removed history entry {id}");
            }
            Command::Genres => {
                self.content.fetch_genres().await?;
                for genre in &self.content.state().genres {
                    println!("{:>4}  {}", genre.id, genre.name);
                }
            }
            Command::Categories => {
                self.content.fetch_categories().await?;
                for category in &self.content.state().categories {
                    println!("{:>4}  {}", category.id, category.name);
                }
            }
        }
        Ok(())
    }

    fn print_current_episode(&self) {
        if let Some(episode) = self.content.current_episode() {
            println!(
                "S{:02}E{:02} {} ({}s)",
                episode.season_number, episode.episode_number, episode.title, episode.duration
            );
            if !episode.video_path.is_empty() {
                println!("  {}", episode.video_path);
            }
        }
    }

    fn drain_events(&self) {
        for event in self.event_rx.try_iter() {
            if event == Event::Navigate(Route::Login) {
                self.session.reload();
                eprintln!("Session ended, sign in again with `streamcat login`");
            }
        }
    }
}

fn print_summary(item: &ContentSummary) {
    println!(
        "{:>6}  {:<40} {:<8} ★ {:.1}",
        item.id, item.title, item.content_type, item.rating
    );
}

fn print_history(entry: &WatchHistory) {
    let title = entry
        .content
        .as_ref()
        .map(|c| c.title.as_str())
        .unwrap_or("?");
    let done = if entry.completed_watch { "✓" } else { " " };
    println!(
        "{:>6} {done} {title} @ {}s",
        entry.id, entry.watch_progress
    );
}
