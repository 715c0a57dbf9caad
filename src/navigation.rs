use std::fmt;

use flume::Sender;
use tracing::{info, warn};

use crate::{
    event::events::Event,
    models::{ContentId, EpisodeId},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Route {
    #[default]
    Home,
    Login,
    Content(ContentId),
    Episode(ContentId, EpisodeId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Content(id) => format!("/contents/{id}"),
            Route::Episode(content_id, episode_id) => {
                format!("/contents/{content_id}/episodes/{episode_id}")
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Publishes navigation requests to whoever owns the receiving end.
#[derive(Clone)]
pub struct ChannelNavigator {
    event_tx: Sender<Event>,
}

impl ChannelNavigator {
    pub fn new(event_tx: Sender<Event>) -> Self {
        Self { event_tx }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        info!(route = %route, "navigate");
        if self.event_tx.send(Event::Navigate(route)).is_err() {
            warn!("navigation requested but no listener is attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(Route::Login.path(), "/login");
        assert_eq!(Route::Episode(3, 8).to_string(), "/contents/3/episodes/8");
    }

    #[test]
    fn channel_navigator_publishes_route() {
        let (tx, rx) = flume::unbounded();
        ChannelNavigator::new(tx).navigate(Route::Login);
        assert_eq!(rx.try_recv().unwrap(), Event::Navigate(Route::Login));
    }
}
