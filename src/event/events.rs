use crate::{
    models::{Content, ContentId, Episode, User},
    navigation::Route,
};

#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Event {
    // Navigation
    Navigate(Route),

    // Session
    SessionStarted(User),
    SessionCleared,

    // Catalog
    ContentsFetched { count: usize, total: u64 },
    ContentFetched(Content),
    EpisodeFetched(ContentId, Episode),
    FetchError(String),
}
