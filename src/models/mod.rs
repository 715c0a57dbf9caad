//! Response schemas for the catalog API.
//!
//! Every payload is decoded at the boundary into one of these types; a body
//! that does not fit fails with a decoding error rather than being trusted
//! field by field.

mod content;
mod history;
mod user;

pub use content::{
    Category, Content, ContentId, ContentPage, ContentSummary, DownloadLink, Episode,
    EpisodeId, EpisodeList, Genre, Season, StreamLink,
};
pub use history::{HistoryPage, ProgressUpdate, WatchHistory};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, Role, User};
