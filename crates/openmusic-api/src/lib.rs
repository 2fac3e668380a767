pub mod albums;
pub mod auth;
pub mod cache;
pub mod collaborations;
pub mod covers;
pub mod error;
pub mod exports;
pub mod likes;
pub mod middleware;
pub mod playlists;
pub mod routes;
pub mod songs;
pub mod state;
pub mod tokens;
pub mod validation;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};

#[cfg(test)]
pub(crate) mod testing;
