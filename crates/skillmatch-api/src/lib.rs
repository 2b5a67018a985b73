pub mod auth;
mod convert;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod pitches;
pub mod profiles;
pub mod projects;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, AppStateInner};
