mod auth;
mod status;

pub use auth::TokenManager;
pub use status::StatusPublisher;
pub use status::read_published;
