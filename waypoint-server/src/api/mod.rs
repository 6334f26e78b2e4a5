pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod reactions;

pub use error::{ApiError, ApiResult};
