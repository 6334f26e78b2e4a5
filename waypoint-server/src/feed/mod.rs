pub mod enrich;
pub mod merge;
pub mod service;
pub mod sources;

pub use service::{FeedError, FeedService, SubjectRef};
