mod badge_repository;
mod comment_repository;
mod follow_repository;
mod location_repository;
mod reaction_repository;
mod user_repository;

pub use badge_repository::BadgeRepository;
pub use comment_repository::CommentRepository;
pub use follow_repository::FollowRepository;
pub use location_repository::LocationRepository;
pub use reaction_repository::{ReactionOutcome, ReactionRepository};
pub use user_repository::UserRepository;
