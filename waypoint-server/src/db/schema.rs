/// SQL schema for the Waypoint feed database
/// Creates all tables with proper constraints, foreign keys, and indexes
pub const SCHEMA: &str = r#"
-- Users table (owned by the account subsystem; the feed reads it)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'moderator')),
    created_at TEXT NOT NULL
);

-- Follows table: one relation, indexed in both lookup directions
CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT NOT NULL,
    followee_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (follower_id, followee_id),
    FOREIGN KEY (follower_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (followee_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_follows_follower ON follows(follower_id);
CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id);

-- Locations table. Reviews are embedded as a JSON array of review
-- objects on the parent row, matching the source system's document
-- layout; the review adapter unnests them with json_each.
CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    creator_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    reviews TEXT NOT NULL DEFAULT '[]',
    FOREIGN KEY (creator_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_locations_creator ON locations(creator_id);
CREATE INDEX IF NOT EXISTS idx_locations_created_at ON locations(created_at DESC);

-- Badge announcements, written once by the external badge engine
CREATE TABLE IF NOT EXISTS badge_announcements (
    id TEXT PRIMARY KEY,
    recipient_id TEXT NOT NULL,
    badge_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (recipient_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_badges_recipient ON badge_announcements(recipient_id);
CREATE INDEX IF NOT EXISTS idx_badges_created_at ON badge_announcements(created_at DESC);

-- Reactions table. The composite primary key is the storage-level
-- uniqueness constraint: at most one row per (subject, user).
CREATE TABLE IF NOT EXISTS reactions (
    subject_id TEXT NOT NULL,
    subject_type TEXT NOT NULL CHECK(subject_type IN ('review', 'badge_notification')),
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('like', 'dislike')),
    created_at TEXT NOT NULL,
    PRIMARY KEY (subject_id, subject_type, user_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reactions_subject ON reactions(subject_id, subject_type);
CREATE INDEX IF NOT EXISTS idx_reactions_user ON reactions(user_id);

-- Comments table. Never edited in place.
CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    subject_type TEXT NOT NULL CHECK(subject_type IN ('review', 'badge_notification')),
    author_id TEXT NOT NULL,
    content TEXT NOT NULL CHECK(length(content) <= 500),
    created_at TEXT NOT NULL,
    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_comments_subject ON comments(subject_id, subject_type);

-- Sessions table (issuance is owned by the auth collaborator)
CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
"#;

/// Test data for development and testing
/// - 4 users (maya follows liam and noor; otis is a moderator)
/// - Locations with embedded review arrays
/// - Badge announcements
/// - Reactions and comments demonstrating the social signals
pub const TEST_DATA: &str = r#"
INSERT OR IGNORE INTO users (id, username, role, created_at) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', 'maya', 'user', '2024-02-01T00:00:00+00:00'),
    ('550e8400-e29b-41d4-a716-446655440002', 'liam', 'user', '2024-02-02T00:00:00+00:00'),
    ('550e8400-e29b-41d4-a716-446655440003', 'noor', 'user', '2024-02-03T00:00:00+00:00'),
    ('550e8400-e29b-41d4-a716-446655440004', 'otis', 'moderator', '2024-02-04T00:00:00+00:00');

INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES
    ('550e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440002', '2024-02-05T00:00:00+00:00'),
    ('550e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440003', '2024-02-05T00:00:00+00:00'),
    ('550e8400-e29b-41d4-a716-446655440002', '550e8400-e29b-41d4-a716-446655440001', '2024-02-06T00:00:00+00:00');

INSERT OR IGNORE INTO locations (id, creator_id, name, description, created_at, reviews) VALUES
    ('650e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440002',
     'Old Harbor Lighthouse', 'Worth the climb at sunset', '2024-03-01T10:00:00+00:00',
     '[{"id":"750e8400-e29b-41d4-a716-446655440001","author_id":"550e8400-e29b-41d4-a716-446655440003","rating":5,"text":"Stunning views, bring a windbreaker","created_at":"2024-03-02T09:00:00+00:00"}]'),
    ('650e8400-e29b-41d4-a716-446655440002', '550e8400-e29b-41d4-a716-446655440003',
     'Cinder Cone Trailhead', NULL, '2024-03-03T08:30:00+00:00',
     '[{"id":"750e8400-e29b-41d4-a716-446655440002","author_id":"550e8400-e29b-41d4-a716-446655440002","rating":3,"text":"Crowded on weekends","created_at":"2024-03-04T12:00:00+00:00"},{"id":"750e8400-e29b-41d4-a716-446655440003","author_id":"550e8400-e29b-41d4-a716-446655440001","rating":4,"text":"Go early, parking fills fast","created_at":"2024-03-05T07:45:00+00:00"}]');

INSERT OR IGNORE INTO badge_announcements (id, recipient_id, badge_name, created_at) VALUES
    ('850e8400-e29b-41d4-a716-446655440001', '550e8400-e29b-41d4-a716-446655440002', 'Trailblazer', '2024-03-04T18:00:00+00:00'),
    ('850e8400-e29b-41d4-a716-446655440002', '550e8400-e29b-41d4-a716-446655440003', 'First Review', '2024-03-02T09:05:00+00:00');

INSERT OR IGNORE INTO reactions (subject_id, subject_type, user_id, kind, created_at) VALUES
    ('750e8400-e29b-41d4-a716-446655440001', 'review', '550e8400-e29b-41d4-a716-446655440001', 'like', '2024-03-02T10:00:00+00:00'),
    ('750e8400-e29b-41d4-a716-446655440001', 'review', '550e8400-e29b-41d4-a716-446655440002', 'like', '2024-03-02T11:00:00+00:00'),
    ('750e8400-e29b-41d4-a716-446655440002', 'review', '550e8400-e29b-41d4-a716-446655440003', 'dislike', '2024-03-04T13:00:00+00:00'),
    ('850e8400-e29b-41d4-a716-446655440001', 'badge_notification', '550e8400-e29b-41d4-a716-446655440001', 'like', '2024-03-04T19:00:00+00:00');

INSERT OR IGNORE INTO comments (id, subject_id, subject_type, author_id, content, created_at) VALUES
    ('950e8400-e29b-41d4-a716-446655440001', '750e8400-e29b-41d4-a716-446655440001', 'review', '550e8400-e29b-41d4-a716-446655440001', 'Adding this to my list!', '2024-03-02T10:30:00+00:00'),
    ('950e8400-e29b-41d4-a716-446655440002', '750e8400-e29b-41d4-a716-446655440001', 'review', '550e8400-e29b-41d4-a716-446655440002', 'The stairs are steeper than they look', '2024-03-02T12:00:00+00:00'),
    ('950e8400-e29b-41d4-a716-446655440003', '850e8400-e29b-41d4-a716-446655440001', 'badge_notification', '550e8400-e29b-41d4-a716-446655440001', 'Congrats!', '2024-03-04T19:15:00+00:00');
"#;
