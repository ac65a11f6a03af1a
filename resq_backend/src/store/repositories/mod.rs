mod comments;
mod deletions;
mod likes;
mod locations;
mod posts;
mod sessions;
mod users;

use super::models::{
    CommentRecord, LocationRecord, PendingDeletionRecord, PostRecord, SessionRecord, UserRecord,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    /// Full feed, newest first. Ties on timestamp break by id so page
    /// windows stay stable between reads.
    fn list_feed(&self) -> Result<Vec<PostRecord>>;
    fn update_content(&self, id: &str, content: &str, category: &str) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
}

pub trait LikeRepository {
    /// Flips the caller's membership in the post's liker set. Runs the
    /// read-check-write inside one transaction.
    fn toggle(&self, post_id: &str, user_id: &str) -> Result<()>;
    fn list_for_post(&self, post_id: &str) -> Result<Vec<String>>;
}

pub trait CommentRepository {
    fn append(&self, record: &CommentRecord) -> Result<()>;
    fn get(&self, post_id: &str, comment_id: &str) -> Result<Option<CommentRecord>>;
    fn list_for_post(&self, post_id: &str) -> Result<Vec<CommentRecord>>;
    fn set_text(&self, post_id: &str, comment_id: &str, text: &str) -> Result<()>;
    /// Deletes only a row matching every field of `record`. Returns the
    /// number of rows removed; a stale value removes zero.
    fn remove_exact(&self, record: &CommentRecord) -> Result<usize>;
}

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    fn set_display_name(&self, id: &str, display_name: Option<&str>) -> Result<()>;
}

pub trait SessionRepository {
    fn create(&self, record: &SessionRecord) -> Result<()>;
    fn get(&self, token: &str) -> Result<Option<SessionRecord>>;
    fn delete(&self, token: &str) -> Result<()>;
    fn delete_for_user(&self, user_id: &str) -> Result<()>;
}

pub trait DeletionRepository {
    fn upsert(&self, record: &PendingDeletionRecord) -> Result<()>;
    fn get(&self, uid: &str) -> Result<Option<PendingDeletionRecord>>;
    fn remove(&self, uid: &str) -> Result<()>;
}

pub trait LocationRepository {
    fn upsert(&self, record: &LocationRecord) -> Result<()>;
    fn get(&self, user_id: &str) -> Result<Option<LocationRecord>>;
    fn delete(&self, user_id: &str) -> Result<()>;
    fn list_except(&self, user_id: &str) -> Result<Vec<LocationRecord>>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn likes(&self) -> impl LikeRepository + '_ {
        likes::SqliteLikeRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn sessions(&self) -> impl SessionRepository + '_ {
        sessions::SqliteSessionRepository { conn: self.conn }
    }

    pub fn deletions(&self) -> impl DeletionRepository + '_ {
        deletions::SqliteDeletionRepository { conn: self.conn }
    }

    pub fn locations(&self) -> impl LocationRepository + '_ {
        locations::SqliteLocationRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}
