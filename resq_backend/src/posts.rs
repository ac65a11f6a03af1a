use crate::events::{ChangeEvent, EventHub};
use crate::feed::{page_window, total_pages};
use crate::store::models::{CommentRecord, PostRecord};
use crate::store::repositories::{CommentRepository, LikeRepository, PostRepository};
use crate::store::Store;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Acting user attached to every write, resolved from the session.
#[derive(Debug, Clone)]
pub struct Author {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post content may not be empty")]
    EmptyPost,
    #[error("comment text may not be empty")]
    EmptyComment,
    #[error("only the author may change this post")]
    NotPostAuthor,
    #[error("only the author may change this comment")]
    NotCommentAuthor,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type PostResult<T> = Result<T, PostError>;

/// Outcome of a guarded write, checked and applied under one store lock.
enum WriteCheck {
    Done,
    Missing,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PostCategory {
    #[serde(rename = "Survival Story")]
    SurvivalStory,
    #[serde(rename = "Disaster Tip")]
    DisasterTip,
    Advice,
    #[default]
    General,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::SurvivalStory => "Survival Story",
            PostCategory::DisasterTip => "Disaster Tip",
            PostCategory::Advice => "Advice",
            PostCategory::General => "General",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Survival Story" => PostCategory::SurvivalStory,
            "Disaster Tip" => PostCategory::DisasterTip,
            "Advice" => PostCategory::Advice,
            _ => PostCategory::General,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub user_id: String,
    pub author_name: String,
    pub content: String,
    pub category: PostCategory,
    pub timestamp: i64,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub content: String,
    #[serde(default)]
    pub category: PostCategory,
    /// Optional timestamp for imported posts. If None, uses current time.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePostInput {
    pub content: String,
    #[serde(default)]
    pub category: Option<PostCategory>,
}

#[derive(Clone)]
pub struct PostService {
    store: Store,
    events: EventHub,
}

impl PostService {
    pub fn new(store: Store, events: EventHub) -> Self {
        Self { store, events }
    }

    /// Whole feed, newest first, with liker sets and comment lists attached.
    pub fn list_feed(&self) -> PostResult<Vec<PostView>> {
        let views = self.store.with_repositories(|repos| {
            let records = repos.posts().list_feed()?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                let likes = repos.likes().list_for_post(&record.id)?;
                let comments = repos.comments().list_for_post(&record.id)?;
                views.push(PostView::from_parts(record, likes, comments));
            }
            Ok(views)
        })?;
        Ok(views)
    }

    /// One five-post window of the feed, computed fresh from the store.
    pub fn feed_page(&self, page: usize) -> PostResult<FeedPage> {
        let page = page.max(1);
        let feed_page = self.store.with_repositories(|repos| {
            let records = repos.posts().list_feed()?;
            let total_posts = records.len();
            let window = page_window(total_posts, page);
            let mut posts = Vec::with_capacity(window.len());
            for record in records[window].to_vec() {
                let likes = repos.likes().list_for_post(&record.id)?;
                let comments = repos.comments().list_for_post(&record.id)?;
                posts.push(PostView::from_parts(record, likes, comments));
            }
            Ok(FeedPage {
                posts,
                page,
                total_pages: total_pages(total_posts),
                total_posts,
            })
        })?;
        Ok(feed_page)
    }

    pub fn get_post(&self, post_id: &str) -> PostResult<Option<PostView>> {
        let view = self.store.with_repositories(|repos| {
            let Some(record) = repos.posts().get(post_id)? else {
                return Ok(None);
            };
            let likes = repos.likes().list_for_post(post_id)?;
            let comments = repos.comments().list_for_post(post_id)?;
            Ok(Some(PostView::from_parts(record, likes, comments)))
        })?;
        Ok(view)
    }

    pub fn create_post(&self, author: &Author, input: CreatePostInput) -> PostResult<PostView> {
        if input.content.trim().is_empty() {
            return Err(PostError::EmptyPost);
        }
        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            user_id: author.id.clone(),
            author_name: author.name.clone(),
            content: input.content,
            category: input.category.as_str().to_string(),
            timestamp: input.timestamp.unwrap_or_else(now_millis),
        };
        self.store
            .with_repositories(|repos| repos.posts().create(&record))?;
        self.events.publish(ChangeEvent::FeedChanged);
        Ok(PostView::from_parts(record, Vec::new(), Vec::new()))
    }

    pub fn update_post(
        &self,
        post_id: &str,
        user_id: &str,
        input: UpdatePostInput,
    ) -> PostResult<()> {
        if input.content.trim().is_empty() {
            return Err(PostError::EmptyPost);
        }
        let check = self.store.with_repositories(|repos| {
            let Some(record) = repos.posts().get(post_id)? else {
                return Ok(WriteCheck::Missing);
            };
            if record.user_id != user_id {
                return Ok(WriteCheck::NotOwner);
            }
            let category = input
                .category
                .map(|category| category.as_str().to_string())
                .unwrap_or(record.category);
            repos
                .posts()
                .update_content(post_id, &input.content, &category)?;
            Ok(WriteCheck::Done)
        })?;
        self.finish_post_write(check)
    }

    pub fn delete_post(&self, post_id: &str, user_id: &str) -> PostResult<()> {
        let check = self.store.with_repositories(|repos| {
            let Some(record) = repos.posts().get(post_id)? else {
                return Ok(WriteCheck::Missing);
            };
            if record.user_id != user_id {
                return Ok(WriteCheck::NotOwner);
            }
            repos.posts().delete(post_id)?;
            Ok(WriteCheck::Done)
        })?;
        self.finish_post_write(check)
    }

    /// Flips the caller in the post's liker set. A toggle against a post
    /// that no longer exists is dropped without complaint.
    pub fn toggle_like(&self, post_id: &str, user_id: &str) -> PostResult<()> {
        let changed = self.store.with_repositories(|repos| {
            if repos.posts().get(post_id)?.is_none() {
                return Ok(false);
            }
            repos.likes().toggle(post_id, user_id)?;
            Ok(true)
        })?;
        if changed {
            self.events.publish(ChangeEvent::FeedChanged);
        }
        Ok(())
    }

    /// Appends a comment under a fresh id. Returns None when the post is
    /// gone; the write just vanishes.
    pub fn add_comment(
        &self,
        post_id: &str,
        author: &Author,
        text: String,
    ) -> PostResult<Option<CommentView>> {
        if text.trim().is_empty() {
            return Err(PostError::EmptyComment);
        }
        let record = CommentRecord {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            text,
            timestamp: now_millis(),
        };
        let appended = self.store.with_repositories(|repos| {
            if repos.posts().get(post_id)?.is_none() {
                return Ok(false);
            }
            repos.comments().append(&record)?;
            Ok(true)
        })?;
        if !appended {
            return Ok(None);
        }
        self.events.publish(ChangeEvent::FeedChanged);
        Ok(Some(CommentView::from_record(record)))
    }

    /// Replaces a comment's text in place; id, author, and timestamp stay
    /// untouched. Editing a comment that is no longer there is a no-op.
    pub fn edit_comment(
        &self,
        post_id: &str,
        comment_id: &str,
        user_id: &str,
        new_text: String,
    ) -> PostResult<()> {
        if new_text.trim().is_empty() {
            return Err(PostError::EmptyComment);
        }
        let check = self.store.with_repositories(|repos| {
            let Some(existing) = repos.comments().get(post_id, comment_id)? else {
                return Ok(WriteCheck::Missing);
            };
            if existing.user_id != user_id {
                return Ok(WriteCheck::NotOwner);
            }
            repos.comments().set_text(post_id, comment_id, &new_text)?;
            Ok(WriteCheck::Done)
        })?;
        match check {
            WriteCheck::Done => {
                self.events.publish(ChangeEvent::FeedChanged);
                Ok(())
            }
            WriteCheck::Missing => Ok(()),
            WriteCheck::NotOwner => Err(PostError::NotCommentAuthor),
        }
    }

    /// Removes a comment by exact value. A stale copy, say one whose text
    /// was edited after the caller last read it, matches nothing and the
    /// call quietly removes zero rows.
    pub fn remove_comment(
        &self,
        post_id: &str,
        user_id: &str,
        comment: CommentView,
    ) -> PostResult<()> {
        if comment.user_id != user_id {
            return Err(PostError::NotCommentAuthor);
        }
        let removed = self
            .store
            .with_repositories(|repos| repos.comments().remove_exact(&comment.to_record(post_id)))?;
        if removed > 0 {
            self.events.publish(ChangeEvent::FeedChanged);
        }
        Ok(())
    }

    fn finish_post_write(&self, check: WriteCheck) -> PostResult<()> {
        match check {
            WriteCheck::Done => {
                self.events.publish(ChangeEvent::FeedChanged);
                Ok(())
            }
            WriteCheck::Missing => Ok(()),
            WriteCheck::NotOwner => Err(PostError::NotPostAuthor),
        }
    }
}

impl PostView {
    fn from_parts(record: PostRecord, likes: Vec<String>, comments: Vec<CommentRecord>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            author_name: record.author_name,
            content: record.content,
            category: PostCategory::from_name(&record.category),
            timestamp: record.timestamp,
            likes,
            comments: comments.into_iter().map(CommentView::from_record).collect(),
        }
    }
}

impl CommentView {
    fn from_record(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            user_name: record.user_name,
            text: record.text,
            timestamp: record.timestamp,
        }
    }

    fn to_record(&self, post_id: &str) -> CommentRecord {
        CommentRecord {
            id: self.id.clone(),
            post_id: post_id.to_string(),
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> PostService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let store = Store::from_connection(conn, true);
        store.ensure_migrations().expect("migrations");
        PostService::new(store, EventHub::new())
    }

    fn maria() -> Author {
        Author {
            id: "user-maria".into(),
            name: "Maria".into(),
        }
    }

    fn ben() -> Author {
        Author {
            id: "user-ben".into(),
            name: "Ben".into(),
        }
    }

    fn post_input(content: &str, timestamp: i64) -> CreatePostInput {
        CreatePostInput {
            content: content.into(),
            category: PostCategory::General,
            timestamp: Some(timestamp),
        }
    }

    #[test]
    fn feed_pages_are_newest_first_five_wide() {
        let service = setup_service();
        for n in 1..=7i64 {
            service
                .create_post(&maria(), post_input(&format!("update {n}"), n * 1_000))
                .expect("create post");
        }

        let first = service.feed_page(1).expect("page 1");
        assert_eq!(first.total_posts, 7);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.posts.len(), 5);
        assert_eq!(first.posts[0].content, "update 7");
        assert_eq!(first.posts[4].content, "update 3");

        let second = service.feed_page(2).expect("page 2");
        assert_eq!(second.posts.len(), 2);
        assert_eq!(second.posts[1].content, "update 1");

        let past_the_end = service.feed_page(3).expect("page 3");
        assert!(past_the_end.posts.is_empty());
        assert_eq!(past_the_end.total_pages, 2);
    }

    #[test]
    fn feed_order_is_stable_across_reads() {
        let service = setup_service();
        for n in 1..=4 {
            // shared timestamp, so ordering falls back to the id tiebreak
            service
                .create_post(&maria(), post_input(&format!("tied {n}"), 5_000))
                .expect("create post");
        }
        let ids = |views: Vec<PostView>| views.into_iter().map(|post| post.id).collect::<Vec<_>>();
        let first = ids(service.list_feed().expect("first read"));
        let second = ids(service.list_feed().expect("second read"));
        assert_eq!(first, second);
    }

    #[test]
    fn empty_feed_still_renders_one_page() {
        let service = setup_service();
        let page = service.feed_page(1).expect("page");
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_posts, 0);
        assert!(page.posts.is_empty());
    }

    #[test]
    fn post_creation_validates_content() {
        let service = setup_service();
        let err = service
            .create_post(&maria(), post_input("   ", 1_000))
            .unwrap_err();
        assert!(matches!(err, PostError::EmptyPost));
    }

    #[test]
    fn like_toggle_flips_membership_and_keeps_the_set_clean() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("evacuation routes for Marikina", 1_000))
            .expect("create post");

        service.toggle_like(&post.id, &ben().id).expect("ben likes");
        service
            .toggle_like(&post.id, &maria().id)
            .expect("maria likes");
        let likes = service.get_post(&post.id).unwrap().unwrap().likes;
        assert_eq!(likes, vec!["user-ben".to_string(), "user-maria".to_string()]);

        // double toggle restores the starting set
        service.toggle_like(&post.id, &ben().id).expect("ben unlikes");
        let likes = service.get_post(&post.id).unwrap().unwrap().likes;
        assert_eq!(likes, vec!["user-maria".to_string()]);
    }

    #[test]
    fn like_toggle_on_missing_post_is_silent() {
        let service = setup_service();
        service
            .toggle_like("no-such-post", &ben().id)
            .expect("no error for missing post");
        assert!(service.get_post("no-such-post").unwrap().is_none());
    }

    #[test]
    fn comments_append_under_fresh_ids() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("typhoon signal raised", 1_000))
            .expect("create post");

        let first = service
            .add_comment(&post.id, &ben(), "stay safe po".into())
            .expect("comment")
            .expect("post exists");
        let second = service
            .add_comment(&post.id, &maria(), "thank you!".into())
            .expect("comment")
            .expect("post exists");
        assert_ne!(first.id, second.id);

        let comments = service.get_post(&post.id).unwrap().unwrap().comments;
        assert_eq!(comments.len(), 2);
        assert!(comments.contains(&first));
        assert!(comments.contains(&second));

        let gone = service
            .add_comment("no-such-post", &ben(), "hello?".into())
            .expect("no error for missing post");
        assert!(gone.is_none());
    }

    #[test]
    fn comment_edit_replaces_text_only() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("flood watch", 1_000))
            .expect("create post");
        let comment = service
            .add_comment(&post.id, &ben(), "water risin".into())
            .expect("comment")
            .expect("post exists");

        service
            .edit_comment(&post.id, &comment.id, &ben().id, "water rising".into())
            .expect("edit");

        let stored = &service.get_post(&post.id).unwrap().unwrap().comments[0];
        assert_eq!(stored.text, "water rising");
        assert_eq!(stored.id, comment.id);
        assert_eq!(stored.user_id, comment.user_id);
        assert_eq!(stored.user_name, comment.user_name);
        assert_eq!(stored.timestamp, comment.timestamp);

        // a comment that vanished meanwhile is no error
        service
            .edit_comment(&post.id, "no-such-comment", &ben().id, "hm".into())
            .expect("edit of missing comment");
    }

    #[test]
    fn stale_removal_deletes_nothing() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("relief goods drop-off", 1_000))
            .expect("create post");
        let original = service
            .add_comment(&post.id, &ben(), "where exactly?".into())
            .expect("comment")
            .expect("post exists");

        service
            .edit_comment(&post.id, &original.id, &ben().id, "where exactly po?".into())
            .expect("edit");

        service
            .remove_comment(&post.id, &ben().id, original.clone())
            .expect("stale removal");
        let comments = service.get_post(&post.id).unwrap().unwrap().comments;
        assert_eq!(comments.len(), 1);

        let current = comments[0].clone();
        service
            .remove_comment(&post.id, &ben().id, current)
            .expect("exact removal");
        assert!(service.get_post(&post.id).unwrap().unwrap().comments.is_empty());
    }

    #[test]
    fn ownership_is_enforced_on_every_mutation() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("volunteer sign-up", 1_000))
            .expect("create post");
        let comment = service
            .add_comment(&post.id, &maria(), "I can drive".into())
            .expect("comment")
            .expect("post exists");

        let edit = service.update_post(
            &post.id,
            &ben().id,
            UpdatePostInput {
                content: "hijacked".into(),
                category: None,
            },
        );
        assert!(matches!(edit.unwrap_err(), PostError::NotPostAuthor));

        let delete = service.delete_post(&post.id, &ben().id);
        assert!(matches!(delete.unwrap_err(), PostError::NotPostAuthor));

        let comment_edit = service.edit_comment(&post.id, &comment.id, &ben().id, "nope".into());
        assert!(matches!(
            comment_edit.unwrap_err(),
            PostError::NotCommentAuthor
        ));

        let comment_removal = service.remove_comment(&post.id, &ben().id, comment);
        assert!(matches!(
            comment_removal.unwrap_err(),
            PostError::NotCommentAuthor
        ));

        assert!(service.get_post(&post.id).unwrap().is_some());
    }

    #[test]
    fn owner_can_update_and_delete() {
        let service = setup_service();
        let post = service
            .create_post(&maria(), post_input("draft", 1_000))
            .expect("create post");

        service
            .update_post(
                &post.id,
                &maria().id,
                UpdatePostInput {
                    content: "final: earthquake drill on Saturday".into(),
                    category: Some(PostCategory::Advice),
                },
            )
            .expect("update");
        let updated = service.get_post(&post.id).unwrap().unwrap();
        assert_eq!(updated.content, "final: earthquake drill on Saturday");
        assert_eq!(updated.category, PostCategory::Advice);
        assert_eq!(updated.timestamp, 1_000);

        service.delete_post(&post.id, &maria().id).expect("delete");
        assert!(service.get_post(&post.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_publish_feed_change_events() {
        let service = setup_service();
        let mut rx = service.events.subscribe();
        service
            .create_post(&maria(), post_input("hello", 1_000))
            .expect("create post");
        assert!(matches!(rx.try_recv(), Ok(ChangeEvent::FeedChanged)));
    }
}
