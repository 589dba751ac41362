//! Persistence seams of the discussion subsystem.
//!
//! [`PostService`](crate::PostService) serializes mutations of one post inside a
//! process. Several processes may share one store, so every method that changes
//! the forest or the likes must apply its change atomically and report whether it
//! took effect instead of overwriting whole records.

use crate::error::StoreError;
use async_trait::async_trait;
use devio_common::model::{
    Id,
    auth::{SessionTokenDecodeError, SessionTokenHashError},
    comment::{Comment, CommentMarker, NewComment},
    post::{Like, NewPost, Post, PostMarker},
    user::{DisplaySnapshot, User, UserMarker},
};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Persists a new comment and returns its freshly assigned id.
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Id<CommentMarker>>;

    async fn comment(&self, id: Id<CommentMarker>) -> StoreResult<Option<Comment>>;

    /// Places `child` at `position` among the replies of `parent`, or last if there
    /// are fewer. Returns `false` if `parent` is not stored.
    async fn insert_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool>;

    /// Returns `false` if `child` was not a reply of `parent`.
    async fn remove_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
    ) -> StoreResult<bool>;

    /// Removes the comment and every reply below it, returning how many records
    /// were removed. Removing an absent comment removes nothing.
    async fn delete_comment_subtree(&self, id: Id<CommentMarker>) -> StoreResult<usize>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: NewPost) -> StoreResult<Id<PostMarker>>;

    async fn post(&self, id: Id<PostMarker>) -> StoreResult<Option<Post>>;

    /// Places a root comment at `position`, or last if there are fewer. Returns
    /// `false` if the post is not stored.
    async fn insert_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool>;

    /// Returns `false` if `comment` was not a root of the post.
    async fn remove_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> StoreResult<bool>;

    /// Puts `user`'s like in front and returns the resulting likes. `None` if the
    /// post is missing or `user` already likes it.
    async fn add_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>>;

    /// Removes `user`'s like and returns the remaining likes. `None` if the post is
    /// missing or `user` does not like it.
    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>>;

    /// Removes the post and any comments still recorded against it. Returns whether
    /// a post was removed.
    async fn delete_post(&self, id: Id<PostMarker>) -> StoreResult<bool>;

    /// All posts, newest first.
    async fn list_posts(&self) -> StoreResult<Vec<Post>>;

    /// Posts written by `author`, newest first.
    async fn posts_by_author(&self, author: Id<UserMarker>) -> StoreResult<Vec<Post>>;
}

/// Read access to user profiles.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn user(&self, id: Id<UserMarker>) -> StoreResult<Option<User>>;

    async fn display_snapshot(&self, id: Id<UserMarker>) -> StoreResult<Option<DisplaySnapshot>> {
        Ok(self.user(id).await?.map(|user| user.display_snapshot()))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential could not be decoded: {0}")]
    Malformed(#[from] SessionTokenDecodeError),
    #[error("Credential is unknown or expired")]
    Rejected,
    #[error(transparent)]
    Hash(#[from] SessionTokenHashError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns a caller's credential into a user id.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Id<UserMarker>, AuthError>;
}
