use devio_common::{
    model::{Id, comment::CommentMarker, post::PostMarker, user::UserMarker},
    snowflake::SnowflakeError,
};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T, E = ThreadError> = std::result::Result<T, E>;

/// Failure of a backing store. Never retried here.
#[derive(Debug)]
pub struct StoreError(Box<dyn StdError + Send + Sync>);

impl StoreError {
    pub fn new<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Box::new(source))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store operation failed: {}", self.0)
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.0)
    }
}

impl From<SnowflakeError> for StoreError {
    fn from(value: SnowflakeError) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Display) -> Self {
        Self {
            field,
            reason: reason.to_string(),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    ParentNotFound,
    Forbidden,
    AlreadyLiked,
    NotLiked,
    Store,
}

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("Validation failed")]
    Validation(#[from] ValidationError),
    #[error("Post {0} not found")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment {comment} not found on post {post}")]
    CommentNotFound {
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    },
    #[error("User {0} not found")]
    UserNotFound(Id<UserMarker>),
    #[error("Parent comment {parent} not found on post {post}")]
    ParentNotFound {
        post: Id<PostMarker>,
        parent: Id<CommentMarker>,
    },
    #[error("Not authorized to delete post {0}")]
    NotPostAuthor(Id<PostMarker>),
    #[error("Not authorized to delete comment {0}")]
    NotCommentAuthor(Id<CommentMarker>),
    #[error("Post {0} already liked")]
    AlreadyLiked(Id<PostMarker>),
    #[error("Post {0} is not yet liked")]
    NotLiked(Id<PostMarker>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Mutation task did not complete: {0}")]
    Interrupted(#[from] JoinError),
}

impl ThreadError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThreadError::Validation(_) => ErrorKind::Validation,
            ThreadError::PostNotFound(_)
            | ThreadError::CommentNotFound { .. }
            | ThreadError::UserNotFound(_) => ErrorKind::NotFound,
            ThreadError::ParentNotFound { .. } => ErrorKind::ParentNotFound,
            ThreadError::NotPostAuthor(_) | ThreadError::NotCommentAuthor(_) => {
                ErrorKind::Forbidden
            }
            ThreadError::AlreadyLiked(_) => ErrorKind::AlreadyLiked,
            ThreadError::NotLiked(_) => ErrorKind::NotLiked,
            ThreadError::Store(_) | ThreadError::Interrupted(_) => ErrorKind::Store,
        }
    }

    /// Extra, per-field information for the caller.
    #[must_use]
    pub fn detail(&self) -> Option<Vec<String>> {
        match self {
            ThreadError::Validation(error) => Some(vec![error.to_string()]),
            _ => None,
        }
    }
}
