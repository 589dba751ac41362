use crate::model::{
    Id,
    comment::CommentMarker,
    text::BodyText,
    user::{DisplaySnapshot, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Id<UserMarker>,
    #[serde(flatten)]
    pub author_snapshot: DisplaySnapshot,
    pub text: BodyText,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Newest first, at most one entry per user.
    pub likes: Vec<Like>,
    /// Root comments of the thread, newest first.
    pub comments: Vec<Id<CommentMarker>>,
}

/// Presence of a user's like on a post. There is no negative counterpart.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Like {
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub author: Id<UserMarker>,
    pub author_snapshot: DisplaySnapshot,
    pub text: BodyText,
    pub created_at: OffsetDateTime,
}

impl Post {
    #[must_use]
    pub fn is_liked_by(&self, user: Id<UserMarker>) -> bool {
        self.likes.iter().any(|like| like.user == user)
    }

    #[must_use]
    pub fn has_root_comment(&self, comment: Id<CommentMarker>) -> bool {
        self.comments.contains(&comment)
    }

    /// Puts `user`'s like in front. Returns `false` if they already like the post.
    pub fn add_like(&mut self, user: Id<UserMarker>) -> bool {
        if self.is_liked_by(user) {
            return false;
        }
        self.likes.insert(0, Like { post: self.id, user });
        true
    }

    /// Returns `false` if `user` did not like the post.
    pub fn remove_like(&mut self, user: Id<UserMarker>) -> bool {
        let before = self.likes.len();
        self.likes.retain(|like| like.user != user);
        self.likes.len() != before
    }

    /// Places a root comment at `position`, or last if the list is shorter.
    pub fn insert_root(&mut self, position: usize, comment: Id<CommentMarker>) {
        let position = position.min(self.comments.len());
        self.comments.insert(position, comment);
    }

    /// Returns whether `comment` was a root.
    pub fn remove_root(&mut self, comment: Id<CommentMarker>) -> bool {
        let before = self.comments.len();
        self.comments.retain(|id| *id != comment);
        self.comments.len() != before
    }
}

impl NewPost {
    #[must_use]
    pub fn into_post(self, id: Id<PostMarker>) -> Post {
        Post {
            id,
            author: self.author,
            author_snapshot: self.author_snapshot,
            text: self.text,
            created_at: self.created_at,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }
}
