use crate::model::{
    Id,
    post::PostMarker,
    text::BodyText,
    user::{DisplaySnapshot, UserMarker},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// One node of a post's comment forest.
///
/// Replies are held as identifiers only; their content lives in the comment store.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    /// `None` for root comments.
    pub parent: Option<Id<CommentMarker>>,
    pub author: Id<UserMarker>,
    #[serde(flatten)]
    pub author_snapshot: DisplaySnapshot,
    pub text: BodyText,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Newest first.
    pub children: Vec<Id<CommentMarker>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewComment {
    pub post: Id<PostMarker>,
    pub parent: Option<Id<CommentMarker>>,
    pub author: Id<UserMarker>,
    pub author_snapshot: DisplaySnapshot,
    pub text: BodyText,
    pub created_at: OffsetDateTime,
}

impl Comment {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Places `child` at `position`, or last if the list is shorter.
    pub fn insert_child(&mut self, position: usize, child: Id<CommentMarker>) {
        let position = position.min(self.children.len());
        self.children.insert(position, child);
    }

    /// Returns whether `child` was present.
    pub fn remove_child(&mut self, child: Id<CommentMarker>) -> bool {
        let before = self.children.len();
        self.children.retain(|id| *id != child);
        self.children.len() != before
    }
}

impl NewComment {
    #[must_use]
    pub fn into_comment(self, id: Id<CommentMarker>) -> Comment {
        Comment {
            id,
            post: self.post,
            parent: self.parent,
            author: self.author,
            author_snapshot: self.author_snapshot,
            text: self.text,
            created_at: self.created_at,
            children: Vec::new(),
        }
    }
}
