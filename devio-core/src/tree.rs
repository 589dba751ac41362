//! The comment forest of a post.
//!
//! A post holds the ids of its root comments and every comment holds the ids of
//! its replies, both newest first. Nothing here locks: callers serialize
//! mutations of one post (see [`PostLocks`](crate::lock::PostLocks)).

use crate::{
    error::{Result, StoreError, ThreadError},
    store::{CommentStore, PostStore, StoreResult},
};
use derive_where::derive_where;
use devio_common::model::{
    Id,
    comment::{Comment, CommentMarker, NewComment},
    post::{Post, PostMarker},
    user::UserMarker,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, error, warn};

/// Route from a root comment down to a located comment.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NodePath {
    ids: Vec<Id<CommentMarker>>,
    node: Comment,
}

impl NodePath {
    /// Ids from the root down to and including the located comment.
    #[must_use]
    pub fn ids(&self) -> &[Id<CommentMarker>] {
        &self.ids
    }

    /// Zero for root comments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ids.len() - 1
    }

    #[must_use]
    pub fn node(&self) -> &Comment {
        &self.node
    }

    #[must_use]
    pub fn into_node(self) -> Comment {
        self.node
    }
}

#[derive_where(Clone)]
pub struct CommentTree<P, C> {
    posts: Arc<P>,
    comments: Arc<C>,
}

impl<P, C> CommentTree<P, C>
where
    P: PostStore,
    C: CommentStore,
{
    pub fn new(posts: Arc<P>, comments: Arc<C>) -> Self {
        Self { posts, comments }
    }

    async fn load_post(&self, id: Id<PostMarker>) -> Result<Post> {
        self.posts
            .post(id)
            .await?
            .ok_or(ThreadError::PostNotFound(id))
    }

    /// Finds `node` anywhere below the roots of post `post`.
    pub async fn locate(
        &self,
        post: Id<PostMarker>,
        node: Id<CommentMarker>,
    ) -> Result<Option<NodePath>> {
        let post = self.load_post(post).await?;
        Ok(self.find(&post, node).await?)
    }

    /// Depth first, pre-order search that fetches comments as it descends.
    ///
    /// Siblings are visited in stored order. Uses an explicit stack, so thread
    /// depth is not limited by the call stack.
    pub async fn find(
        &self,
        post: &Post,
        target: Id<CommentMarker>,
    ) -> Result<Option<NodePath>, StoreError> {
        // Every fetched comment with the trail index of the comment it was reached from.
        let mut trail: Vec<(Id<CommentMarker>, Option<usize>)> = Vec::new();
        let mut pending: Vec<(Id<CommentMarker>, Option<usize>)> =
            post.comments.iter().rev().map(|id| (*id, None)).collect();
        let mut seen = HashSet::new();

        while let Some((id, via)) = pending.pop() {
            if !seen.insert(id) {
                warn!(post = %post.id, comment = %id, "Comment is reachable twice, skipping");
                continue;
            }
            let Some(comment) = self.comments.comment(id).await? else {
                warn!(post = %post.id, comment = %id, "Dangling comment reference");
                continue;
            };

            let reached_from = via.map(|index| trail[index].0);
            if comment.parent != reached_from || comment.post != post.id {
                warn!(
                    post = %post.id,
                    comment = %id,
                    stored_parent = ?comment.parent,
                    ?reached_from,
                    "Comment disagrees with the forest about its position"
                );
            }

            trail.push((id, via));
            if id == target {
                return Ok(Some(NodePath {
                    ids: rebuild_path(&trail),
                    node: comment,
                }));
            }

            let index = trail.len() - 1;
            pending.extend(comment.children.iter().rev().map(|child| (*child, Some(index))));
        }

        Ok(None)
    }

    /// Adds `new` to its post, under `new.parent` or as a new root.
    ///
    /// The comment is only persisted once its parent has been found. If linking it
    /// fails afterwards, it is deleted again.
    pub async fn insert(&self, new: NewComment) -> Result<Comment> {
        let post = self.load_post(new.post).await?;

        let Some(parent_id) = new.parent else {
            let id = self.comments.create_comment(new.clone()).await?;
            let linked = self.posts.insert_root(post.id, id, 0).await;
            self.keep_or_discard(id, linked, ThreadError::PostNotFound(post.id))
                .await?;

            debug!(post = %post.id, comment = %id, "Added root comment");
            return Ok(new.into_comment(id));
        };

        let parent_not_found = ThreadError::ParentNotFound {
            post: post.id,
            parent: parent_id,
        };
        if self.find(&post, parent_id).await?.is_none() {
            return Err(parent_not_found);
        }

        let id = self.comments.create_comment(new.clone()).await?;
        let linked = self.comments.insert_reply(parent_id, id, 0).await;
        self.keep_or_discard(id, linked, parent_not_found).await?;

        debug!(post = %post.id, parent = %parent_id, comment = %id, "Added reply");
        Ok(new.into_comment(id))
    }

    /// Deletes the freshly created `id` again unless it was linked.
    async fn keep_or_discard(
        &self,
        id: Id<CommentMarker>,
        linked: StoreResult<bool>,
        missing: ThreadError,
    ) -> Result<()> {
        let err = match linked {
            Ok(true) => return Ok(()),
            Ok(false) => missing,
            Err(err) => err.into(),
        };

        if let Err(discard_err) = self.comments.delete_comment_subtree(id).await {
            error!(comment = %id, error = %discard_err, "Could not remove unlinked comment");
        } else {
            warn!(comment = %id, error = %err, "Removed comment that could not be linked");
        }
        Err(err)
    }

    /// Removes `target` and all replies below it.
    ///
    /// `parent` is where the caller claims the comment hangs. The claim is checked
    /// against the forest before anything is changed. Returns the number of
    /// comments removed from the store.
    pub async fn delete(
        &self,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        target: Id<CommentMarker>,
        requester: Id<UserMarker>,
    ) -> Result<usize> {
        let post = self.load_post(post).await?;
        let not_found = || ThreadError::CommentNotFound {
            post: post.id,
            comment: target,
        };

        let comment = self
            .comments
            .comment(target)
            .await?
            .filter(|comment| comment.post == post.id)
            .ok_or_else(not_found)?;
        if comment.author != requester {
            return Err(ThreadError::NotCommentAuthor(target));
        }

        let position = match parent {
            None => post
                .comments
                .iter()
                .position(|id| *id == target)
                .ok_or_else(not_found)?,
            Some(parent_id) => {
                let parent_not_found = || ThreadError::ParentNotFound {
                    post: post.id,
                    parent: parent_id,
                };
                self.find(&post, parent_id)
                    .await?
                    .ok_or_else(parent_not_found)?
                    .node()
                    .children
                    .iter()
                    .position(|id| *id == target)
                    .ok_or_else(parent_not_found)?
            }
        };

        match self.cut(post.id, parent, target, position).await? {
            Some(removed) => Ok(removed),
            None => Err(match parent {
                None => not_found(),
                Some(parent_id) => ThreadError::ParentNotFound {
                    post: post.id,
                    parent: parent_id,
                },
            }),
        }
    }

    /// Deletes every root subtree of `post`, one root at a time. Returns the
    /// number of comments removed. On failure the roots not yet reached stay
    /// linked and stored.
    pub async fn clear(&self, post: &Post) -> Result<usize> {
        let mut removed = 0;
        for root in &post.comments {
            removed += self.cut(post.id, None, *root, 0).await?.unwrap_or_default();
        }
        Ok(removed)
    }

    /// Unlinks `target` from `parent` (or the post's roots), then deletes its
    /// subtree. If the subtree cannot be deleted, `target` is linked again at
    /// `position`. `None` if `target` was no longer linked there.
    async fn cut(
        &self,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        target: Id<CommentMarker>,
        position: usize,
    ) -> Result<Option<usize>> {
        let unlinked = match parent {
            None => self.posts.remove_root(post, target).await?,
            Some(parent) => self.comments.remove_reply(parent, target).await?,
        };
        if !unlinked {
            warn!(%post, comment = %target, "Comment was unlinked concurrently");
            return Ok(None);
        }

        match self.comments.delete_comment_subtree(target).await {
            Ok(removed) => {
                debug!(%post, comment = %target, removed, "Deleted comment subtree");
                Ok(Some(removed))
            }
            Err(err) => {
                self.relink(post, parent, target, position).await;
                Err(err.into())
            }
        }
    }

    async fn relink(
        &self,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        target: Id<CommentMarker>,
        position: usize,
    ) {
        let relinked = match parent {
            None => self.posts.insert_root(post, target, position).await,
            Some(parent) => self.comments.insert_reply(parent, target, position).await,
        };
        match relinked {
            Ok(true) => warn!(%post, comment = %target, "Restored comment after failed delete"),
            Ok(false) => error!(%post, comment = %target, "Comment lost its parent, not restored"),
            Err(err) => {
                error!(%post, comment = %target, error = %err, "Could not restore comment");
            }
        }
    }
}

fn rebuild_path(trail: &[(Id<CommentMarker>, Option<usize>)]) -> Vec<Id<CommentMarker>> {
    let mut ids = Vec::new();
    let mut cursor = trail.len().checked_sub(1);
    while let Some(index) = cursor {
        let (id, via) = trail[index];
        ids.push(id);
        cursor = via;
    }
    ids.reverse();
    ids
}
