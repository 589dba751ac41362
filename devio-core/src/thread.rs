//! Read-side rendering of a post with its nested comments.

use crate::store::{CommentStore, StoreResult};
use devio_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::Post,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct PostThread {
    #[serde(flatten)]
    pub post: Post,
    pub thread: Vec<CommentThread>,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, including its root.
    #[must_use]
    pub fn comment_count(&self) -> usize {
        let mut len = 0;
        let mut pending = vec![self];
        while let Some(thread) = pending.pop() {
            len += 1;
            pending.extend(&thread.replies);
        }
        len
    }
}

/// Fetches every comment reachable from `roots` and nests them.
///
/// Dangling references are skipped. Runs without locks, so a concurrent writer
/// may make the result slightly stale but never inconsistent with itself.
pub async fn resolve<C>(store: &C, roots: &[Id<CommentMarker>]) -> StoreResult<Vec<CommentThread>>
where
    C: CommentStore + ?Sized,
{
    let mut nodes: HashMap<Id<CommentMarker>, Comment> = HashMap::new();
    let mut queue: VecDeque<Id<CommentMarker>> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if nodes.contains_key(&id) {
            continue;
        }
        match store.comment(id).await? {
            Some(comment) => {
                queue.extend(comment.children.iter().copied());
                nodes.insert(id, comment);
            }
            None => warn!(comment = %id, "Skipping dangling comment reference"),
        }
    }

    // Children are finished before their parent, so each parent can take its
    // replies out of `built` in stored order.
    let mut built: HashMap<Id<CommentMarker>, CommentThread> = HashMap::new();
    let mut expanded = HashSet::new();
    let mut pending: Vec<(Id<CommentMarker>, bool)> =
        roots.iter().rev().map(|id| (*id, false)).collect();
    while let Some((id, children_done)) = pending.pop() {
        if children_done {
            if let Some(comment) = nodes.remove(&id) {
                let replies = comment
                    .children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(id, CommentThread { comment, replies });
            }
        } else if let Some(comment) = nodes.get(&id)
            && expanded.insert(id)
        {
            pending.push((id, true));
            pending.extend(comment.children.iter().rev().map(|child| (*child, false)));
        }
    }

    Ok(roots.iter().filter_map(|id| built.remove(id)).collect())
}
