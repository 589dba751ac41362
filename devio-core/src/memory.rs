//! In-memory implementations of every store trait.
//!
//! Backed by hash maps behind `parking_lot` locks. Good for tests and for running
//! the service without a database.

use crate::store::{CommentStore, PostStore, ProfileDirectory, StoreResult};
use async_trait::async_trait;
use devio_common::{
    model::{
        DevioSnowflakeGenerator, Id,
        comment::{Comment, CommentMarker, NewComment},
        post::{Like, NewPost, Post, PostMarker},
        user::{User, UserMarker},
    },
    snowflake::{ProcessId, WorkerId},
};
use parking_lot::RwLock;
use std::{cmp::Reverse, collections::HashMap};

#[derive(Debug)]
pub struct MemoryStore {
    ids: DevioSnowflakeGenerator,
    posts: RwLock<HashMap<Id<PostMarker>, Post>>,
    comments: RwLock<HashMap<Id<CommentMarker>, Comment>>,
    users: RwLock<HashMap<Id<UserMarker>, User>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            ids: DevioSnowflakeGenerator::new(worker_id, process_id),
            posts: RwLock::default(),
            comments: RwLock::default(),
            users: RwLock::default(),
        }
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().insert(user.id, user);
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.comments.read().len()
    }

    #[must_use]
    pub fn contains_comment(&self, id: Id<CommentMarker>) -> bool {
        self.comments.read().contains_key(&id)
    }

    fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
        posts.sort_by_key(|post| Reverse((post.created_at, post.id)));
        posts
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Id<CommentMarker>> {
        let id = Id::new(self.ids.generate()?);
        self.comments.write().insert(id, comment.into_comment(id));
        Ok(id)
    }

    async fn comment(&self, id: Id<CommentMarker>) -> StoreResult<Option<Comment>> {
        Ok(self.comments.read().get(&id).cloned())
    }

    async fn insert_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        let mut comments = self.comments.write();
        let Some(parent) = comments.get_mut(&parent) else {
            return Ok(false);
        };
        parent.insert_child(position, child);
        Ok(true)
    }

    async fn remove_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        Ok(self
            .comments
            .write()
            .get_mut(&parent)
            .is_some_and(|parent| parent.remove_child(child)))
    }

    async fn delete_comment_subtree(&self, id: Id<CommentMarker>) -> StoreResult<usize> {
        let mut comments = self.comments.write();
        let mut pending = vec![id];
        let mut removed = 0;

        while let Some(id) = pending.pop() {
            if let Some(comment) = comments.remove(&id) {
                removed += 1;
                pending.extend(comment.children);
            }
        }

        Ok(removed)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: NewPost) -> StoreResult<Id<PostMarker>> {
        let id = Id::new(self.ids.generate()?);
        self.posts.write().insert(id, post.into_post(id));
        Ok(id)
    }

    async fn post(&self, id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        Ok(self.posts.read().get(&id).cloned())
    }

    async fn insert_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        let mut posts = self.posts.write();
        let Some(post) = posts.get_mut(&post) else {
            return Ok(false);
        };
        post.insert_root(position, comment);
        Ok(true)
    }

    async fn remove_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        Ok(self
            .posts
            .write()
            .get_mut(&post)
            .is_some_and(|post| post.remove_root(comment)))
    }

    async fn add_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        Ok(self
            .posts
            .write()
            .get_mut(&post)
            .and_then(|post| post.add_like(user).then(|| post.likes.clone())))
    }

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        Ok(self
            .posts
            .write()
            .get_mut(&post)
            .and_then(|post| post.remove_like(user).then(|| post.likes.clone())))
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> StoreResult<bool> {
        let removed = self.posts.write().remove(&id).is_some();
        self.comments.write().retain(|_, comment| comment.post != id);
        Ok(removed)
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().values().cloned().collect();
        Ok(Self::newest_first(posts))
    }

    async fn posts_by_author(&self, author: Id<UserMarker>) -> StoreResult<Vec<Post>> {
        let posts = self
            .posts
            .read()
            .values()
            .filter(|post| post.author == author)
            .cloned()
            .collect();
        Ok(Self::newest_first(posts))
    }
}

#[async_trait]
impl ProfileDirectory for MemoryStore {
    async fn user(&self, id: Id<UserMarker>) -> StoreResult<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        memory::MemoryStore,
        store::{CommentStore, PostStore, ProfileDirectory},
    };
    use devio_common::model::{
        Id,
        comment::NewComment,
        post::NewPost,
        text::BodyText,
        user::{DisplayName, User},
    };
    use time::{Duration, OffsetDateTime, macros::datetime};

    const START: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

    fn ada() -> User {
        User {
            id: Id::from(1_u64),
            name: DisplayName::new("ada".to_owned()).unwrap(),
            avatar: Some("https://example.com/ada.png".to_owned()),
        }
    }

    fn new_post(offset_minutes: i64) -> NewPost {
        NewPost {
            author: ada().id,
            author_snapshot: ada().display_snapshot(),
            text: BodyText::new("post").unwrap(),
            created_at: START + Duration::minutes(offset_minutes),
        }
    }

    fn new_comment(post: Id<devio_common::model::post::PostMarker>) -> NewComment {
        NewComment {
            post,
            parent: None,
            author: ada().id,
            author_snapshot: ada().display_snapshot(),
            text: BodyText::new("comment").unwrap(),
            created_at: START,
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let store = MemoryStore::default();
        let older = store.create_post(new_post(0)).await.unwrap();
        let newer = store.create_post(new_post(5)).await.unwrap();

        let ids: Vec<_> = store
            .list_posts()
            .await
            .unwrap()
            .into_iter()
            .map(|post| post.id)
            .collect();

        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn subtree_delete_follows_children() {
        let store = MemoryStore::default();
        let post = store.create_post(new_post(0)).await.unwrap();
        let root = store.create_comment(new_comment(post)).await.unwrap();
        let child = store.create_comment(new_comment(post)).await.unwrap();
        let grandchild = store.create_comment(new_comment(post)).await.unwrap();
        let unrelated = store.create_comment(new_comment(post)).await.unwrap();

        assert!(store.insert_reply(child, grandchild, 0).await.unwrap());
        assert!(store.insert_reply(root, child, 0).await.unwrap());

        assert_eq!(store.delete_comment_subtree(root).await.unwrap(), 3);
        assert_eq!(store.comment_count(), 1);
        assert!(store.contains_comment(unrelated));
        assert_eq!(store.delete_comment_subtree(root).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn link_changes_report_whether_they_applied() {
        let store = MemoryStore::default();
        let post = store.create_post(new_post(0)).await.unwrap();
        let root = store.create_comment(new_comment(post)).await.unwrap();
        let reply = store.create_comment(new_comment(post)).await.unwrap();

        assert!(store.insert_root(post, root, 0).await.unwrap());
        assert!(!store.insert_root(Id::from(404_u64), root, 0).await.unwrap());
        assert!(store.insert_reply(root, reply, 0).await.unwrap());
        assert!(!store.insert_reply(Id::from(404_u64), reply, 0).await.unwrap());

        assert!(store.remove_reply(root, reply).await.unwrap());
        assert!(!store.remove_reply(root, reply).await.unwrap());
        assert!(store.remove_root(post, root).await.unwrap());
        assert!(!store.remove_root(post, root).await.unwrap());
    }

    #[tokio::test]
    async fn likes_change_only_once_per_user() {
        let store = MemoryStore::default();
        let post = store.create_post(new_post(0)).await.unwrap();

        let likes = store.add_like(post, ada().id).await.unwrap().unwrap();
        assert_eq!(likes.len(), 1);
        assert!(store.add_like(post, ada().id).await.unwrap().is_none());
        assert!(store.add_like(Id::from(404_u64), ada().id).await.unwrap().is_none());

        assert!(store.remove_like(post, ada().id).await.unwrap().unwrap().is_empty());
        assert!(store.remove_like(post, ada().id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_post_drops_its_comments() {
        let store = MemoryStore::default();
        let post = store.create_post(new_post(0)).await.unwrap();
        let other = store.create_post(new_post(1)).await.unwrap();
        store.create_comment(new_comment(post)).await.unwrap();
        let kept = store.create_comment(new_comment(other)).await.unwrap();

        assert!(store.delete_post(post).await.unwrap());
        assert!(!store.delete_post(post).await.unwrap());
        assert_eq!(store.comment_count(), 1);
        assert!(store.contains_comment(kept));
    }

    #[tokio::test]
    async fn directory_snapshots_users() {
        let store = MemoryStore::default();
        store.insert_user(ada());

        let snapshot = store.display_snapshot(ada().id).await.unwrap().unwrap();
        assert_eq!(snapshot.name.get(), "ada");
        assert!(
            store
                .display_snapshot(Id::from(2_u64))
                .await
                .unwrap()
                .is_none()
        );
    }
}
