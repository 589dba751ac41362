use crate::{
    error::StoreError,
    memory::MemoryStore,
    store::{CommentStore, PostStore, StoreResult},
    tree::CommentTree,
};
use async_trait::async_trait;
use devio_common::model::{
    Id,
    comment::{Comment, CommentMarker, NewComment},
    post::{Like, NewPost, Post, PostMarker},
    text::BodyText,
    user::{DisplayName, User, UserMarker},
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::datetime};

pub const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

pub fn user(id: u64) -> User {
    User {
        id: Id::from(id),
        name: DisplayName::new(format!("user{id}")).unwrap(),
        avatar: None,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::default();
        for id in 1..=3 {
            store.insert_user(user(id));
        }
        Self {
            store: Arc::new(store),
        }
    }

    pub fn tree(&self) -> CommentTree<MemoryStore, MemoryStore> {
        CommentTree::new(Arc::clone(&self.store), Arc::clone(&self.store))
    }

    pub async fn post(&self) -> Id<PostMarker> {
        self.store
            .create_post(NewPost {
                author: Id::from(1_u64),
                author_snapshot: user(1).display_snapshot(),
                text: BodyText::new("hello").unwrap(),
                created_at: NOW,
            })
            .await
            .unwrap()
    }

    pub fn root_comment(&self, post: Id<PostMarker>, author: u64) -> NewComment {
        NewComment {
            post,
            parent: None,
            author: Id::from(author),
            author_snapshot: user(author).display_snapshot(),
            text: BodyText::new("comment").unwrap(),
            created_at: NOW,
        }
    }

    pub fn reply(
        &self,
        post: Id<PostMarker>,
        parent: Id<CommentMarker>,
        author: u64,
    ) -> NewComment {
        NewComment {
            parent: Some(parent),
            ..self.root_comment(post, author)
        }
    }
}

#[derive(Debug, Error)]
#[error("Injected {0} failure")]
pub struct InjectedFailure(&'static str);

/// Delegates to a [`MemoryStore`] but can be told to fail link and like changes
/// or subtree deletions.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_updates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_updates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            Err(StoreError::new(InjectedFailure("update")))
        } else {
            Ok(())
        }
    }

    fn check_delete(&self) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            Err(StoreError::new(InjectedFailure("delete")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CommentStore for FlakyStore {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Id<CommentMarker>> {
        self.inner.create_comment(comment).await
    }

    async fn comment(&self, id: Id<CommentMarker>) -> StoreResult<Option<Comment>> {
        self.inner.comment(id).await
    }

    async fn insert_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.insert_reply(parent, child, position).await
    }

    async fn remove_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.remove_reply(parent, child).await
    }

    async fn delete_comment_subtree(&self, id: Id<CommentMarker>) -> StoreResult<usize> {
        self.check_delete()?;
        self.inner.delete_comment_subtree(id).await
    }
}

#[async_trait]
impl PostStore for FlakyStore {
    async fn create_post(&self, post: NewPost) -> StoreResult<Id<PostMarker>> {
        self.inner.create_post(post).await
    }

    async fn post(&self, id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        self.inner.post(id).await
    }

    async fn insert_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.insert_root(post, comment, position).await
    }

    async fn remove_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.remove_root(post, comment).await
    }

    async fn add_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        self.check()?;
        self.inner.add_like(post, user).await
    }

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        self.check()?;
        self.inner.remove_like(post, user).await
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> StoreResult<bool> {
        self.inner.delete_post(id).await
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        self.inner.list_posts().await
    }

    async fn posts_by_author(&self, author: Id<UserMarker>) -> StoreResult<Vec<Post>> {
        self.inner.posts_by_author(author).await
    }
}
