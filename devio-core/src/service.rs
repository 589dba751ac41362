use crate::{
    error::{Result, ThreadError, ValidationError},
    lock::PostLocks,
    reaction::Reactions,
    store::{CommentStore, PostStore, ProfileDirectory},
    thread::{self, PostThread},
    tree::CommentTree,
};
use derive_where::derive_where;
use devio_common::model::{
    Id,
    comment::{Comment, CommentMarker, NewComment},
    post::{Like, NewPost, Post, PostMarker},
    text::BodyText,
    user::{DisplaySnapshot, User, UserMarker},
};
use std::{future::Future, sync::Arc};
use time::OffsetDateTime;
use tracing::info;

fn body_text(text: &str) -> Result<BodyText> {
    BodyText::new(text).map_err(|err| ValidationError::new("text", err).into())
}

/// Public operations on posts, their comments and likes.
///
/// Mutations of one post run one at a time and on their own task, so a caller
/// that stops waiting cannot leave a mutation half done. Mutations therefore need
/// a tokio runtime.
#[derive_where(Clone)]
pub struct PostService<P, C, U> {
    posts: Arc<P>,
    comments: Arc<C>,
    users: Arc<U>,
    locks: Arc<PostLocks>,
    tree: CommentTree<P, C>,
    reactions: Reactions<P>,
}

impl<P, C, U> PostService<P, C, U>
where
    P: PostStore + 'static,
    C: CommentStore + 'static,
    U: ProfileDirectory + 'static,
{
    pub fn new(posts: Arc<P>, comments: Arc<C>, users: Arc<U>) -> Self {
        Self {
            tree: CommentTree::new(Arc::clone(&posts), Arc::clone(&comments)),
            reactions: Reactions::new(Arc::clone(&posts)),
            locks: Arc::new(PostLocks::new()),
            posts,
            comments,
            users,
        }
    }

    async fn serialized<T, F, Fut>(&self, post: Id<PostMarker>, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Self) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            let _guard = service.locks.lock(post).await;
            operation(service.clone()).await
        })
        .await?
    }

    async fn display_snapshot(&self, user: Id<UserMarker>) -> Result<DisplaySnapshot> {
        self.users
            .display_snapshot(user)
            .await?
            .ok_or(ThreadError::UserNotFound(user))
    }

    pub async fn user(&self, id: Id<UserMarker>) -> Result<User> {
        self.users
            .user(id)
            .await?
            .ok_or(ThreadError::UserNotFound(id))
    }

    pub async fn create_post(&self, author: Id<UserMarker>, text: &str) -> Result<Post> {
        let text = body_text(text)?;
        let new = NewPost {
            author,
            author_snapshot: self.display_snapshot(author).await?,
            text,
            created_at: OffsetDateTime::now_utc(),
        };

        let id = self.posts.create_post(new.clone()).await?;
        info!(post = %id, %author, "Created post");
        Ok(new.into_post(id))
    }

    /// All posts, newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.list_posts().await?)
    }

    pub async fn post_thread(&self, id: Id<PostMarker>) -> Result<PostThread> {
        let post = self
            .posts
            .post(id)
            .await?
            .ok_or(ThreadError::PostNotFound(id))?;
        let thread = thread::resolve(self.comments.as_ref(), &post.comments).await?;

        Ok(PostThread { post, thread })
    }

    pub async fn user_posts(&self, user: Id<UserMarker>) -> Result<Vec<Post>> {
        self.user(user).await?;
        Ok(self.posts.posts_by_author(user).await?)
    }

    /// Deletes the post together with all of its comments. The comments go first,
    /// so a failure leaves the post in place with its remaining forest intact.
    pub async fn delete_post(&self, requester: Id<UserMarker>, id: Id<PostMarker>) -> Result<Post> {
        self.serialized(id, move |service| async move {
            let post = service
                .posts
                .post(id)
                .await?
                .ok_or(ThreadError::PostNotFound(id))?;
            if post.author != requester {
                return Err(ThreadError::NotPostAuthor(id));
            }

            let removed = service.tree.clear(&post).await?;
            if !service.posts.delete_post(id).await? {
                return Err(ThreadError::PostNotFound(id));
            }

            info!(post = %id, comments = removed, "Deleted post");
            Ok(post)
        })
        .await
    }

    pub async fn add_comment(
        &self,
        requester: Id<UserMarker>,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        text: &str,
    ) -> Result<Comment> {
        let text = body_text(text)?;
        let new = NewComment {
            post,
            parent,
            author: requester,
            author_snapshot: self.display_snapshot(requester).await?,
            text,
            created_at: OffsetDateTime::now_utc(),
        };

        self.serialized(post, move |service| async move {
            service.tree.insert(new).await
        })
        .await
    }

    /// Returns the number of comments removed.
    pub async fn delete_comment(
        &self,
        requester: Id<UserMarker>,
        post: Id<PostMarker>,
        parent: Option<Id<CommentMarker>>,
        comment: Id<CommentMarker>,
    ) -> Result<usize> {
        self.serialized(post, move |service| async move {
            service.tree.delete(post, parent, comment, requester).await
        })
        .await
    }

    pub async fn like_post(
        &self,
        requester: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Vec<Like>> {
        self.serialized(post, move |service| async move {
            service.reactions.like(post, requester).await
        })
        .await
    }

    pub async fn dislike_post(
        &self,
        requester: Id<UserMarker>,
        post: Id<PostMarker>,
    ) -> Result<Vec<Like>> {
        self.serialized(post, move |service| async move {
            service.reactions.dislike(post, requester).await
        })
        .await
    }
}
