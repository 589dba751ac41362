use crate::client::DbClient;
use async_trait::async_trait;
use devio_common::model::{
    Id,
    auth::SessionToken,
    comment::{Comment, CommentMarker, NewComment},
    post::{Like, NewPost, Post, PostMarker},
    user::{User, UserMarker},
};
use devio_core::{
    StoreError,
    store::{AuthError, CommentStore, IdentityGate, PostStore, ProfileDirectory, StoreResult},
};
use time::OffsetDateTime;
use tracing::debug;

#[async_trait]
impl CommentStore for DbClient {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Id<CommentMarker>> {
        Ok(self.insert_comment(&comment).await?)
    }

    async fn comment(&self, id: Id<CommentMarker>) -> StoreResult<Option<Comment>> {
        Ok(self.fetch_comment(id).await?)
    }

    async fn insert_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        Ok(self.link_reply(parent, child, position).await?)
    }

    async fn remove_reply(
        &self,
        parent: Id<CommentMarker>,
        child: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        Ok(self.unlink_reply(parent, child).await?)
    }

    async fn delete_comment_subtree(&self, id: Id<CommentMarker>) -> StoreResult<usize> {
        Ok(self.remove_comment_subtree(id).await?)
    }
}

#[async_trait]
impl PostStore for DbClient {
    async fn create_post(&self, post: NewPost) -> StoreResult<Id<PostMarker>> {
        Ok(self.insert_post(&post).await?)
    }

    async fn post(&self, id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        Ok(self.fetch_post(id).await?)
    }

    async fn insert_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
        position: usize,
    ) -> StoreResult<bool> {
        Ok(self.link_root(post, comment, position).await?)
    }

    async fn remove_root(
        &self,
        post: Id<PostMarker>,
        comment: Id<CommentMarker>,
    ) -> StoreResult<bool> {
        Ok(self.unlink_root(post, comment).await?)
    }

    async fn add_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        Ok(self.insert_like(post, user).await?)
    }

    async fn remove_like(
        &self,
        post: Id<PostMarker>,
        user: Id<UserMarker>,
    ) -> StoreResult<Option<Vec<Like>>> {
        Ok(self.delete_like(post, user).await?)
    }

    async fn delete_post(&self, id: Id<PostMarker>) -> StoreResult<bool> {
        Ok(self.remove_post(id).await?)
    }

    async fn list_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.fetch_posts(None).await?)
    }

    async fn posts_by_author(&self, author: Id<UserMarker>) -> StoreResult<Vec<Post>> {
        Ok(self.fetch_posts(Some(author)).await?)
    }
}

#[async_trait]
impl ProfileDirectory for DbClient {
    async fn user(&self, id: Id<UserMarker>) -> StoreResult<Option<User>> {
        Ok(self.fetch_user(id).await?)
    }
}

#[async_trait]
impl IdentityGate for DbClient {
    async fn authenticate(&self, credential: &str) -> Result<Id<UserMarker>, AuthError> {
        let token: SessionToken = credential.parse()?;
        let user_id = token.user_id;

        // Argon2 hashing blocks.
        let token_hash = tokio::task::spawn_blocking(move || token.hash())
            .await
            .map_err(StoreError::new)??;

        let session = self
            .fetch_session(&token_hash)
            .await
            .map_err(StoreError::from)?
            .ok_or(AuthError::Rejected)?;

        if session.user != user_id || session.is_expired_at(OffsetDateTime::now_utc()) {
            debug!(user = %user_id, "Rejected session");
            return Err(AuthError::Rejected);
        }

        Ok(session.user)
    }
}
