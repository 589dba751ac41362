//! Likes on posts.
//!
//! A like is the presence of a user's marker on the post; disliking removes that
//! marker again. Repeating either action is reported, never ignored.

use crate::{
    error::{Result, ThreadError},
    store::PostStore,
};
use derive_where::derive_where;
use devio_common::model::{
    Id,
    post::{Like, PostMarker},
    user::UserMarker,
};
use std::sync::Arc;
use tracing::debug;

#[derive_where(Clone)]
pub struct Reactions<P> {
    posts: Arc<P>,
}

impl<P: PostStore> Reactions<P> {
    pub fn new(posts: Arc<P>) -> Self {
        Self { posts }
    }

    /// Returns the post's likes after adding `user`'s.
    pub async fn like(&self, post: Id<PostMarker>, user: Id<UserMarker>) -> Result<Vec<Like>> {
        match self.posts.add_like(post, user).await? {
            Some(likes) => {
                debug!(%post, %user, likes = likes.len(), "Liked post");
                Ok(likes)
            }
            None => Err(self.unchanged(post, ThreadError::AlreadyLiked(post)).await),
        }
    }

    /// Returns the post's likes after removing `user`'s.
    pub async fn dislike(&self, post: Id<PostMarker>, user: Id<UserMarker>) -> Result<Vec<Like>> {
        match self.posts.remove_like(post, user).await? {
            Some(likes) => {
                debug!(%post, %user, likes = likes.len(), "Disliked post");
                Ok(likes)
            }
            None => Err(self.unchanged(post, ThreadError::NotLiked(post)).await),
        }
    }

    /// Tells a missing post apart from a repeated reaction.
    async fn unchanged(&self, post: Id<PostMarker>, repeated: ThreadError) -> ThreadError {
        match self.posts.post(post).await {
            Ok(Some(_)) => repeated,
            Ok(None) => ThreadError::PostNotFound(post),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{ErrorKind, ThreadError},
        reaction::Reactions,
        store::PostStore,
        testing::{Fixture, FlakyStore},
    };
    use devio_common::model::Id;
    use std::sync::Arc;

    #[tokio::test]
    async fn like_then_like_again() {
        let fx = Fixture::new();
        let post = fx.post().await;
        let reactions = Reactions::new(Arc::clone(&fx.store));

        let likes = reactions.like(post, Id::from(1_u64)).await.unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].user, Id::from(1_u64));

        let err = reactions.like(post, Id::from(1_u64)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyLiked);
        assert_eq!(fx.store.post(post).await.unwrap().unwrap().likes, likes);
    }

    #[tokio::test]
    async fn like_dislike_dislike() {
        let fx = Fixture::new();
        let post = fx.post().await;
        let reactions = Reactions::new(Arc::clone(&fx.store));

        reactions.like(post, Id::from(1_u64)).await.unwrap();
        let likes = reactions.dislike(post, Id::from(1_u64)).await.unwrap();
        assert!(likes.is_empty());

        let err = reactions.dislike(post, Id::from(1_u64)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotLiked);
    }

    #[tokio::test]
    async fn unknown_post() {
        let fx = Fixture::new();
        let reactions = Reactions::new(Arc::clone(&fx.store));

        let like = reactions
            .like(Id::from(404_u64), Id::from(1_u64))
            .await
            .unwrap_err();
        let dislike = reactions
            .dislike(Id::from(404_u64), Id::from(1_u64))
            .await
            .unwrap_err();

        assert!(matches!(like, ThreadError::PostNotFound(_)));
        assert!(matches!(dislike, ThreadError::PostNotFound(_)));
    }

    #[tokio::test]
    async fn dislike_removes_only_that_user() {
        let fx = Fixture::new();
        let post = fx.post().await;
        let reactions = Reactions::new(Arc::clone(&fx.store));

        for user in 1..=3_u64 {
            reactions.like(post, Id::from(user)).await.unwrap();
        }
        let likes = reactions.dislike(post, Id::from(2_u64)).await.unwrap();

        let users: Vec<_> = likes.iter().map(|like| like.user).collect();
        assert_eq!(users, vec![Id::from(3_u64), Id::from(1_u64)]);
    }

    #[tokio::test]
    async fn failed_like_is_a_store_error() {
        let fx = Fixture::new();
        let post = fx.post().await;
        let flaky = Arc::new(FlakyStore::new(Arc::clone(&fx.store)));
        flaky.fail_updates(true);

        let err = Reactions::new(flaky)
            .like(post, Id::from(1_u64))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Store);
        assert!(fx.store.post(post).await.unwrap().unwrap().likes.is_empty());
    }
}
