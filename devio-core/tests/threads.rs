use devio_common::model::{
    Id,
    comment::CommentMarker,
    post::PostMarker,
    user::{DisplayName, User, UserMarker},
};
use devio_core::{
    ErrorKind, PostService,
    memory::MemoryStore,
    store::{CommentStore, PostStore},
};
use std::{collections::VecDeque, sync::Arc};

type Service = PostService<MemoryStore, MemoryStore, MemoryStore>;

const U1: u64 = 1;
const U2: u64 = 2;
const U3: u64 = 3;

fn setup() -> (Arc<MemoryStore>, Service) {
    let store = Arc::new(MemoryStore::default());
    for id in [U1, U2, U3] {
        store.insert_user(User {
            id: Id::from(id),
            name: DisplayName::new(format!("user{id}")).unwrap(),
            avatar: None,
        });
    }
    let service = PostService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
    );
    (store, service)
}

fn user(id: u64) -> Id<UserMarker> {
    Id::from(id)
}

/// Walks the forest of `post` and checks every edge against the stored comments.
async fn assert_forest_consistent(store: &MemoryStore, post: Id<PostMarker>) -> usize {
    let post = store.post(post).await.unwrap().unwrap();
    let mut pending: VecDeque<(Id<CommentMarker>, Option<Id<CommentMarker>>)> =
        post.comments.iter().map(|id| (*id, None)).collect();
    let mut reachable = 0;

    while let Some((id, parent)) = pending.pop_front() {
        let comment = store
            .comment(id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("comment {id} is referenced but not stored"));
        assert_eq!(comment.parent, parent);
        assert_eq!(comment.post, post.id);
        reachable += 1;
        pending.extend(comment.children.iter().map(|child| (*child, Some(id))));
    }

    reachable
}

#[tokio::test]
async fn comment_thread_lifecycle() {
    let (store, service) = setup();

    let post = service.create_post(user(U1), "hello").await.unwrap();
    let listed: Vec<_> = service
        .list_posts()
        .await
        .unwrap()
        .into_iter()
        .map(|post| post.id)
        .collect();
    assert_eq!(listed, vec![post.id]);

    let c1 = service
        .add_comment(user(U2), post.id, None, "c1")
        .await
        .unwrap();
    assert_eq!(store.post(post.id).await.unwrap().unwrap().comments, vec![c1.id]);

    let c2 = service
        .add_comment(user(U3), post.id, Some(c1.id), "c2")
        .await
        .unwrap();
    assert_eq!(store.comment(c1.id).await.unwrap().unwrap().children, vec![c2.id]);
    assert_eq!(assert_forest_consistent(&store, post.id).await, 2);

    let removed = service
        .delete_comment(user(U2), post.id, None, c1.id)
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert!(!store.contains_comment(c1.id));
    assert!(!store.contains_comment(c2.id));
    assert!(store.post(post.id).await.unwrap().unwrap().comments.is_empty());

    let again = service
        .delete_comment(user(U2), post.id, None, c1.id)
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn like_toggle_lifecycle() {
    let (store, service) = setup();
    let post = service.create_post(user(U1), "hello").await.unwrap();

    let likes = service.like_post(user(U1), post.id).await.unwrap();
    assert_eq!(likes.iter().map(|like| like.user).collect::<Vec<_>>(), vec![user(U1)]);

    let err = service.like_post(user(U1), post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyLiked);
    assert_eq!(store.post(post.id).await.unwrap().unwrap().likes, likes);

    assert!(service.dislike_post(user(U1), post.id).await.unwrap().is_empty());

    let err = service.dislike_post(user(U1), post.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotLiked);
}

#[tokio::test]
async fn failed_insert_leaves_no_orphan() {
    let (store, service) = setup();
    let post = service.create_post(user(U1), "hello").await.unwrap();
    let before = store.comment_count();

    let err = service
        .add_comment(user(U2), post.id, Some(Id::from(12_345_u64)), "lost")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ParentNotFound);
    assert_eq!(store.comment_count(), before);
}

#[tokio::test]
async fn cascade_delete_at_every_depth() {
    for depth in 1..=6 {
        let (store, service) = setup();
        let post = service.create_post(user(U1), "hello").await.unwrap();
        let keep = service
            .add_comment(user(U1), post.id, None, "keep")
            .await
            .unwrap();

        // A chain `depth` levels deep with a side reply hanging off every level.
        let root = service
            .add_comment(user(U2), post.id, None, "root")
            .await
            .unwrap();
        let mut parent = root.id;
        for level in 0..depth {
            service
                .add_comment(user(U3), post.id, Some(parent), &format!("side {level}"))
                .await
                .unwrap();
            parent = service
                .add_comment(user(U3), post.id, Some(parent), &format!("level {level}"))
                .await
                .unwrap()
                .id;
        }
        assert_eq!(assert_forest_consistent(&store, post.id).await, 2 + 2 * depth);

        let removed = service
            .delete_comment(user(U2), post.id, None, root.id)
            .await
            .unwrap();

        assert_eq!(removed, 1 + 2 * depth);
        assert_eq!(store.comment_count(), 1);
        assert_eq!(assert_forest_consistent(&store, post.id).await, 1);
        assert!(store.contains_comment(keep.id));
    }
}

#[tokio::test]
async fn strangers_cannot_delete() {
    let (store, service) = setup();
    let post = service.create_post(user(U1), "hello").await.unwrap();
    let comment = service
        .add_comment(user(U2), post.id, None, "mine")
        .await
        .unwrap();

    let post_err = service.delete_post(user(U2), post.id).await.unwrap_err();
    let comment_err = service
        .delete_comment(user(U1), post.id, None, comment.id)
        .await
        .unwrap_err();

    assert_eq!(post_err.kind(), ErrorKind::Forbidden);
    assert_eq!(comment_err.kind(), ErrorKind::Forbidden);
    let stored = store.post(post.id).await.unwrap().unwrap();
    assert_eq!(stored.comments, vec![comment.id]);
    assert_eq!(store.comment(comment.id).await.unwrap(), Some(comment));
}

#[tokio::test]
async fn comments_cannot_be_deleted_through_another_post() {
    let (store, service) = setup();
    let first = service.create_post(user(U1), "first").await.unwrap();
    let second = service.create_post(user(U1), "second").await.unwrap();
    let comment = service
        .add_comment(user(U2), first.id, None, "here")
        .await
        .unwrap();

    let err = service
        .delete_comment(user(U2), second.id, None, comment.id)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(store.contains_comment(comment.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_racing_a_reply_leaves_no_orphans() {
    let (store, service) = setup();
    let post = service.create_post(user(U1), "hello").await.unwrap().id;

    for round in 0..64 {
        let parent = service
            .add_comment(user(U2), post, None, "parent")
            .await
            .unwrap()
            .id;

        let deleting = {
            let service = service.clone();
            tokio::spawn(async move { service.delete_comment(user(U2), post, None, parent).await })
        };
        let replying = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .add_comment(user(U3), post, Some(parent), &format!("reply {round}"))
                    .await
            })
        };

        let removed = deleting.await.unwrap().unwrap();
        match replying.await.unwrap() {
            Ok(reply) => {
                assert_eq!(removed, 2);
                assert!(!store.contains_comment(reply.id));
            }
            Err(err) => {
                assert_eq!(err.kind(), ErrorKind::ParentNotFound);
                assert_eq!(removed, 1);
            }
        }
        assert_eq!(store.comment_count(), 0);
        assert_eq!(assert_forest_consistent(&store, post).await, 0);
    }
}
