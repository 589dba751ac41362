use crate::server::{
    Result, ServerError, ServerRouter, Service, auth::AuthenticatedUser, json::Json, query::Query,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use devio_common::model::{
    Id,
    comment::{Comment, CommentMarker},
    post::PostMarker,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(add_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments", rejection(ServerError))]
struct CommentsPath {
    post_id: Id<PostMarker>,
}

#[derive(Deserialize)]
struct AddComment {
    #[serde(default)]
    parent_comment_id: Option<Id<CommentMarker>>,
    text: String,
}

async fn add_comment(
    CommentsPath { post_id }: CommentsPath,
    State(service): State<Service>,
    user: AuthenticatedUser,
    Json(body): Json<AddComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let comment = service
        .add_comment(user.user_id(), post_id, body.parent_comment_id, &body.text)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments/{comment_id}", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

#[derive(Deserialize)]
struct DeleteCommentQuery {
    parent_comment_id: Option<Id<CommentMarker>>,
}

#[derive(Serialize)]
struct DeletedComments {
    removed: usize,
}

async fn delete_comment(
    CommentPath {
        post_id,
        comment_id,
    }: CommentPath,
    State(service): State<Service>,
    user: AuthenticatedUser,
    Query(query): Query<DeleteCommentQuery>,
) -> Result<Json<DeletedComments>> {
    let removed = service
        .delete_comment(user.user_id(), post_id, query.parent_comment_id, comment_id)
        .await?;

    Ok(Json(DeletedComments { removed }))
}
