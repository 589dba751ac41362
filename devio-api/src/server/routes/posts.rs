use crate::server::{
    Result, ServerError, ServerRouter, Service, auth::AuthenticatedUser, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use devio_common::model::{
    Id,
    post::{Like, Post, PostMarker},
};
use devio_core::thread::PostThread;
use serde::Deserialize;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
        .typed_patch(like_post)
        .typed_patch(dislike_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts")]
struct PostsPath;

#[derive(Deserialize)]
struct CreatePost {
    text: String,
}

async fn list_posts(_: PostsPath, State(service): State<Service>) -> Result<Json<Vec<Post>>> {
    Ok(Json(service.list_posts().await?))
}

async fn create_post(
    _: PostsPath,
    State(service): State<Service>,
    user: AuthenticatedUser,
    Json(body): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = service.create_post(user.user_id(), &body.text).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}", rejection(ServerError))]
struct PostPath {
    post_id: Id<PostMarker>,
}

async fn get_post(
    PostPath { post_id }: PostPath,
    State(service): State<Service>,
) -> Result<Json<PostThread>> {
    Ok(Json(service.post_thread(post_id).await?))
}

async fn delete_post(
    PostPath { post_id }: PostPath,
    State(service): State<Service>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    Ok(Json(service.delete_post(user.user_id(), post_id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/like", rejection(ServerError))]
struct LikePath {
    post_id: Id<PostMarker>,
}

async fn like_post(
    LikePath { post_id }: LikePath,
    State(service): State<Service>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Like>>> {
    Ok(Json(service.like_post(user.user_id(), post_id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/dislike", rejection(ServerError))]
struct DislikePath {
    post_id: Id<PostMarker>,
}

async fn dislike_post(
    DislikePath { post_id }: DislikePath,
    State(service): State<Service>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Like>>> {
    Ok(Json(service.dislike_post(user.user_id(), post_id).await?))
}
