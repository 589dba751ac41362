use crate::server::{Result, ServerError, ServerRouter, Service, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use devio_common::model::{
    Id,
    post::Post,
    user::{User, UserMarker},
};
use serde::Deserialize;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_user)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user_id}", rejection(ServerError))]
struct UserPath {
    user_id: Id<UserMarker>,
}

async fn get_user(
    UserPath { user_id }: UserPath,
    State(service): State<Service>,
) -> Result<Json<User>> {
    Ok(Json(service.user(user_id).await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{user_id}/posts", rejection(ServerError))]
struct UserPostsPath {
    user_id: Id<UserMarker>,
}

async fn get_user_posts(
    UserPostsPath { user_id }: UserPostsPath,
    State(service): State<Service>,
) -> Result<Json<Vec<Post>>> {
    Ok(Json(service.user_posts(user_id).await?))
}
