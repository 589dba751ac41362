use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use devio_core::{ErrorKind, PostService, ThreadError, store::AuthError};
use devio_db::client::DbClient;
use json::Json;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

mod auth;
mod json;
mod query;
mod routes;

pub type ServerRouter = Router<ServerState>;
pub type Service = PostService<DbClient, DbClient, DbClient>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub service: Service,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Thread(#[from] ThreadError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(rejection) => rejection.status(),
            ServerError::QueryRejection(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::Auth(AuthError::Malformed(_)) => StatusCode::BAD_REQUEST,
            ServerError::Auth(AuthError::Rejected) => StatusCode::UNAUTHORIZED,
            ServerError::JsonResponse(_)
            | ServerError::Auth(AuthError::Hash(_) | AuthError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Thread(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::NotFound | ErrorKind::ParentNotFound => StatusCode::NOT_FOUND,
                ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                ErrorKind::AlreadyLiked | ErrorKind::NotLiked => StatusCode::BAD_REQUEST,
                ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn errors(&self) -> Option<Vec<String>> {
        match self {
            ServerError::Thread(err) => err.detail(),
            _ => None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            "Internal server error".to_owned()
        } else {
            warn!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message,
            errors: self.errors(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ServerError;
    use axum::http::StatusCode;
    use devio_common::model::{Id, auth::SessionToken};
    use devio_core::{StoreError, ThreadError, ValidationError, store::AuthError};

    #[test]
    fn thread_errors_map_to_statuses() {
        let cases = [
            (
                ThreadError::from(ValidationError::new("text", "Text is required")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ThreadError::PostNotFound(Id::from(1_u64)), StatusCode::NOT_FOUND),
            (
                ThreadError::ParentNotFound {
                    post: Id::from(1_u64),
                    parent: Id::from(2_u64),
                },
                StatusCode::NOT_FOUND,
            ),
            (ThreadError::NotPostAuthor(Id::from(1_u64)), StatusCode::FORBIDDEN),
            (ThreadError::AlreadyLiked(Id::from(1_u64)), StatusCode::BAD_REQUEST),
            (ThreadError::NotLiked(Id::from(1_u64)), StatusCode::BAD_REQUEST),
            (
                ThreadError::Store(StoreError::new(std::io::Error::other("down"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        let malformed = "nonsense"
            .parse::<SessionToken>()
            .expect_err("token without parts");
        assert_eq!(
            ServerError::from(AuthError::from(malformed)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::from(AuthError::Rejected).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn only_validation_errors_carry_details() {
        let validation = ServerError::from(ThreadError::from(ValidationError::new(
            "text",
            "Text is required",
        )));
        assert_eq!(
            validation.errors(),
            Some(vec!["text: Text is required".to_owned()])
        );

        let not_found = ServerError::from(ThreadError::PostNotFound(Id::from(1_u64)));
        assert_eq!(not_found.errors(), None);
    }
}
