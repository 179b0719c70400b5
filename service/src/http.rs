//! `POST /api/v1/comments`.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use comments_kafka::{KafkaError, KafkaMessage, Publisher, PublisherExt};
use comments_messages::{Comment, TopicRouter};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Shared state of the comments API.
#[derive(Clone)]
pub struct AppState {
    publisher: Arc<dyn Publisher>,
    router: Arc<TopicRouter>,
}

impl AppState {
    pub fn new(publisher: Arc<dyn Publisher>, router: TopicRouter) -> Self {
        Self {
            publisher,
            router: Arc::new(router),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/comments", post(create_comment))
        .with_state(state)
}

/// Body of every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

impl ApiResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            comment: None,
        }
    }
}

/// Errors the comments API reports to clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body is not a comment.
    #[error("unable to parse comment: {0}")]
    Parse(String),

    /// The comment could not be serialized.
    #[error("unable to encode comment: {0}")]
    Encode(#[source] serde_json::Error),

    /// The broker did not acknowledge the comment.
    #[error("unable to push comment to topic '{topic}': {source}")]
    Publish {
        topic: String,
        #[source]
        source: KafkaError,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Parse(reason) => {
                debug!("Rejecting comment: {}", reason);
                (StatusCode::BAD_REQUEST, "Unable to parse")
            }
            ApiError::Encode(_) => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error encoding comment")
            }
            ApiError::Publish { .. } => {
                error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error pushing comment")
            }
        };
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

/// A comment read from a JSON, urlencoded form or multipart form body.
///
/// Bodies without a content type are read as JSON.
pub struct CommentBody(pub Comment);

impl<S> FromRequest<S> for CommentBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(comment) = Form::<Comment>::from_request(req, state)
                .await
                .map_err(|e| ApiError::Parse(e.body_text()))?;
            return Ok(Self(comment));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::Parse(e.body_text()))?;
            return read_multipart(multipart).await.map(Self);
        }

        if !content_type.is_empty() && !content_type.starts_with("application/json") {
            return Err(ApiError::Parse(format!(
                "unsupported content type '{content_type}'"
            )));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Parse(e.body_text()))?;
        let comment = Comment::decode(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(Self(comment))
    }
}

/// Reads the `text` and `type` fields of a multipart form. Other fields are
/// ignored; missing ones keep their zero value.
async fn read_multipart(mut multipart: Multipart) -> Result<Comment, ApiError> {
    let mut comment = Comment::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Parse(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "text" && name != "type" {
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| ApiError::Parse(e.body_text()))?;
        if name == "text" {
            comment.text = value;
        } else {
            comment.kind = value
                .trim()
                .parse()
                .map_err(|_| ApiError::Parse(format!("invalid comment type '{value}'")))?;
        }
    }
    Ok(comment)
}

async fn create_comment(
    State(state): State<AppState>,
    CommentBody(comment): CommentBody,
) -> Result<Json<ApiResponse>, ApiError> {
    state
        .publisher
        .send(&state.router, &comment)
        .await
        .map_err(|e| match e {
            KafkaError::Serialization(e) => ApiError::Encode(e),
            source => ApiError::Publish {
                topic: comment.topic(&state.router).to_string(),
                source,
            },
        })?;

    Ok(Json(ApiResponse {
        success: true,
        message: "Comment pushed successfully".to_string(),
        comment: Some(comment),
    }))
}
