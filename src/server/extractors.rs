//! Custom extractors for the HTTP server.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::{ErrorDetail, ErrorResponse};

/// Rejection type for `MsgPackExtractor`
#[derive(Debug)]
pub struct MsgPackRejection {
    message: String,
}

impl IntoResponse for MsgPackRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: "DESERIALIZATION_ERROR",
                message: self.message.clone(),
            },
        };

        match rmp_serde::to_vec_named(&body) {
            Ok(bytes) => (
                StatusCode::BAD_REQUEST,
                [("content-type", "application/msgpack")],
                bytes,
            )
                .into_response(),
            Err(_) => (StatusCode::BAD_REQUEST, self.message).into_response(),
        }
    }
}

/// Extractor for `MessagePack` request bodies.
///
/// Accepts `application/msgpack` and `application/x-msgpack`. A missing
/// content type is tolerated.
pub struct MsgPackExtractor<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for MsgPackExtractor<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = MsgPackRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.contains("msgpack") && !content_type.is_empty() {
            return Err(MsgPackRejection {
                message: format!(
                    "Invalid content type: expected application/msgpack, got {content_type}"
                ),
            });
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| MsgPackRejection {
                message: format!("Failed to read request body: {e}"),
            })?;

        rmp_serde::from_slice(&bytes)
            .map(MsgPackExtractor)
            .map_err(|e| MsgPackRejection {
                message: format!("Failed to deserialize MessagePack: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordInteractionRequest;
    use axum::body::Body;

    fn request(content_type: &str, body: Vec<u8>) -> Request {
        Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_interaction_request() {
        let body = rmp_serde::to_vec_named(&serde_json::json!({
            "user_id": "u1",
            "vehicle_id": "v1",
            "interaction_type": "save",
        }))
        .unwrap();

        let MsgPackExtractor(req) = MsgPackExtractor::<RecordInteractionRequest>::from_request(
            request("application/x-msgpack", body),
            &(),
        )
        .await
        .unwrap();

        assert_eq!(req.vehicle_id, "v1");
        assert!(req.timestamp.is_none());
        assert!(req.explicit_score.is_none());
    }

    #[tokio::test]
    async fn test_rejects_json_content_type() {
        let result = MsgPackExtractor::<RecordInteractionRequest>::from_request(
            request("application/json", b"{}".to_vec()),
            &(),
        )
        .await;

        let response = result.err().unwrap().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
