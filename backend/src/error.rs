use actix_multipart::MultipartError;
use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

use crate::inference::PipelineError;

/// Rejections of the upload itself; their messages are safe to return verbatim.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No image file provided")]
    MissingImage,
    #[error("No selected file")]
    EmptyFilename,
    #[error("Invalid file format. Please upload PNG or JPG images.")]
    UnsupportedExtension,
    #[error("Image exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Malformed multipart upload: {0}")]
    Upload(#[from] MultipartError),
    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Inference task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl ApiError {
    /// Message sent to the client. Server-side detail stays in the logs.
    fn client_message(&self) -> String {
        match self {
            ApiError::Validation(e) => e.to_string(),
            ApiError::Upload(_) => "Malformed multipart upload".into(),
            ApiError::Pipeline(PipelineError::Decode(_)) => "Failed to decode image".into(),
            ApiError::Pipeline(PipelineError::Normalize(_)) => "Failed to preprocess image".into(),
            ApiError::Pipeline(PipelineError::Inference(_)) | ApiError::Blocking(_) => {
                "Model inference failed".into()
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Validation(_) | ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Analysis failed: {:?}", self);
        } else {
            log::warn!("Rejected upload: {}", self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.client_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::model::InferenceError;
    use crate::inference::preprocess::DecodeError;
    use actix_web::body::to_bytes;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn validation_messages_pass_through() {
        let (status, body) = body_of(ValidationError::UnsupportedExtension.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Invalid file format. Please upload PNG or JPG images."
        );
    }

    #[actix_web::test]
    async fn oversized_upload_maps_to_413() {
        let (status, body) = body_of(ValidationError::TooLarge { limit: 10 }.into()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].as_str().unwrap().contains("10 byte"));
    }

    #[actix_web::test]
    async fn pipeline_detail_is_not_leaked() {
        let error = ApiError::Pipeline(PipelineError::Inference(InferenceError::Runtime(
            "CUDA error: device-side assert triggered".into(),
        )));
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Model inference failed");

        let (status, body) = body_of(ApiError::Pipeline(DecodeError::Empty.into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to decode image");
    }
}
