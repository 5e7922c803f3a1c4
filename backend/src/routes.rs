use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use log::info;
use shared::{BinaryLabel, HealthResponse};
use std::sync::Arc;

use crate::error::ApiError;
use crate::inference::{Pipeline, PredictionResult};
use crate::report;
use crate::state::AppState;
use crate::upload::{self, ImageUpload};

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: Option<String>) {
    cfg.service(
        web::resource("/api/analyze/brain-tumor").route(web::post().to(analyze_brain_tumor)),
    )
    .service(web::resource("/api/analyze/pneumonia").route(web::post().to(analyze_pneumonia)))
    .service(web::resource("/api/health").route(web::get().to(health)));

    if let Some(dir) = frontend_dir {
        cfg.service(Files::new("/", dir).index_file("index.html"));
    }
}

async fn analyze_brain_tumor(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = upload::read_image(payload, state.max_upload_bytes).await?;
    let prediction = classify(state.brain_tumor.clone(), upload).await?;
    Ok(HttpResponse::Ok().json(report::brain_tumor(&prediction)))
}

async fn analyze_pneumonia(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = upload::read_image(payload, state.max_upload_bytes).await?;
    let prediction = classify(state.pneumonia.clone(), upload).await?;
    Ok(HttpResponse::Ok().json(report::pneumonia(&prediction)))
}

/// Runs the blocking pipeline on the blocking thread pool.
async fn classify<L: BinaryLabel>(
    pipeline: Arc<Pipeline<L>>,
    upload: ImageUpload,
) -> Result<PredictionResult<L>, ApiError> {
    let ImageUpload { filename, bytes } = upload;
    let size = bytes.len();
    let name = pipeline.name();

    let prediction = web::block(move || pipeline.predict(&bytes)).await??;
    info!(
        "{}: {} ({} bytes) -> {} ({:.2}%)",
        name, filename, size, prediction.label, prediction.confidence_percent
    );
    Ok(prediction)
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".into(),
        device: format!("{:?}", state.device),
        models: state.model_names(),
    })
}
