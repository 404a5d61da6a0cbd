//! HTTP handler functions for the safety map API.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use futures::StreamExt as _;
use safety_map_server_models::{ApiDataset, ApiError, ApiHealth};
use safety_map_stream::StreamError;
use safety_map_stream::publisher::{PublishOptions, publish};
use safety_map_stream::reader::RecordReader;
use safety_map_stream::row::CsvRecord;
use safety_map_stream_models::{AccidentRecord, Dataset, EmergencyCall};
use tokio_util::sync::CancellationToken;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/datasets`
///
/// Lists every dataset and whether its backing file is present.
pub async fn datasets(state: web::Data<AppState>) -> HttpResponse {
    let mut list = Vec::with_capacity(Dataset::ALL.len());
    for dataset in Dataset::ALL {
        let available = tokio::fs::metadata(state.config.csv_path(*dataset))
            .await
            .is_ok_and(|meta| meta.is_file());
        list.push(ApiDataset::new(*dataset, available));
    }

    HttpResponse::Ok().json(list)
}

/// `GET /api/dial112/stream`
pub async fn dial112_stream(state: web::Data<AppState>) -> HttpResponse {
    stream::<EmergencyCall>(&state, Dataset::Dial112).await
}

/// `GET /api/accidents/stream`
pub async fn accidents_stream(state: web::Data<AppState>) -> HttpResponse {
    stream::<AccidentRecord>(&state, Dataset::Accidents).await
}

/// Opens the dataset's file and streams it as `text/event-stream`.
///
/// A missing file answers 404 before any frame is sent. Once streaming has
/// started the status is fixed; a read failure ends the body early.
async fn stream<T>(state: &AppState, dataset: Dataset) -> HttpResponse
where
    T: CsvRecord + Send + 'static,
{
    let path = state.config.csv_path(dataset);

    let reader = match RecordReader::<T>::open(&path, CancellationToken::new()).await {
        Ok(reader) => reader,
        Err(StreamError::NotFound { path }) => {
            log::warn!("{dataset} stream requested but {} is missing", path.display());
            return HttpResponse::NotFound().json(ApiError::new("CSV file not found"));
        }
        Err(e) => {
            log::error!("Failed to open {dataset} stream: {e}");
            return HttpResponse::InternalServerError().json(ApiError::new("SSE init failed"));
        }
    };

    let frames = publish(reader, PublishOptions::default())
        .into_stream()
        .map(|frame| frame.map(web::Bytes::from));

    HttpResponse::Ok()
        .content_type("text/event-stream; charset=utf-8")
        .insert_header((header::CACHE_CONTROL, "no-cache, no-transform"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(frames)
}
