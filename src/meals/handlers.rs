use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use super::dto::{CreateMealBase64, CreatedMealResponse};
use super::services::{clear_meals, log_meal, reserve_capture, LogMealError, Logged};
use crate::error::{CaptureError, PersistenceError};
use crate::images::CapturedImage;
use crate::ledger::{MealRecord, Snapshot};
use crate::state::AppState;
use crate::summary::dto::{todays_meals, MealListItem};

/// Set on mutation responses whose result only lives in memory.
pub const PERSIST_WARNING: HeaderName = HeaderName::from_static("x-persist-warning");

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/today", get(list_today))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal_multipart).delete(clear_all))
        .route("/meals/base64", post(create_meal_base64))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_meals(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.ledger.lock().await.snapshot())
}

#[instrument(skip(state))]
pub async fn list_today(State(state): State<AppState>) -> Json<Vec<MealListItem>> {
    let snapshot = state.ledger.lock().await.snapshot();
    Json(todays_meals(
        &snapshot,
        state.config.today(),
        state.config.utc_offset,
    ))
}

/// POST /meals (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn create_meal_multipart(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<CreatedMealResponse>), (StatusCode, String)> {
    let slot = reserve_capture(&state).map_err(reject)?;
    let image = read_image_field(&mut mp)
        .await
        .map_err(|e| reject(e.into()))?;
    let logged = log_meal(&state, slot, image).await.map_err(reject)?;
    Ok(created(&state, logged))
}

/// POST /meals/base64 { image_b64: "...", content_type?: "image/jpeg" }
#[instrument(skip(state, body))]
pub async fn create_meal_base64(
    State(state): State<AppState>,
    Json(body): Json<CreateMealBase64>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedMealResponse>), (StatusCode, String)> {
    let slot = reserve_capture(&state).map_err(reject)?;
    let image = CapturedImage::from_base64(&body.image_b64, body.content_type.as_deref())
        .map_err(|e| reject(e.into()))?;
    let logged = log_meal(&state, slot, image).await.map_err(reject)?;
    Ok(created(&state, logged))
}

/// DELETE /meals
#[instrument(skip(state))]
pub async fn clear_all(
    State(state): State<AppState>,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    let logged = clear_meals(&state).await.map_err(reject)?;
    let mut headers = HeaderMap::new();
    persist_warning(&mut headers, &logged.persisted);
    Ok((StatusCode::NO_CONTENT, headers))
}

async fn read_image_field(mp: &mut Multipart) -> Result<CapturedImage, CaptureError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| CaptureError::Read(e.to_string()))?
    {
        if matches!(field.name(), Some("file" | "files" | "files[]")) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let body = field
                .bytes()
                .await
                .map_err(|e| CaptureError::Read(e.to_string()))?;
            return CapturedImage::from_upload(body, &content_type);
        }
    }
    Err(CaptureError::Empty)
}

fn created(
    state: &AppState,
    logged: Logged<MealRecord>,
) -> (StatusCode, HeaderMap, Json<CreatedMealResponse>) {
    let mut headers = HeaderMap::new();
    persist_warning(&mut headers, &logged.persisted);
    let time = logged.value.local_time(state.config.utc_offset);
    (
        StatusCode::CREATED,
        headers,
        Json(CreatedMealResponse::new(&logged.value, time)),
    )
}

fn persist_warning(headers: &mut HeaderMap, persisted: &Result<(), PersistenceError>) {
    if let Err(e) = persisted {
        error!(error = %e, "meal ledger not saved; changes kept for this session only");
        if let Ok(v) = HeaderValue::from_str(&format!("not saved: {e}")) {
            headers.insert(PERSIST_WARNING, v);
        }
    }
}

fn reject(e: LogMealError) -> (StatusCode, String) {
    match e {
        LogMealError::Busy => (StatusCode::CONFLICT, e.to_string()),
        LogMealError::Ledger(join) => {
            error!(error = %join, "ledger write task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not save meal.".into())
        }
        LogMealError::Capture(c) => {
            warn!(error = %c, "capture failed");
            let status = match c {
                CaptureError::Empty
                | CaptureError::UnsupportedType(_)
                | CaptureError::InvalidBase64
                | CaptureError::Read(_) => StatusCode::BAD_REQUEST,
                CaptureError::Estimator(_)
                | CaptureError::Timeout(_)
                | CaptureError::Timestamp(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, c.user_message().to_string())
        }
    }
}

#[cfg(test)]
mod handler_tests {
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        extract::{FromRequest, Request},
        http::header::CONTENT_TYPE,
    };

    use super::*;
    use crate::estimator::FixedEstimator;
    use crate::storage::KeyValueStore;

    const BOUNDARY: &str = "meal-photo-boundary";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    /// (field name, content type, bytes) per part.
    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        let mut body = Vec::new();
        for (name, content_type, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"meal.png\"\r\n")
                    .as_bytes(),
            );
            if let Some(ct) = content_type {
                body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/meals")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    fn fixed(kcal: Option<u32>) -> FixedEstimator {
        FixedEstimator {
            kcal,
            delay: Duration::ZERO,
        }
    }

    fn png_body() -> CreateMealBase64 {
        CreateMealBase64 {
            image_b64: "iVBORw0KGgo=".into(),
            content_type: Some("image/png".into()),
        }
    }

    struct FullDisk;

    impl KeyValueStore for FullDisk {
        fn get(&self, _key: &str) -> io::Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }
    }

    #[tokio::test]
    async fn base64_upload_creates_meal() {
        let state = AppState::fake(fixed(Some(512)));
        let (status, headers, Json(resp)) =
            create_meal_base64(State(state.clone()), Json(png_body()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(headers.get(PERSIST_WARNING).is_none());
        assert_eq!(resp.calories, 512);
        assert!(resp.time.is_some());

        let Json(all) = list_meals(State(state.clone())).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, resp.id);

        let Json(today) = list_today(State(state)).await;
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].calories, 512);
    }

    #[tokio::test]
    async fn non_image_is_bad_request() {
        let state = AppState::fake(fixed(Some(512)));
        let body = CreateMealBase64 {
            image_b64: "aGVsbG8=".into(),
            content_type: Some("text/plain".into()),
        };
        let (status, msg) = create_meal_base64(State(state.clone()), Json(body))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Please choose an image file.");
        assert!(state.ledger.lock().await.snapshot().is_empty());
    }

    #[tokio::test]
    async fn estimator_failure_is_unprocessable() {
        let state = AppState::fake(fixed(None));
        let (status, msg) = create_meal_base64(State(state.clone()), Json(png_body()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(msg, "Failed to process image. Try another photo.");
        assert!(state.ledger.lock().await.snapshot().is_empty());
    }

    #[tokio::test]
    async fn busy_capture_conflicts() {
        let state = AppState::fake(fixed(Some(300)));
        let _pending = reserve_capture(&state).unwrap();
        let (status, _) = create_meal_base64(State(state.clone()), Json(png_body()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = clear_all(State(state)).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn failed_save_still_returns_meal_with_warning() {
        let state = AppState::fake_with_store(Arc::new(FullDisk), fixed(Some(640)));
        let (status, headers, Json(resp)) =
            create_meal_base64(State(state.clone()), Json(png_body()))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let warning = headers.get(PERSIST_WARNING).unwrap().to_str().unwrap();
        assert!(warning.contains("no space left"));
        assert_eq!(resp.calories, 640);

        let Json(all) = list_meals(State(state.clone())).await;
        assert_eq!(all.len(), 1);

        let (status, headers) = clear_all(State(state)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(headers.contains_key(PERSIST_WARNING));
    }

    #[tokio::test]
    async fn clear_empties_ledger() {
        let state = AppState::fake(fixed(Some(250)));
        let _created = create_meal_base64(State(state.clone()), Json(png_body()))
            .await
            .unwrap();
        let (status, headers) = clear_all(State(state.clone())).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(headers.is_empty());
        let Json(all) = list_meals(State(state)).await;
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn multipart_file_part_creates_meal() {
        let state = AppState::fake(fixed(Some(530)));
        let mp = multipart(&[("file", Some("image/png"), PNG)]).await;
        let (status, headers, Json(resp)) = create_meal_multipart(State(state.clone()), mp)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(headers.is_empty());
        assert_eq!(resp.calories, 530);

        let snap = state.ledger.lock().await.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].image.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn multipart_accepts_files_array_name_and_skips_other_parts() {
        let state = AppState::fake(fixed(Some(610)));
        let mp = multipart(&[
            ("title", Some("text/plain"), &b"lunch"[..]),
            ("files[]", Some("image/jpeg"), PNG),
        ])
        .await;
        let (status, _, Json(resp)) = create_meal_multipart(State(state.clone()), mp)
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resp.calories, 610);
        let snap = state.ledger.lock().await.snapshot();
        assert!(snap[0].image.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn multipart_part_without_content_type_is_bad_request() {
        let state = AppState::fake(fixed(Some(530)));
        let mp = multipart(&[("file", None, PNG)]).await;
        let (status, msg) = create_meal_multipart(State(state.clone()), mp)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Please choose an image file.");
        assert!(state.ledger.lock().await.snapshot().is_empty());
        // the capture slot is free again
        assert!(reserve_capture(&state).is_ok());
    }

    #[tokio::test]
    async fn multipart_without_file_part_is_bad_request() {
        let state = AppState::fake(fixed(Some(530)));
        let mp = multipart(&[("photo", Some("image/png"), PNG)]).await;
        let (status, msg) = create_meal_multipart(State(state.clone()), mp)
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Please choose an image file.");
        assert!(state.ledger.lock().await.snapshot().is_empty());
    }
}
