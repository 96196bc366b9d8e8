use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::OwnedSemaphorePermit;
use tracing::{info, warn};

use crate::error::{CaptureError, PersistenceError};
use crate::images::CapturedImage;
use crate::ledger::{Ledger, MealRecord, Snapshot};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum LogMealError {
    #[error("another photo is still being analyzed")]
    Busy,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("ledger write task failed: {0}")]
    Ledger(#[from] tokio::task::JoinError),
}

/// Outcome of a ledger mutation made on behalf of the user.
#[derive(Debug)]
pub struct Logged<T> {
    pub value: T,
    pub persisted: Result<(), PersistenceError>,
}

/// Claims the single capture slot. Held until the meal is logged or the capture fails.
pub fn reserve_capture(st: &AppState) -> Result<OwnedSemaphorePermit, LogMealError> {
    st.capture_slot
        .clone()
        .try_acquire_owned()
        .map_err(|_| LogMealError::Busy)
}

/// Runs `f` against the ledger on the blocking pool; every mutation rewrites the store.
async fn with_ledger<T, F>(st: &AppState, f: F) -> Result<T, LogMealError>
where
    T: Send + 'static,
    F: FnOnce(&mut Ledger) -> T + Send + 'static,
{
    let mut ledger = st.ledger.clone().lock_owned().await;
    Ok(tokio::task::spawn_blocking(move || f(&mut *ledger)).await?)
}

/// Estimates `image` and, on success, prepends the new meal to the ledger.
pub async fn log_meal(
    st: &AppState,
    _slot: OwnedSemaphorePermit,
    image: CapturedImage,
) -> Result<Logged<MealRecord>, LogMealError> {
    let limit = st.config.estimate_timeout;
    let calories = tokio::time::timeout(limit, st.estimator.estimate(&image))
        .await
        .map_err(|_| CaptureError::Timeout(limit.as_secs()))??;

    let record = MealRecord::new(image.to_data_uri(), calories, OffsetDateTime::now_utc())
        .map_err(CaptureError::from)?;

    let update = {
        let record = record.clone();
        with_ledger(st, move |ledger| ledger.record(record)).await?
    };
    info!(id = %record.id, calories, meals = update.snapshot.len(), "meal logged");
    Ok(Logged {
        value: record,
        persisted: update.persisted,
    })
}

/// Drops every meal. Refused while a capture is pending.
pub async fn clear_meals(st: &AppState) -> Result<Logged<Snapshot>, LogMealError> {
    let _slot = reserve_capture(st)?;
    let update = with_ledger(st, |ledger| ledger.clear()).await?;
    if update.persisted.is_ok() {
        info!("meals cleared");
    } else {
        warn!("meals cleared in memory only");
    }
    Ok(Logged {
        value: update.snapshot,
        persisted: update.persisted,
    })
}
