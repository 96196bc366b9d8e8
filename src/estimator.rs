use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::error::CaptureError;
use crate::images::CapturedImage;

/// Kcal range produced by [`RandomEstimator`].
pub const STUB_RANGE: RangeInclusive<u32> = 200..=800;

/// Turns a captured photo into a calorie estimate.
#[async_trait]
pub trait CalorieEstimator: Send + Sync {
    async fn estimate(&self, image: &CapturedImage) -> Result<u32, CaptureError>;
}

/// Stand-in for a vision model: waits, then picks a number.
#[derive(Debug, Clone)]
pub struct RandomEstimator {
    delay: Duration,
}

impl RandomEstimator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl CalorieEstimator for RandomEstimator {
    async fn estimate(&self, image: &CapturedImage) -> Result<u32, CaptureError> {
        tokio::time::sleep(self.delay).await;
        let kcal = rand::thread_rng().gen_range(STUB_RANGE);
        debug!(kcal, bytes = image.body.len(), content_type = %image.content_type, "stub estimate");
        Ok(kcal)
    }
}

/// Deterministic estimator for tests: a fixed answer, or a failure when `kcal` is `None`.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct FixedEstimator {
    pub kcal: Option<u32>,
    pub delay: Duration,
}

#[cfg(test)]
#[async_trait]
impl CalorieEstimator for FixedEstimator {
    async fn estimate(&self, _image: &CapturedImage) -> Result<u32, CaptureError> {
        tokio::time::sleep(self.delay).await;
        self.kcal
            .ok_or_else(|| CaptureError::Estimator("model unavailable".into()))
    }
}
