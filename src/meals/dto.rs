use serde::{Deserialize, Serialize};

use crate::ledger::MealRecord;

/// Body of `POST /meals/base64`. `image_b64` may also be a full data URI.
#[derive(Debug, Deserialize)]
pub struct CreateMealBase64 {
    pub image_b64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedMealResponse {
    pub id: String,
    pub calories: u32,
    pub created_at: String,
    pub time: Option<String>,
}

impl CreatedMealResponse {
    pub fn new(m: &MealRecord, time: Option<String>) -> Self {
        Self {
            id: m.id.clone(),
            calories: m.calories,
            created_at: m.created_at.clone(),
            time,
        }
    }
}
