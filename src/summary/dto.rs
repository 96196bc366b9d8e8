use serde::Serialize;
use time::{Date, UtcOffset};

use crate::ledger::MealRecord;
use crate::summary::aggregation::{
    daily_total, goal_progress, meals_on, week_total, weekday_label, weekly_series,
};

/// Fixed daily calorie goal.
pub const DAILY_GOAL_KCAL: u32 = 2000;

/// One bar of the weekly chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub date: Date,
    pub weekday: &'static str,
    pub calories: u64,
}

/// Everything the calorie card renders.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub date: Date,
    pub today_calories: u64,
    pub goal_calories: u32,
    pub goal_progress_pct: u8,
    pub week: Vec<DayTotal>,
    pub week_calories: u64,
}

impl Summary {
    pub fn build(records: &[MealRecord], today: Date, offset: UtcOffset) -> Self {
        let today_calories = daily_total(records, today, offset);
        let week: Vec<DayTotal> = weekly_series(records, today, offset)
            .map(|(date, calories)| DayTotal {
                date,
                weekday: weekday_label(date),
                calories,
            })
            .collect();
        let week_calories = week_total(week.iter().map(|d| (d.date, d.calories)));
        Self {
            date: today,
            today_calories,
            goal_calories: DAILY_GOAL_KCAL,
            goal_progress_pct: goal_progress(today_calories, DAILY_GOAL_KCAL),
            week,
            week_calories,
        }
    }
}

/// A meal as listed under "Today's Meals".
#[derive(Debug, Clone, Serialize)]
pub struct MealListItem {
    pub id: String,
    pub image: String,
    pub calories: u32,
    pub time: Option<String>, // local HH:MM
}

impl MealListItem {
    pub fn from_record(m: &MealRecord, offset: UtcOffset) -> Self {
        Self {
            id: m.id.clone(),
            image: m.image.clone(),
            calories: m.calories,
            time: m.local_time(offset),
        }
    }
}

pub fn todays_meals(records: &[MealRecord], today: Date, offset: UtcOffset) -> Vec<MealListItem> {
    meals_on(records, today, offset)
        .map(|m| MealListItem::from_record(m, offset))
        .collect()
}
