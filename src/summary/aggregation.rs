use time::{Date, Duration, UtcOffset};

use crate::ledger::MealRecord;

/// Days covered by [`weekly_series`].
pub const WEEK_DAYS: i64 = 7;

/// Calories logged on `day`, bucketed by the date of `createdAt` in `offset`.
///
/// Records whose timestamp does not parse are skipped.
pub fn daily_total(records: &[MealRecord], day: Date, offset: UtcOffset) -> u64 {
    records
        .iter()
        .filter(|m| m.local_day(offset) == Some(day))
        .map(|m| u64::from(m.calories))
        .sum()
}

/// Per-day totals for the seven days ending at `end_day`, oldest first.
///
/// Nothing is computed until the iterator is driven, and cloning it restarts
/// the walk from the oldest day.
///
/// Always seven entries, unless `end_day` is less than six days after
/// [`Date::MIN`]: then only the days that exist are yielded.
pub fn weekly_series(records: &[MealRecord], end_day: Date, offset: UtcOffset) -> WeeklySeries<'_> {
    let reachable = (end_day - Date::MIN).whole_days().min(WEEK_DAYS - 1);
    WeeklySeries {
        records,
        end_day,
        offset,
        next: WEEK_DAYS - 1 - reachable,
    }
}

#[derive(Debug, Clone)]
pub struct WeeklySeries<'a> {
    records: &'a [MealRecord],
    end_day: Date,
    offset: UtcOffset,
    next: i64,
}

impl Iterator for WeeklySeries<'_> {
    type Item = (Date, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= WEEK_DAYS {
            return None;
        }
        let back = WEEK_DAYS - 1 - self.next;
        self.next += 1;
        let day = self.end_day.checked_sub(Duration::days(back))?;
        Some((day, daily_total(self.records, day, self.offset)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (WEEK_DAYS - self.next).max(0) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for WeeklySeries<'_> {}

/// Sum of a weekly series.
pub fn week_total(series: impl IntoIterator<Item = (Date, u64)>) -> u64 {
    series.into_iter().map(|(_, kcal)| kcal).sum()
}

/// Share of `goal` reached by `total`, in percent, capped at 100.
pub fn goal_progress(total: u64, goal: u32) -> u8 {
    if goal == 0 {
        return 100;
    }
    let pct = total.saturating_mul(100) / u64::from(goal);
    pct.min(100) as u8
}

/// Records logged on `day`, in snapshot order.
pub fn meals_on<'a>(
    records: &'a [MealRecord],
    day: Date,
    offset: UtcOffset,
) -> impl Iterator<Item = &'a MealRecord> + 'a {
    records
        .iter()
        .filter(move |m| m.local_day(offset) == Some(day))
}

/// Short English weekday label, e.g. `Mon`.
pub fn weekday_label(day: Date) -> &'static str {
    use time::Weekday::*;
    match day.weekday() {
        Monday => "Mon",
        Tuesday => "Tue",
        Wednesday => "Wed",
        Thursday => "Thu",
        Friday => "Fri",
        Saturday => "Sat",
        Sunday => "Sun",
    }
}
