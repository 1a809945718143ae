//! Weekly unlock schedule for subscriptions.
//!
//! Week 1 is available from the moment the subscription starts; each later
//! week unlocks seven days after the previous one. The end date is shown to
//! subscribers but never blocks a download of a week that has unlocked.

use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;

pub const WEEK_COUNT: u8 = 4;
pub const UNLOCK_INTERVAL_DAYS: i64 = 7;
pub const SUBSCRIPTION_DISPLAY_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekUnlock {
    pub week: u8,
    pub available: bool,
    pub access_date: DateTime<Utc>,
}

/// Accept 1..=4 only.
pub fn check_week(week: i64) -> Result<u8, AppError> {
    u8::try_from(week)
        .ok()
        .filter(|w| (1..=WEEK_COUNT).contains(w))
        .ok_or(AppError::InvalidWeek)
}

fn unlock_offset(week: u8) -> Duration {
    Duration::days(UNLOCK_INTERVAL_DAYS * i64::from(week.saturating_sub(1)))
}

pub fn access_date(start: DateTime<Utc>, week: u8) -> DateTime<Utc> {
    start + unlock_offset(week)
}

pub fn is_available(start: DateTime<Utc>, now: DateTime<Utc>, week: u8) -> bool {
    week == 1 || now - start >= unlock_offset(week)
}

pub fn week_schedule(start: DateTime<Utc>, now: DateTime<Utc>) -> Vec<WeekUnlock> {
    (1..=WEEK_COUNT)
        .map(|week| WeekUnlock {
            week,
            available: is_available(start, now, week),
            access_date: access_date(start, week),
        })
        .collect()
}

pub fn subscription_end_date(start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::days(SUBSCRIPTION_DISPLAY_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        "2025-03-01T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn week_one_is_open_immediately() {
        let schedule = week_schedule(start(), start());
        assert!(schedule[0].available);
        assert!(schedule[1..].iter().all(|w| !w.available));
    }

    #[test]
    fn week_one_survives_clock_skew() {
        assert!(is_available(start(), start() - Duration::hours(1), 1));
    }

    #[test]
    fn weeks_unlock_on_exact_boundaries() {
        for week in 2..=WEEK_COUNT {
            let boundary = start() + Duration::days(7 * i64::from(week - 1));
            assert!(!is_available(start(), boundary - Duration::seconds(1), week));
            assert!(is_available(start(), boundary, week));
        }
    }

    #[test]
    fn ten_days_in_opens_two_weeks() {
        let available: Vec<u8> = week_schedule(start(), start() + Duration::days(10))
            .into_iter()
            .filter(|w| w.available)
            .map(|w| w.week)
            .collect();
        assert_eq!(available, vec![1, 2]);
    }

    #[test]
    fn weeks_stay_open_after_display_end() {
        let long_after = subscription_end_date(start()) + Duration::days(400);
        assert!(week_schedule(start(), long_after).iter().all(|w| w.available));
    }

    #[test]
    fn access_dates_are_weekly() {
        let schedule = week_schedule(start(), start());
        assert_eq!(schedule[2].access_date, start() + Duration::days(14));
        assert_eq!(subscription_end_date(start()), start() + Duration::days(30));
    }

    #[test]
    fn week_range_is_checked() {
        assert_eq!(check_week(4).unwrap(), 4);
        for bad in [0, 5, -1, 300] {
            assert!(matches!(check_week(bad), Err(AppError::InvalidWeek)));
        }
    }
}
