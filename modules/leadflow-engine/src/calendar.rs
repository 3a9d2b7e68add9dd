//! Business-day arithmetic. Follow-up dates and distributed package
//! deliveries only ever land on weekdays.

use chrono::{Datelike, NaiveDate, Weekday};

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Add `days` business days to `start`. The start date itself never counts;
/// a weekend start rolls forward to Monday before counting begins, so
/// Friday + 3 is Wednesday and Saturday + 3 is Thursday.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut date = start;
    while is_weekend(date) {
        date = date.succ_opt().expect("date overflow");
    }
    let mut remaining = days;
    while remaining > 0 {
        date = date.succ_opt().expect("date overflow");
        if !is_weekend(date) {
            remaining -= 1;
        }
    }
    date
}

/// The next weekday strictly after `date`.
pub fn next_weekday(date: NaiveDate) -> NaiveDate {
    let mut next = date.succ_opt().expect("date overflow");
    while is_weekend(next) {
        next = next.succ_opt().expect("date overflow");
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn three_business_days_from_friday_is_wednesday() {
        // 2025-01-10 is a Friday
        assert_eq!(add_business_days(date(2025, 1, 10), 3), date(2025, 1, 15));
    }

    #[test]
    fn three_business_days_from_saturday_is_thursday() {
        // 2025-01-11 is a Saturday; counting starts from Monday
        assert_eq!(add_business_days(date(2025, 1, 11), 3), date(2025, 1, 16));
    }

    #[test]
    fn three_business_days_from_monday_is_thursday() {
        assert_eq!(add_business_days(date(2025, 1, 13), 3), date(2025, 1, 16));
    }

    #[test]
    fn zero_days_keeps_a_weekday_start() {
        assert_eq!(add_business_days(date(2025, 1, 14), 0), date(2025, 1, 14));
    }

    #[test]
    fn next_weekday_from_friday_is_monday() {
        assert_eq!(next_weekday(date(2025, 1, 10)), date(2025, 1, 13));
    }

    #[test]
    fn next_weekday_from_saturday_is_monday() {
        assert_eq!(next_weekday(date(2025, 1, 11)), date(2025, 1, 13));
    }

    #[test]
    fn next_weekday_from_midweek_is_tomorrow() {
        assert_eq!(next_weekday(date(2025, 1, 14)), date(2025, 1, 15));
    }

    #[test]
    fn next_weekday_is_never_a_weekend() {
        let mut d = date(2025, 1, 1);
        for _ in 0..30 {
            let next = next_weekday(d);
            assert!(!is_weekend(next));
            d = next;
        }
    }
}
