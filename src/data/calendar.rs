//! Business-day calendar (Monday to Friday, no holiday table)

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Whether the date falls on a weekday
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First business day strictly after `date`
pub fn next_business_day(date: NaiveDate) -> NaiveDate {
    let mut next = date + Duration::days(1);
    while !is_business_day(next) {
        next += Duration::days(1);
    }
    next
}

/// The `count` business days following `last`, contiguous and gap-free
pub fn business_days_after(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut current = last;
    for _ in 0..count {
        current = next_business_day(current);
        days.push(current);
    }
    days
}
