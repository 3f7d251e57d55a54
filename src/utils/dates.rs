use chrono::{Datelike, Days, NaiveDate, Weekday};

/// The most recent weekday strictly before `date`.
///
/// Used when the rate service has not published a value for `date` yet.
pub fn previous_business_day(date: NaiveDate) -> NaiveDate {
    let mut day = date.pred_opt().unwrap_or(date);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = match day.checked_sub_days(Days::new(1)) {
            Some(earlier) => earlier,
            None => break,
        };
    }
    day
}

pub fn format_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
