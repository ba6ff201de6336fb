use chrono::{Days, NaiveDate};

/// The date `days` calendar days before `today`, or `None` when that falls
/// outside the calendar chrono can represent.
pub fn cutoff_date(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days)))
}

/// Renders a date in the RFC 3501 `date` form used by SEARCH, e.g.
/// `14-Feb-2024`. chrono's `%b` is English whatever the host locale is.
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}
