use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

#[derive(Debug, PartialEq, Eq)]
pub enum RangeError {
    BadDate,
    Inverted,
}

/// Current wall-clock time in the report timezone
pub fn now_in_tz(tz: Tz) -> DateTime<Tz> {
    tz.from_utc_datetime(&Utc::now().naive_utc())
}

/// Today's calendar date in the report timezone
pub fn today_in_tz(tz: Tz) -> NaiveDate {
    now_in_tz(tz).date_naive()
}

/// Check if the current time in the report timezone matches the schedule time
pub fn is_schedule_time(schedule_time: &str, tz: Tz) -> bool {
    let now = now_in_tz(tz);
    let current_time = format!("{:02}:{:02}", now.hour(), now.minute());
    current_time == schedule_time
}

/// Strict YYYY-MM-DD parsing, the format the report sheet expects
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

pub fn parse_range(from: &str, to: &str) -> Result<(NaiveDate, NaiveDate), RangeError> {
    let from = parse_date(from).ok_or(RangeError::BadDate)?;
    let to = parse_date(to).ok_or(RangeError::BadDate)?;
    if to < from {
        return Err(RangeError::Inverted);
    }
    Ok((from, to))
}

/// Date formatting used in user-facing messages and artifact headers
pub fn format_display(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Date formatting used for the report sheet input cells
pub fn format_sheet(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_only_the_sheet_format() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_date(" 2024-01-15 "), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(parse_date("15.01.2024"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("tomorrow"), None);
    }

    #[test]
    fn parse_range_rejects_inverted_ranges() {
        assert_eq!(
            parse_range("2024-02-01", "2024-01-01"),
            Err(RangeError::Inverted)
        );
        assert_eq!(parse_range("2024-01-01", "nope"), Err(RangeError::BadDate));
        assert!(parse_range("2024-01-01", "2024-01-31").is_ok());
        assert!(parse_range("2024-01-01", "2024-01-01").is_ok());
    }

    #[test]
    fn display_format_is_day_first() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_display(date), "07.03.2024");
        assert_eq!(format_sheet(date), "2024-03-07");
    }
}
