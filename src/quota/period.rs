use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::config::{BucketKind, TimeZoneChoice};

/// The calendar date "now" falls on, in the configured timezone.
fn local_date(now: DateTime<Utc>, tz: TimeZoneChoice) -> NaiveDate {
    match tz {
        TimeZoneChoice::Utc => now.date_naive(),
        TimeZoneChoice::Local => now.with_timezone(&Local).date_naive(),
    }
}

/// Converts a calendar date's midnight, interpreted in the configured
/// timezone, back to a UTC instant.
fn midnight_utc(date: NaiveDate, tz: TimeZoneChoice) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz {
        TimeZoneChoice::Utc => Utc.from_utc_datetime(&naive),
        TimeZoneChoice::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive))
            .with_timezone(&Utc),
    }
}

/// Computes the period label for `now` under the given bucket kind
/// and timezone: `YYYY-MM-DD` (Daily), `YYYY-Www` ISO week (Weekly), or
/// `YYYY-MM` (Monthly).
pub fn period_label(now: DateTime<Utc>, kind: BucketKind, tz: TimeZoneChoice) -> String {
    let date = local_date(now, tz);
    match kind {
        BucketKind::Daily => date.format("%Y-%m-%d").to_string(),
        BucketKind::Weekly => {
            let iso = date.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        BucketKind::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Computes the reset time for `now` under the given bucket kind
/// and timezone, as a UTC instant:
///
/// - Daily: next local 00:00:00.
/// - Weekly: local 00:00:00 on the day `(7 - weekday) % 7` days ahead,
///   mapping `0` to `7` — Sunday-as-end-of-week.
/// - Monthly: local 00:00:00 on the 1st of the next month.
pub fn reset_time(now: DateTime<Utc>, kind: BucketKind, tz: TimeZoneChoice) -> DateTime<Utc> {
    let date = local_date(now, tz);
    let target = match kind {
        BucketKind::Daily => date.succ_opt().expect("date overflow"),
        BucketKind::Weekly => {
            let weekday_from_sunday = date.weekday().num_days_from_sunday() as i64;
            let mut days_ahead = (7 - weekday_from_sunday) % 7;
            if days_ahead == 0 {
                days_ahead = 7;
            }
            date + chrono::Duration::days(days_ahead)
        }
        BucketKind::Monthly => {
            let (year, month) = if date.month() == 12 {
                (date.year() + 1, 1)
            } else {
                (date.year(), date.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, 1).expect("valid next-month date")
        }
    };
    midnight_utc(target, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn daily_label_is_calendar_date() {
        let now = utc(2026, 7, 26, 10, 0, 0);
        assert_eq!(
            period_label(now, BucketKind::Daily, TimeZoneChoice::Utc),
            "2026-07-26"
        );
    }

    #[test]
    fn monthly_label_is_year_month() {
        let now = utc(2026, 7, 26, 10, 0, 0);
        assert_eq!(
            period_label(now, BucketKind::Monthly, TimeZoneChoice::Utc),
            "2026-07"
        );
    }

    #[test]
    fn weekly_label_is_iso_week() {
        let now = utc(2026, 7, 26, 10, 0, 0);
        let label = period_label(now, BucketKind::Weekly, TimeZoneChoice::Utc);
        assert!(label.starts_with("2026-W"));
    }

    #[test]
    fn applying_period_label_twice_within_a_window_is_stable() {
        let now = utc(2026, 7, 26, 10, 0, 0);
        let a = period_label(now, BucketKind::Daily, TimeZoneChoice::Utc);
        let b = period_label(now, BucketKind::Daily, TimeZoneChoice::Utc);
        assert_eq!(a, b);
    }

    #[test]
    fn daily_reset_is_next_midnight() {
        let now = utc(2026, 7, 26, 23, 59, 0);
        let reset = reset_time(now, BucketKind::Daily, TimeZoneChoice::Utc);
        assert_eq!(reset, utc(2026, 7, 27, 0, 0, 0));
    }

    #[test]
    fn weekly_reset_anchors_to_sunday() {
        // 2026-07-26 is a Sunday; the next reset should be one week later.
        let now = utc(2026, 7, 26, 12, 0, 0);
        assert_eq!(now.weekday(), chrono::Weekday::Sun);
        let reset = reset_time(now, BucketKind::Weekly, TimeZoneChoice::Utc);
        assert_eq!(reset, utc(2026, 8, 2, 0, 0, 0));
    }

    #[test]
    fn weekly_reset_is_strictly_future_mid_week() {
        // 2026-07-29 is a Wednesday.
        let now = utc(2026, 7, 29, 12, 0, 0);
        assert_eq!(now.weekday(), chrono::Weekday::Wed);
        let reset = reset_time(now, BucketKind::Weekly, TimeZoneChoice::Utc);
        assert_eq!(reset, utc(2026, 8, 2, 0, 0, 0));
    }

    #[test]
    fn monthly_reset_is_first_of_next_month() {
        let now = utc(2026, 7, 26, 12, 0, 0);
        let reset = reset_time(now, BucketKind::Monthly, TimeZoneChoice::Utc);
        assert_eq!(reset, utc(2026, 8, 1, 0, 0, 0));
    }

    #[test]
    fn monthly_reset_wraps_year_in_december() {
        let now = utc(2026, 12, 15, 12, 0, 0);
        let reset = reset_time(now, BucketKind::Monthly, TimeZoneChoice::Utc);
        assert_eq!(reset, utc(2027, 1, 1, 0, 0, 0));
    }
}
