use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Taiwan local time (UTC+8, no daylight saving). Upstream imagery is named after it.
const TAIWAN_OFFSET_HOURS: i64 = 8;

/// Zero-padded calendar and clock components of one reporting cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeBucket {
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
}

impl TimeBucket {
    /// The most recent bucket already published at `instant`.
    ///
    /// The provider writes a bucket's file once the bucket closes, so the
    /// instant is moved back one cadence period before flooring the minute.
    pub fn at(instant: DateTime<Utc>, cadence_minutes: u32) -> Self {
        let cadence = cadence_minutes.clamp(1, 60);
        let local = (instant + Duration::hours(TAIWAN_OFFSET_HOURS)
            - Duration::minutes(i64::from(cadence)))
        .naive_utc();
        let minute = local.minute() - local.minute() % cadence;

        Self {
            year: format!("{:04}", local.year()),
            month: format!("{:02}", local.month()),
            day: format!("{:02}", local.day()),
            hour: format!("{:02}", local.hour()),
            minute: format!("{:02}", minute),
        }
    }

    /// `YYYYMMDDHH`
    pub fn hour_key(&self) -> String {
        format!("{}{}{}{}", self.year, self.month, self.day, self.hour)
    }

    /// `YYYYMMDDHHmm`
    pub fn minute_key(&self) -> String {
        format!("{}{}", self.hour_key(), self.minute)
    }

    /// Substitute `{year}`, `{month}`, `{day}`, `{hour}` and `{minute}` in a URL template.
    pub fn render(&self, template: &str) -> String {
        template
            .replace("{year}", &self.year)
            .replace("{month}", &self.month)
            .replace("{day}", &self.day)
            .replace("{hour}", &self.hour)
            .replace("{minute}", &self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_hourly_bucket_uses_previous_full_hour_in_taiwan_time() {
        // 03:25 UTC is 11:25 in Taipei; the last closed hourly bucket is 10:00.
        let bucket = TimeBucket::at(utc(2026, 3, 7, 3, 25), 60);
        assert_eq!(bucket.hour_key(), "2026030710");
        assert_eq!(bucket.minute, "00");
        assert_eq!(bucket.minute_key(), "202603071000");
    }

    #[test]
    fn test_ten_minute_bucket() {
        // 11:37 Taipei -> minus 10 min = 11:27 -> floored to 11:20
        let bucket = TimeBucket::at(utc(2026, 3, 7, 3, 37), 10);
        assert_eq!(bucket.minute_key(), "202603071120");
    }

    #[test]
    fn test_bucket_crosses_local_midnight() {
        // 16:05 UTC on Dec 31 is 00:05 Jan 1 in Taipei; hourly bucket is 23:00 Dec 31.
        let bucket = TimeBucket::at(utc(2025, 12, 31, 16, 5), 60);
        assert_eq!(bucket.hour_key(), "2025123123");

        // 16:45 UTC is 00:45 Jan 1 in Taipei; satellite bucket is 00:30.
        let bucket = TimeBucket::at(utc(2025, 12, 31, 16, 45), 10);
        assert_eq!(bucket.minute_key(), "202601010030");
    }

    #[test]
    fn test_stable_within_bucket() {
        let a = TimeBucket::at(utc(2026, 5, 1, 6, 1), 60);
        let b = TimeBucket::at(utc(2026, 5, 1, 6, 59), 60);
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_template() {
        let bucket = TimeBucket::at(utc(2026, 3, 7, 3, 37), 10);
        let url = bucket.render("ts1p-{year}-{month}-{day}-{hour}-{minute}.jpg");
        assert_eq!(url, "ts1p-2026-03-07-11-20.jpg");
    }
}
