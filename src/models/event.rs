use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const CATEGORIES: [&str; 5] = ["technology", "workshop", "cultural", "sports", "career"];

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub time: Option<String>,
    pub location: String,
    pub category: String,
    pub status: String,
    pub image: Option<String>,
    pub organizer: Option<String>,
    pub seats: i32,
    pub attendees: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Status derived from the event date rather than the stored flag.
    pub fn computed_status(&self, now: DateTime<Utc>) -> &'static str {
        computed_status(self.date, now)
    }
}

pub fn computed_status(date: DateTime<Utc>, now: DateTime<Utc>) -> &'static str {
    if date > now {
        "upcoming"
    } else {
        "completed"
    }
}

pub fn is_valid_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}

/// "HH:MM", 24-hour clock, minutes zero-padded. Hours may be one digit.
pub fn is_valid_time(time: &str) -> bool {
    let Some((hh, mm)) = time.split_once(':') else {
        return false;
    };
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return false;
    }
    if !hh.bytes().all(|b| b.is_ascii_digit()) || !mm.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let hours: u32 = hh.parse().unwrap_or(24);
    let minutes: u32 = mm.parse().unwrap_or(60);
    hours <= 23 && minutes <= 59
}

/// Images are either hosted URLs or embedded data references.
pub fn is_valid_image(image: &str) -> bool {
    image.starts_with("http") || image.starts_with("data:image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn computed_status_follows_date() {
        let now = Utc::now();
        assert_eq!(computed_status(now + Duration::hours(1), now), "upcoming");
        assert_eq!(computed_status(now - Duration::hours(1), now), "completed");
    }

    #[test]
    fn category_whitelist() {
        assert!(is_valid_category("technology"));
        assert!(is_valid_category("career"));
        assert!(!is_valid_category("Technology"));
        assert!(!is_valid_category("music"));
    }

    #[test]
    fn time_accepts_24h_forms() {
        for ok in ["0:00", "09:30", "9:05", "23:59", "12:00"] {
            assert!(is_valid_time(ok), "{ok} should be valid");
        }
    }

    #[test]
    fn time_rejects_bad_forms() {
        for bad in ["24:00", "12:60", "12", "12:5", "ab:cd", "12:345", ":30", ""] {
            assert!(!is_valid_time(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn image_prefixes() {
        assert!(is_valid_image("http://example.com/banner.png"));
        assert!(is_valid_image("https://example.com/banner.png"));
        assert!(is_valid_image("data:image/png;base64,iVBOR"));
        assert!(!is_valid_image("ftp://example.com/banner.png"));
        assert!(!is_valid_image("banner.png"));
    }
}
