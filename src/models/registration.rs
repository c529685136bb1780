use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub name: String,
    pub section: String,
    pub reg_no: String,
    pub mobile: String,
    pub event_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Exactly 10 ASCII digits.
pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mobile_accepts_ten_digits() {
        assert!(is_valid_mobile("9876543210"));
        assert!(is_valid_mobile("0000000000"));
    }

    #[test]
    fn mobile_rejects_wrong_shapes() {
        assert!(!is_valid_mobile("987654321"));
        assert!(!is_valid_mobile("98765432100"));
        assert!(!is_valid_mobile("987654321a"));
        assert!(!is_valid_mobile("98765 4321"));
        assert!(!is_valid_mobile(""));
    }

    proptest! {
        #[test]
        fn mobile_valid_iff_ten_ascii_digits(s in "[0-9 a-z]{0,12}") {
            let expected = s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit());
            prop_assert_eq!(is_valid_mobile(&s), expected);
        }
    }
}
