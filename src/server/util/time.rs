use chrono::{DateTime, Utc};

pub(crate) mod helper {
    #[cfg(not(test))]
    pub use super::get_utc_now;
    #[cfg(test)]
    pub use super::mock_chrono::get_utc_now;
    #[cfg(test)]
    pub use super::mock_chrono::set_mock_now;
}


#[cfg(not(test))]
pub fn get_utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Midnight (UTC) of the day `now` falls on.
pub(crate) fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_clock_is_pinned() {
        helper::set_mock_now(1_700_000_000);
        assert_eq!(helper::get_utc_now().timestamp(), 1_700_000_000);
    }

    #[test]
    fn start_of_day_truncates_to_midnight() {
        // 2023-11-14T22:13:20Z
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let midnight = start_of_day(now);
        assert_eq!(midnight.to_rfc3339(), "2023-11-14T00:00:00+00:00");
    }
}
