use chrono::Utc;
use rand::Rng;

/// Query value that makes every image request unique: the current time in
/// milliseconds plus a random suffix for requests within the same millisecond.
pub fn cache_buster() -> String {
    let mut rng = rand::thread_rng();
    let suffix: u16 = rng.gen();
    format!("{}{:05}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_buster_is_numeric_and_starts_with_timestamp() {
        let before = Utc::now().timestamp_millis().to_string();
        let value = cache_buster();
        assert!(value.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(value.len(), before.len() + 5);
        assert!(value[..before.len()] >= *before.as_str());
    }
}
