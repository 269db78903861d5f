use chrono::{DateTime, Utc};

/// Optimistic-concurrency check.
///
/// `client` is the last-modified time the caller saw. No value skips the check.
/// The server baseline is the later of the stored update and creation times.
pub fn is_stale(client: Option<DateTime<Utc>>, updated_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>) -> bool {
    let Some(seen) = client else { return false };
    let baseline = updated_at.map_or(created_at, |u| u.max(created_at));
    seen < baseline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn missing_client_timestamp_skips_check() {
        let now = Utc::now();
        assert!(!is_stale(None, Some(now), now - Duration::hours(1)));
    }

    #[test]
    fn never_updated_uses_creation_time() {
        let created = Utc::now();
        assert!(is_stale(Some(created - Duration::seconds(1)), None, created));
        assert!(!is_stale(Some(created), None, created));
    }

    #[test]
    fn older_view_than_last_update_is_stale() {
        let created = Utc::now() - Duration::hours(2);
        let updated = created + Duration::hours(1);
        assert!(is_stale(Some(created), Some(updated), created));
        assert!(!is_stale(Some(updated), Some(updated), created));
        assert!(!is_stale(Some(updated + Duration::seconds(5)), Some(updated), created));
    }
}
