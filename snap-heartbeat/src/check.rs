use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Remote view of a monitoring check, as returned by the Healthchecks API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckStatus {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub desc: String,
    /// Grace period in seconds.
    #[serde(default)]
    pub grace: u64,
    #[serde(default)]
    pub n_pings: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_ping: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_ping: Option<DateTime<Utc>>,
}

impl CheckStatus {
    /// A previous run is considered active until its next expected ping.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        match (self.last_ping, self.next_ping) {
            (Some(_), Some(next)) => now <= next,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn check(last: Option<DateTime<Utc>>, next: Option<DateTime<Utc>>) -> CheckStatus {
        CheckStatus {
            name: "snapshot".into(),
            tags: String::new(),
            desc: String::new(),
            grace: 3600,
            n_pings: 3,
            status: "up".into(),
            last_ping: last,
            next_ping: next,
        }
    }

    #[test]
    fn test_locked_until_next_ping_inclusive() {
        let next = Utc.with_ymd_and_hms(2024, 3, 10, 4, 0, 0).unwrap();
        let last = next - Duration::days(1);
        let status = check(Some(last), Some(next));

        assert!(status.is_locked_at(next - Duration::minutes(5)));
        assert!(status.is_locked_at(next));
        assert!(!status.is_locked_at(next + Duration::seconds(1)));
    }

    #[test]
    fn test_missing_timestamps_never_lock() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 4, 0, 0).unwrap();
        assert!(!check(None, Some(now)).is_locked_at(now));
        assert!(!check(Some(now), None).is_locked_at(now));
        assert!(!check(None, None).is_locked_at(now));
    }

    #[test]
    fn test_deserialize_api_payload() {
        let payload = r#"{
            "name": "snapshot-hetzner",
            "slug": "snapshot-hetzner",
            "tags": "prod",
            "desc": "",
            "grace": 3600,
            "n_pings": 12,
            "status": "up",
            "started": false,
            "last_ping": "2024-03-10T03:00:12+00:00",
            "next_ping": "2024-03-11T03:00:12+00:00",
            "unique_key": "abc"
        }"#;
        let status: CheckStatus = serde_json::from_str(payload).unwrap();
        assert_eq!(status.n_pings, 12);
        assert_eq!(
            status.next_ping,
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 3, 0, 12).unwrap())
        );

        let fresh: CheckStatus =
            serde_json::from_str(r#"{"name": "new", "status": "new", "last_ping": null, "next_ping": null}"#)
                .unwrap();
        assert_eq!(fresh.last_ping, None);
    }
}
