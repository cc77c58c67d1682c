// 🕓 Freshness windows - when does an activity go stale?

use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_WALK_WINDOW_HOURS: i64 = 4;
pub const DEFAULT_FEED_WINDOW_HOURS: i64 = 6;

/// True when `last_event` never happened or falls outside `[now - window, now]`
pub fn is_stale(last_event: Option<NaiveDateTime>, window: Duration, now: NaiveDateTime) -> bool {
    match last_event {
        Some(time) => !(time >= now - window && time <= now),
        None => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub walk_window: Duration,
    pub feed_window: Duration,
}

impl FreshnessPolicy {
    pub fn new(walk_window: Duration, feed_window: Duration) -> Self {
        FreshnessPolicy {
            walk_window,
            feed_window,
        }
    }

    pub fn walk_is_stale(&self, last_walked_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        is_stale(last_walked_at, self.walk_window, now)
    }

    pub fn feeding_is_stale(&self, last_fed_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        is_stale(last_fed_at, self.feed_window, now)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        FreshnessPolicy::new(
            Duration::hours(DEFAULT_WALK_WINDOW_HOURS),
            Duration::hours(DEFAULT_FEED_WINDOW_HOURS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 4, 8)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_never_happened_is_stale() {
        assert!(is_stale(None, Duration::hours(4), base()));
    }

    #[test]
    fn test_window_edges() {
        let now = base();
        let window = Duration::hours(4);

        assert!(!is_stale(Some(now), window, now));
        assert!(!is_stale(Some(now - window), window, now));
        assert!(is_stale(Some(now - window - Duration::seconds(1)), window, now));
    }

    #[test]
    fn test_future_event_is_outside_the_window() {
        let now = base();
        assert!(is_stale(Some(now + Duration::minutes(1)), Duration::hours(4), now));
    }

    #[test]
    fn test_default_policy() {
        let policy = FreshnessPolicy::default();
        let now = base();

        assert_eq!(policy.walk_window, Duration::hours(4));
        assert_eq!(policy.feed_window, Duration::hours(6));

        // Walked five hours ago: stale for walks, fed five hours ago: still fresh
        let five_hours_ago = Some(now - Duration::hours(5));
        assert!(policy.walk_is_stale(five_hours_ago, now));
        assert!(!policy.feeding_is_stale(five_hours_ago, now));
    }

    proptest! {
        #[test]
        fn prop_absent_event_is_always_stale(offset in -1_000_000i64..1_000_000, hours in 0i64..48) {
            let now = base() + Duration::seconds(offset);
            prop_assert!(is_stale(None, Duration::hours(hours), now));
        }

        #[test]
        fn prop_stale_iff_older_than_window(elapsed in 0i64..200_000, window_secs in 0i64..100_000) {
            let now = base();
            let window = Duration::seconds(window_secs);
            let last = now - Duration::seconds(elapsed);

            prop_assert_eq!(is_stale(Some(last), window, now), elapsed > window_secs);
        }
    }
}
