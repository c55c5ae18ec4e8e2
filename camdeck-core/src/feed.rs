//! Mock event feed for the dashboard sidebar.
//!
//! Events are synthetic: they are generated from a caller-supplied RNG so a
//! fixed seed always yields the same feed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::settings::CameraId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Motion,
    Person,
    Vehicle,
    Alert,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Motion,
        EventKind::Person,
        EventKind::Vehicle,
        EventKind::Alert,
    ];

    fn describe(self) -> &'static str {
        match self {
            EventKind::Motion => "Motion detected in frame",
            EventKind::Person => "Person detected",
            EventKind::Vehicle => "Vehicle detected",
            EventKind::Alert => "Camera raised an alert",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Motion => write!(f, "motion"),
            EventKind::Person => write!(f, "person"),
            EventKind::Vehicle => write!(f, "vehicle"),
            EventKind::Alert => write!(f, "alert"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown event kind '{input}'")]
pub struct ParseEventKindError {
    pub input: String,
}

impl FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string() == wanted)
            .ok_or_else(|| ParseEventKindError {
                input: s.to_string(),
            })
    }
}

/// One entry of the sidebar feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraEvent {
    pub id: Uuid,
    pub camera_id: CameraId,
    pub kind: EventKind,
    pub occurred_at: DateTime<Utc>,
    /// Detector confidence in `0.5..=1.0`
    pub confidence: f32,
    pub description: String,
}

/// Feed of camera events, newest first.
#[derive(Debug, Clone, Default)]
pub struct EventFeed {
    events: Vec<CameraEvent>,
}

impl EventFeed {
    /// Generates `count` events for `camera_id` spread over the `lookback`
    /// period ending at `now`.
    ///
    /// A look-back reaching past the earliest representable time is cut
    /// off there.
    pub fn generate<R: Rng>(
        rng: &mut R,
        camera_id: CameraId,
        count: usize,
        now: DateTime<Utc>,
        lookback: TimeDelta,
    ) -> Self {
        let earliest = now
            .checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let span = now.signed_duration_since(earliest).num_seconds().max(1);
        let events = (0..count)
            .map(|_| {
                let kind = EventKind::ALL[rng.random_range(0..EventKind::ALL.len())];
                let offset = TimeDelta::try_seconds(rng.random_range(0..span)).unwrap_or_default();
                CameraEvent {
                    id: uuid::Builder::from_random_bytes(rng.random()).into_uuid(),
                    camera_id,
                    kind,
                    occurred_at: now.checked_sub_signed(offset).unwrap_or(earliest),
                    confidence: rng.random_range(0.5..=1.0),
                    description: kind.describe().to_string(),
                }
            })
            .collect();
        Self::from_events(events)
    }

    /// Builds a feed from arbitrary events, restoring newest-first order.
    pub fn from_events(mut events: Vec<CameraEvent>) -> Self {
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Self { events }
    }

    /// Merges two feeds, e.g. from different cameras.
    pub fn merge(self, other: EventFeed) -> Self {
        let mut events = self.events;
        events.extend(other.events);
        Self::from_events(events)
    }

    pub fn events(&self) -> &[CameraEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &CameraEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    /// Events with `from <= occurred_at <= to`.
    pub fn between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &CameraEvent> {
        self.events
            .iter()
            .filter(move |event| event.occurred_at >= from && event.occurred_at <= to)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-05T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn feed(seed: u64, count: usize) -> EventFeed {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        EventFeed::generate(&mut rng, 4, count, fixed_now(), TimeDelta::hours(24))
    }

    #[test]
    fn test_lookback_past_earliest_time_is_cut_off() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let feed = EventFeed::generate(&mut rng, 1, 25, fixed_now(), TimeDelta::MAX);

        assert_eq!(feed.len(), 25);
        for event in feed.events() {
            assert!(event.occurred_at <= fixed_now());
            assert!(event.occurred_at >= DateTime::<Utc>::MIN_UTC);
        }
    }

    #[test]
    fn test_generated_feed_is_newest_first_within_lookback() {
        let feed = feed(7, 40);
        assert_eq!(feed.len(), 40);

        let earliest = fixed_now() - TimeDelta::hours(24);
        for pair in feed.events().windows(2) {
            assert!(pair[0].occurred_at >= pair[1].occurred_at);
        }
        for event in feed.events() {
            assert!(event.occurred_at <= fixed_now() && event.occurred_at > earliest);
            assert!((0.5..=1.0).contains(&event.confidence));
            assert_eq!(event.camera_id, 4);
        }
    }

    #[test]
    fn test_same_seed_same_feed() {
        assert_eq!(feed(11, 10).events(), feed(11, 10).events());
        assert_ne!(feed(11, 10).events(), feed(12, 10).events());
    }

    #[test]
    fn test_ids_are_unique_v4() {
        let feed = feed(3, 50);
        let mut ids: Vec<Uuid> = feed.events().iter().map(|event| event.id).collect();
        assert!(ids.iter().all(|id| id.get_version_num() == 4));
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_filters() {
        let feed = feed(5, 60);

        let people: Vec<_> = feed.filter_kind(EventKind::Person).collect();
        assert!(people.iter().all(|event| event.kind == EventKind::Person));

        let from = fixed_now() - TimeDelta::hours(6);
        let recent: Vec<_> = feed.between(from, fixed_now()).collect();
        assert!(recent.iter().all(|event| event.occurred_at >= from));
        let expected = feed
            .events()
            .iter()
            .filter(|event| event.occurred_at >= from)
            .count();
        assert_eq!(recent.len(), expected);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let other = EventFeed::generate(&mut rng, 5, 10, fixed_now(), TimeDelta::hours(2));
        let merged = feed(9, 10).merge(other);

        assert_eq!(merged.len(), 20);
        for pair in merged.events().windows(2) {
            assert!(pair[0].occurred_at >= pair[1].occurred_at);
        }
    }

    #[test]
    fn test_event_kind_parse() {
        assert_eq!("Vehicle".parse(), Ok(EventKind::Vehicle));
        assert!("drone".parse::<EventKind>().is_err());
    }
}
