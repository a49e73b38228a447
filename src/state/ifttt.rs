//! Feed of "effect requested" events served to the IFTTT polling trigger.

use std::collections::VecDeque;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::state::effect::Effect;

/// Number of real events retained for polling.
pub const FEED_CAPACITY: usize = 50;
/// Limit applied when IFTTT does not send one.
pub const DEFAULT_TRIGGER_LIMIT: usize = 50;
/// Largest page served to the IFTTT poller, whatever `limit` it asks for.
pub const MAX_TRIGGER_LIMIT: usize = 50;
/// Spacing between padded sample events, in seconds.
const SAMPLE_SPACING_SECS: i64 = 60;

/// One entry of the effect feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectRequest {
    /// Unique id, reused as IFTTT's dedupe id.
    pub id: String,
    /// Effect that was fired.
    pub effect: Effect,
    /// Unix timestamp in seconds, strictly increasing across recorded events.
    pub timestamp: i64,
    /// Who fired it.
    pub source: String,
}

struct FeedInner {
    events: VecDeque<EffectRequest>,
    last_timestamp: i64,
}

/// Bounded, newest-last log of dispatched effects.
pub struct EffectFeed {
    anchor: i64,
    inner: Mutex<FeedInner>,
}

impl EffectFeed {
    /// Create an empty feed anchored at `now`; padded samples always predate the anchor.
    pub fn new(now: OffsetDateTime) -> Self {
        let anchor = now.unix_timestamp();
        Self {
            anchor,
            inner: Mutex::new(FeedInner {
                events: VecDeque::with_capacity(FEED_CAPACITY),
                last_timestamp: anchor,
            }),
        }
    }

    /// Append an event for `effect`, returning the stored entry.
    pub async fn record(
        &self,
        effect: Effect,
        source: impl Into<String>,
        now: OffsetDateTime,
    ) -> EffectRequest {
        let mut inner = self.inner.lock().await;
        // IFTTT deduplicates on meta.id but orders on meta.timestamp, which must stay strictly
        // monotonic even when several effects land within the same second.
        let timestamp = now.unix_timestamp().max(inner.last_timestamp + 1);
        inner.last_timestamp = timestamp;

        let request = EffectRequest {
            id: Uuid::new_v4().simple().to_string(),
            effect,
            timestamp,
            source: source.into(),
        };
        if inner.events.len() == FEED_CAPACITY {
            inner.events.pop_front();
        }
        inner.events.push_back(request.clone());
        request
    }

    /// Return up to `limit` events, newest first, padded with stable sample events when the feed
    /// holds fewer than `limit` real ones. `limit` is capped at [`MAX_TRIGGER_LIMIT`].
    pub async fn latest(&self, limit: usize) -> Vec<EffectRequest> {
        let limit = limit.min(MAX_TRIGGER_LIMIT);
        let inner = self.inner.lock().await;
        let mut events: Vec<EffectRequest> =
            inner.events.iter().rev().take(limit).cloned().collect();

        let missing = limit.saturating_sub(events.len());
        events.extend((0..missing).map(|index| self.sample(index)));
        events
    }

    /// Number of real events currently retained.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.events.len()
    }

    fn sample(&self, index: usize) -> EffectRequest {
        let offset = i64::try_from(index).unwrap_or(i64::MAX / SAMPLE_SPACING_SECS - 1) + 1;
        EffectRequest {
            id: format!("sample-{index}"),
            effect: Effect::ALL[index % Effect::ALL.len()],
            timestamp: self.anchor - offset * SAMPLE_SPACING_SECS,
            source: "sample".into(),
        }
    }
}
