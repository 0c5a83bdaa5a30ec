// Best-effort per-player history collection.
//
// One request per player, at most `max_concurrent` in flight, each preceded
// by a short pause to stay under the API's rate limits. A failed request
// costs only that player's history; the failure is recorded and collection
// carries on.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use fpl_core::model::{GameweekRecord, Player};

use crate::config::ApiConfig;
use crate::source::DataSource;

/// A player whose history could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub player_id: u32,
    pub reason: String,
}

/// Histories that loaded plus the players that did not.
#[derive(Debug, Clone, Default)]
pub struct HistoryCollection {
    pub histories: HashMap<u32, Vec<GameweekRecord>>,
    /// Sorted by player id.
    pub failures: Vec<FetchFailure>,
    pub requested: usize,
}

impl HistoryCollection {
    pub fn fetched(&self) -> usize {
        self.histories.len()
    }

    /// Fraction of requested histories that loaded. Nothing requested counts
    /// as full coverage.
    pub fn coverage(&self) -> f64 {
        if self.requested == 0 {
            return 1.0;
        }
        self.fetched() as f64 / self.requested as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_concurrent: usize,
    pub request_delay: Duration,
}

impl FetchLimits {
    pub fn from_config(api: &ApiConfig) -> Self {
        FetchLimits {
            max_concurrent: api.max_concurrent_requests,
            request_delay: api.request_delay(),
        }
    }
}

/// Players whose history can contribute to the defence table. Anyone who has
/// not played a minute has no counted records.
pub fn players_to_fetch(players: &[Player]) -> Vec<u32> {
    players.iter().filter(|p| p.minutes > 0).map(|p| p.id).collect()
}

/// Fetch every player's gameweek history, skipping failures.
pub async fn collect_histories<S>(
    source: &S,
    player_ids: &[u32],
    limits: FetchLimits,
) -> HistoryCollection
where
    S: DataSource + ?Sized,
{
    let delay = limits.request_delay;
    let results: Vec<_> = stream::iter(player_ids.iter().copied())
        .map(move |player_id| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            (player_id, source.fetch_player_history(player_id).await)
        })
        .buffer_unordered(limits.max_concurrent.max(1))
        .collect()
        .await;

    let mut collection = HistoryCollection {
        requested: player_ids.len(),
        ..HistoryCollection::default()
    };

    for (player_id, result) in results {
        match result {
            Ok(summary) => {
                collection.histories.insert(player_id, summary.history);
            }
            Err(e) => {
                warn!(player_id, error = %e, "skipping player history");
                collection.failures.push(FetchFailure {
                    player_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    collection.failures.sort_by_key(|f| f.player_id);

    info!(
        requested = collection.requested,
        fetched = collection.fetched(),
        failed = collection.failures.len(),
        "player histories collected"
    );
    collection
}
