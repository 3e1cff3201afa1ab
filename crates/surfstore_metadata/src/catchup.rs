#[cfg(test)]
#[path = "catchup_test.rs"]
mod catchup_test;

// The leader's catch-up loop (spec.md §4.7): a background task that
// replays the full log to any follower it believes is down, at a fixed
// cadence, until that follower acknowledges.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::replica::ReplicaState;

/// Matches the reference's ~2Hz poll (`time.sleep(0.5)` in
/// `metadata_store.py`'s serve loop).
pub const CATCHUP_TICK: Duration = Duration::from_millis(500);

/// Runs forever, replaying the leader's log to crashed followers. Intended
/// to be spawned as a long-lived `tokio::task` sharing `state`'s lock with
/// the RPC handlers (spec.md §5: "The metadata store's background catch-up
/// task must share the replica mutex with the RPC handlers").
pub async fn run_catchup_loop(state: Arc<ReplicaState>) {
    if !state.is_leader {
        return;
    }
    loop {
        tokio::time::sleep(CATCHUP_TICK).await;
        catchup_tick(&state).await;
    }
}

/// A single catch-up round, split out so tests can drive it deterministically.
pub async fn catchup_tick(state: &ReplicaState) {
    let crashed = state.crashed_follower_indices().await;
    if crashed.is_empty() {
        return;
    }
    let log = state.log_snapshot().await;
    for idx in crashed {
        let Some(peer) = state.peers.get(idx) else { continue };
        if peer.update(log.clone()).await {
            debug!(peer = idx, "catch-up: peer acknowledged update");
            state.mark_caught_up(idx).await;
        } else {
            warn!(peer = idx, "catch-up: peer still unreachable");
        }
    }
}
