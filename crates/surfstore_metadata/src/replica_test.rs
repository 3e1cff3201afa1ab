use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{ReplicaState, WriteOutcome};
use crate::catchup::catchup_tick;
use crate::test_support::{AlwaysMissingBlockSource, FakeBlockSource, LocalPeer, UnreachablePeer};

fn solo_leader_with_blocks(blocks: Arc<FakeBlockSource>) -> ReplicaState {
    ReplicaState::new(1, true, vec![], blocks)
}

/// Builds a 3-replica cluster: leader id 1 and two followers (ids 2, 3),
/// wired together with in-process `LocalPeer`s (spec.md §8 scenarios 5-6).
fn three_replica_cluster(
    blocks: Arc<FakeBlockSource>,
) -> (Arc<ReplicaState>, Arc<ReplicaState>, Arc<ReplicaState>) {
    let follower2 =
        Arc::new(ReplicaState::new(2, false, vec![], Arc::new(AlwaysMissingBlockSource::new())));
    let follower3 =
        Arc::new(ReplicaState::new(3, false, vec![], Arc::new(AlwaysMissingBlockSource::new())));
    let leader = Arc::new(ReplicaState::new(
        1,
        true,
        vec![
            Arc::new(LocalPeer { replica: follower2.clone() }),
            Arc::new(LocalPeer { replica: follower3.clone() }),
        ],
        blocks,
    ));
    (leader, follower2, follower3)
}

// ---- Scenario 1: missing-blocks ratchet (spec.md §8) --------------------

#[tokio::test]
async fn missing_blocks_ratchet_down_to_ok_as_blocks_are_stored() {
    let blocks = Arc::new(FakeBlockSource::new());
    let leader = solo_leader_with_blocks(blocks.clone());

    let read = leader.read_file("cat.txt").await;
    assert_eq!(read.version, 0);
    assert!(read.blocklist.is_empty());

    let hashes = vec!["H0".to_string(), "H1".to_string(), "H2".to_string()];
    let result = leader.modify_file("cat.txt".to_string(), 1, hashes.clone()).await;
    assert_eq!(result.outcome, WriteOutcome::MissingBlocks);
    assert_eq!(result.missing_blocks, hashes);

    blocks.store("H0");
    let result = leader.modify_file("cat.txt".to_string(), 1, hashes.clone()).await;
    assert_eq!(result.outcome, WriteOutcome::MissingBlocks);
    assert_eq!(result.missing_blocks, vec!["H1".to_string(), "H2".to_string()]);

    blocks.store("H1");
    blocks.store("H2");
    let result = leader.modify_file("cat.txt".to_string(), 1, hashes).await;
    assert_eq!(result.outcome, WriteOutcome::Ok);
    assert_eq!(result.current_version, 1);
}

// ---- Scenario 2: version gate -------------------------------------------

#[tokio::test]
async fn version_gate_rejects_non_contiguous_versions() {
    let blocks = Arc::new(FakeBlockSource::new());
    blocks.store("H0");
    let leader = solo_leader_with_blocks(blocks);

    let result = leader.modify_file("f".to_string(), 0, vec!["H0".to_string()]).await;
    assert_eq!(result.outcome, WriteOutcome::OldVersion);
    assert_eq!(result.current_version, 0);

    let result = leader.modify_file("f".to_string(), 1, vec!["H0".to_string()]).await;
    assert_eq!(result.outcome, WriteOutcome::Ok);

    let result = leader.modify_file("f".to_string(), 1, vec!["H0".to_string()]).await;
    assert_eq!(result.outcome, WriteOutcome::OldVersion);
    assert_eq!(result.current_version, 1);
}

// ---- Scenario 3: delete and re-create -----------------------------------

#[tokio::test]
async fn delete_then_recreate_follows_the_version_ratchet() {
    let blocks = Arc::new(FakeBlockSource::new());
    blocks.store("H0");
    let leader = solo_leader_with_blocks(blocks);

    let write = leader.modify_file("t.txt".to_string(), 1, vec!["H0".to_string()]).await;
    assert_eq!(write.outcome, WriteOutcome::Ok);

    let del = leader.delete_file("t.txt".to_string(), 1).await;
    assert_eq!(del.outcome, WriteOutcome::OldVersion);
    assert_eq!(del.current_version, 0);

    let del = leader.delete_file("t.txt".to_string(), 2).await;
    assert_eq!(del.outcome, WriteOutcome::Ok);
    assert_eq!(del.current_version, 0);

    let read = leader.read_file("t.txt").await;
    assert_eq!(read.version, 2);
    assert_eq!(read.blocklist, vec!["0".to_string()]);

    let write = leader.modify_file("t.txt".to_string(), 2, vec!["H0".to_string()]).await;
    assert_eq!(write.outcome, WriteOutcome::OldVersion);

    let write = leader.modify_file("t.txt".to_string(), 3, vec!["H0".to_string()]).await;
    assert_eq!(write.outcome, WriteOutcome::Ok);
    assert_eq!(write.current_version, 3);
}

// ---- Scenario 4: not-leader rejection -----------------------------------

#[tokio::test]
async fn follower_rejects_writes_but_still_serves_reads() {
    let follower = ReplicaState::new(2, false, vec![], Arc::new(AlwaysMissingBlockSource::new()));

    let mod_result = follower.modify_file("f".to_string(), 1, vec![]).await;
    assert_eq!(mod_result.outcome, WriteOutcome::NotLeader);

    let del_result = follower.delete_file("f".to_string(), 1).await;
    assert_eq!(del_result.outcome, WriteOutcome::NotLeader);

    let read = follower.read_file("f").await;
    assert_eq!(read.version, 0);
}

// ---- Scenario 5: follower crash and catch-up ----------------------------

#[tokio::test]
async fn crashed_follower_catches_up_after_restore() {
    let blocks = Arc::new(FakeBlockSource::new());
    blocks.store("H0");
    blocks.store("H1");
    let (leader, follower2, follower3) = three_replica_cluster(blocks);

    follower3.crash().await;
    assert!(follower3.is_crashed().await);

    let w1 = leader.modify_file("a.txt".to_string(), 1, vec!["H0".to_string()]).await;
    assert_eq!(w1.outcome, WriteOutcome::Ok);
    let w2 = leader.modify_file("b.txt".to_string(), 1, vec!["H1".to_string()]).await;
    assert_eq!(w2.outcome, WriteOutcome::Ok);

    // Follower 3 missed both commits; follower 2 (always live) has them.
    assert_eq!(follower2.log_len().await, 2);
    assert_eq!(follower3.log_len().await, 0);
    assert!(!leader.crashed_follower_indices().await.is_empty());

    follower3.restore().await;
    catchup_tick(&leader).await;

    assert_eq!(follower3.log_len().await, leader.log_len().await);
    assert!(leader.crashed_follower_indices().await.is_empty());
    let read = follower3.read_file("a.txt").await;
    assert_eq!(read.version, 1);
    assert_eq!(read.blocklist, vec!["H0".to_string()]);
}

#[tokio::test]
async fn a_restored_follower_is_not_cleared_from_crashed_followers_by_a_bare_vote() {
    let blocks = Arc::new(FakeBlockSource::new());
    blocks.store("H0");
    blocks.store("H1");
    blocks.store("H2");
    let (leader, _follower2, follower3) = three_replica_cluster(blocks);

    follower3.crash().await;
    let w1 = leader.modify_file("a.txt".to_string(), 1, vec!["H0".to_string()]).await;
    assert_eq!(w1.outcome, WriteOutcome::Ok);
    let w2 = leader.modify_file("b.txt".to_string(), 1, vec!["H1".to_string()]).await;
    assert_eq!(w2.outcome, WriteOutcome::Ok);
    assert_eq!(follower3.log_len().await, 0);

    // Follower 3 is reachable again, but no catch-up tick has run yet: its
    // vote in the next write's prepare phase must not clear it from
    // `crashed_followers`, or `run_commit_phase` would send it only the
    // third entry and leave a gap before entries 1-2 (spec.md §3 invariant
    // 4 / §8's log-prefix property).
    follower3.restore().await;
    let w3 = leader.modify_file("c.txt".to_string(), 1, vec!["H2".to_string()]).await;
    assert_eq!(w3.outcome, WriteOutcome::Ok);

    assert!(leader.crashed_follower_indices().await.contains(&1));
    assert_eq!(follower3.log_len().await, 0);

    catchup_tick(&leader).await;
    assert_eq!(follower3.log_len().await, leader.log_len().await);
    assert!(leader.crashed_follower_indices().await.is_empty());
}

// ---- Scenario 6: majority loss -------------------------------------------

#[tokio::test]
async fn write_blocks_until_a_follower_is_restored() {
    let blocks = Arc::new(FakeBlockSource::new());
    blocks.store("H0");
    let follower2 =
        Arc::new(ReplicaState::new(2, false, vec![], Arc::new(AlwaysMissingBlockSource::new())));
    let leader = Arc::new(ReplicaState::new(
        1,
        true,
        vec![
            Arc::new(LocalPeer { replica: follower2.clone() }),
            Arc::new(UnreachablePeer::new()),
        ],
        blocks,
    ));

    follower2.crash().await;

    let leader_for_write = leader.clone();
    let write_task = tokio::spawn(async move {
        leader_for_write.modify_file("f".to_string(), 1, vec!["H0".to_string()]).await
    });

    // Give the write a moment to start busy-waiting on a majority vote.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!write_task.is_finished());

    follower2.restore().await;
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), write_task)
        .await
        .expect("write should complete once a follower is restored")
        .unwrap();

    assert_eq!(result.outcome, WriteOutcome::Ok);
    assert_eq!(leader.log_len().await, 1);
}
