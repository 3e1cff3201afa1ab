#[cfg(test)]
#[path = "replica_test.rs"]
mod replica_test;

// ReplicaState (spec.md §4.2) and the metadata write path (spec.md §4.4,
// §4.6): version-gated writes, the leader's two-phase commit, and the
// follower-side Vote/Commit/Update handlers.

use std::collections::HashSet;
use std::sync::Arc;

use surfstore_common::ReplicaId;
use tokio::sync::RwLock;

use crate::file_table::{current_version, next_version, FileEntry, FileTable};
use crate::log::{Cmd, LogEntry};
use crate::peer::{BlockSource, MetadataPeer};

/// `ModifyFile`/`DeleteFile` result codes (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Ok,
    OldVersion,
    MissingBlocks,
    NotLeader,
}

impl WriteOutcome {
    pub fn code(self) -> i32 {
        match self {
            WriteOutcome::Ok => 0,
            WriteOutcome::OldVersion => 1,
            WriteOutcome::MissingBlocks => 2,
            WriteOutcome::NotLeader => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub outcome: WriteOutcome,
    pub current_version: u32,
    pub missing_blocks: Vec<String>,
}

impl WriteResult {
    fn not_leader() -> Self {
        Self { outcome: WriteOutcome::NotLeader, current_version: 0, missing_blocks: vec![] }
    }

    fn old_version(current_version: u32) -> Self {
        Self { outcome: WriteOutcome::OldVersion, current_version, missing_blocks: vec![] }
    }

    fn missing_blocks(current_version: u32, missing_blocks: Vec<String>) -> Self {
        Self { outcome: WriteOutcome::MissingBlocks, current_version, missing_blocks }
    }

    fn ok(current_version: u32) -> Self {
        Self { outcome: WriteOutcome::Ok, current_version, missing_blocks: vec![] }
    }

    /// `DeleteFile`'s result shape: `metadata_store.py`'s `DeleteFile` never
    /// assigns `current_version` on the protobuf reply, in either branch, so
    /// it stays at the wire type's zero default regardless of outcome.
    fn delete_outcome(outcome: WriteOutcome) -> Self {
        Self { outcome, current_version: 0, missing_blocks: vec![] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadResult {
    pub version: u32,
    pub blocklist: Vec<String>,
}

struct Inner {
    file_table: FileTable,
    log: Vec<LogEntry>,
    crashed: bool,
    /// Indices into `ReplicaState::peers` believed unreachable.
    crashed_followers: HashSet<usize>,
}

/// Per-replica state: the file table, the replicated log, the
/// crash/leader flags, and the peer connections -- all one consistency
/// domain guarded by a single `RwLock` (spec.md §5: "A single coarse mutex
/// guarding the whole metadata write path is sufficient and is the
/// recommended default").
pub struct ReplicaState {
    pub my_id: ReplicaId,
    pub is_leader: bool,
    pub peers: Vec<Arc<dyn MetadataPeer>>,
    pub block_store: Arc<dyn BlockSource>,
    inner: RwLock<Inner>,
}

const CATCHUP_BACKOFF_START_MS: u64 = 50;
const CATCHUP_BACKOFF_MAX_MS: u64 = 2_000;

impl ReplicaState {
    pub fn new(
        my_id: ReplicaId,
        is_leader: bool,
        peers: Vec<Arc<dyn MetadataPeer>>,
        block_store: Arc<dyn BlockSource>,
    ) -> Self {
        Self {
            my_id,
            is_leader,
            peers,
            block_store,
            inner: RwLock::new(Inner {
                file_table: FileTable::new(),
                log: Vec::new(),
                crashed: false,
                crashed_followers: HashSet::new(),
            }),
        }
    }

    fn majority(&self) -> usize {
        self.peers.len().div_ceil(2)
    }

    // ---- Reads (spec.md §4.3) ----------------------------------------

    /// Pure read over the local file table; served regardless of leader or
    /// crashed status (spec.md §4.3, §9 Open Question resolution #2).
    pub async fn read_file(&self, filename: &str) -> ReadResult {
        if filename.is_empty() {
            return ReadResult::default();
        }
        let inner = self.inner.read().await;
        match inner.file_table.get(filename) {
            Some(entry) => ReadResult { version: entry.version, blocklist: entry.blocklist.clone() },
            None => ReadResult::default(),
        }
    }

    pub async fn is_crashed(&self) -> bool {
        self.inner.read().await.crashed
    }

    /// Length of the replicated log, used by tests and the catch-up loop
    /// to observe convergence (spec.md §3 invariant 4).
    pub async fn log_len(&self) -> usize {
        self.inner.read().await.log.len()
    }

    pub async fn log_snapshot(&self) -> Vec<LogEntry> {
        self.inner.read().await.log.clone()
    }

    /// Peer indices the leader currently believes are down (spec.md §4.7).
    pub async fn crashed_follower_indices(&self) -> Vec<usize> {
        self.inner.read().await.crashed_followers.iter().copied().collect()
    }

    /// Called by the catch-up loop once a previously-crashed peer
    /// acknowledges an `Update`.
    pub async fn mark_caught_up(&self, idx: usize) {
        self.inner.write().await.crashed_followers.remove(&idx);
    }

    /// Marks peer `idx` as believed-down outside of a 2PC round. Used by
    /// tests to set up a catch-up scenario directly.
    #[cfg(test)]
    pub(crate) async fn mark_crashed(&self, idx: usize) {
        self.inner.write().await.crashed_followers.insert(idx);
    }

    // ---- Crash control (spec.md §4.8) ---------------------------------

    /// No-op on the leader -- the leader cannot be crashed by RPC (spec.md
    /// §4.8, §9 Open Question resolution #3).
    pub async fn crash(&self) {
        if self.is_leader {
            return;
        }
        self.inner.write().await.crashed = true;
    }

    pub async fn restore(&self) {
        self.inner.write().await.crashed = false;
    }

    // ---- Writes (spec.md §4.4) -----------------------------------------

    pub async fn modify_file(&self, filename: String, version: u32, blocklist: Vec<String>) -> WriteResult {
        if !self.is_leader {
            return WriteResult::not_leader();
        }
        let mut inner = self.inner.write().await;
        let prev = current_version(&inner.file_table, &filename);
        if version != next_version(&inner.file_table, &filename) {
            return WriteResult::old_version(prev);
        }

        let entry = LogEntry::modify(filename.clone(), version, blocklist.clone());
        self.two_phase_commit(&mut inner, entry).await;

        // The reference's `check_blockstore_connection` is a best-effort
        // probe run before computing missing blocks; its failure is
        // logged, not fatal (SPEC_FULL.md §4.4, §7).
        self.block_store.ping().await;
        let missing = self.missing_blocks(&blocklist).await;
        if !missing.is_empty() {
            return WriteResult::missing_blocks(prev, missing);
        }

        inner.file_table.insert(filename, FileEntry::written(version, blocklist));
        WriteResult::ok(version)
    }

    pub async fn delete_file(&self, filename: String, version: u32) -> WriteResult {
        if !self.is_leader {
            return WriteResult::not_leader();
        }
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.file_table.get(&filename) else {
            // Non-existence is treated as OLD_VERSION, not a distinct
            // error (spec.md §4.4).
            return WriteResult::delete_outcome(WriteOutcome::OldVersion);
        };
        if existing.deleted || version != existing.version + 1 {
            return WriteResult::delete_outcome(WriteOutcome::OldVersion);
        }

        let entry = LogEntry::delete(filename.clone(), version);
        self.two_phase_commit(&mut inner, entry).await;

        inner.file_table.insert(filename, FileEntry::deleted(version));
        WriteResult::delete_outcome(WriteOutcome::Ok)
    }

    async fn missing_blocks(&self, blocklist: &[String]) -> Vec<String> {
        let mut missing = Vec::new();
        for hash in blocklist {
            if !self.block_store.has_block(hash).await {
                missing.push(hash.clone());
            }
        }
        missing
    }

    // ---- Two-phase commit (spec.md §4.6) -------------------------------

    /// Runs to completion: on a majority-vote shortfall it rolls back,
    /// busy-waits (bounded by exponential backoff, SPEC_FULL.md §4.6) for
    /// crashed peers to recover, and retries the whole round. The caller's
    /// write-lock guard is held for the duration, serialising writes
    /// exactly as spec.md §5 requires.
    async fn two_phase_commit(&self, inner: &mut Inner, entry: LogEntry) {
        let majority = self.majority();
        loop {
            inner.log.push(entry.clone());
            let votes = self.run_vote_phase(inner).await;
            if votes >= majority {
                self.run_commit_phase(inner, &entry).await;
                return;
            }
            inner.log.pop();
            self.wait_for_majority_recovery(inner, majority).await;
        }
    }

    /// Asks every peer to vote, regardless of whether it was previously
    /// believed crashed (the reference always polls the full peer list).
    /// Returns the number of `true` votes. A `true` vote never clears
    /// `crashed_followers` here -- a peer that crashed, missed some commits,
    /// and is now merely reachable again still needs the catch-up `Update`
    /// path (or the rollback-recovery poll) to replay what it missed before
    /// it is safe to resume sending it only new entries via `Commit`.
    async fn run_vote_phase(&self, inner: &mut Inner) -> usize {
        let mut votes = 0;
        for (idx, peer) in self.peers.iter().enumerate() {
            if peer.vote().await {
                votes += 1;
            } else {
                inner.crashed_followers.insert(idx);
            }
        }
        votes
    }

    async fn run_commit_phase(&self, inner: &mut Inner, entry: &LogEntry) {
        let targets: Vec<usize> =
            (0..self.peers.len()).filter(|idx| !inner.crashed_followers.contains(idx)).collect();
        for idx in targets {
            if self.peers[idx].commit(entry).await.is_err() {
                inner.crashed_followers.insert(idx);
            }
        }
    }

    /// Spec.md §9: "the reference recurses into a tight poll loop with no
    /// back-off". We keep the liveness contract (block until majority is
    /// reachable) but bound the poll cadence with exponential backoff, as
    /// spec.md §9 itself recommends.
    async fn wait_for_majority_recovery(&self, inner: &mut Inner, majority: usize) {
        let mut backoff_ms = CATCHUP_BACKOFF_START_MS;
        loop {
            let crashed: Vec<usize> = inner.crashed_followers.iter().copied().collect();
            for idx in crashed {
                if self.peers[idx].vote().await {
                    inner.crashed_followers.remove(&idx);
                }
            }
            let live = self.peers.len() - inner.crashed_followers.len();
            if live >= majority {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
            backoff_ms = (backoff_ms * 2).min(CATCHUP_BACKOFF_MAX_MS);
        }
    }

    // ---- Follower RPCs (spec.md §4.5) ----------------------------------

    pub async fn vote(&self) -> bool {
        !self.inner.read().await.crashed
    }

    /// Applies a single committed entry. A follower trusts the leader: it
    /// does not re-check version continuity or block presence.
    pub async fn commit(&self, entry: LogEntry) {
        let mut inner = self.inner.write().await;
        if inner.crashed {
            return;
        }
        apply_entry(&mut inner.file_table, &entry);
        inner.log.push(entry);
    }

    /// Applies the suffix of `leader_log` this replica is missing. Returns
    /// `false` if crashed (spec.md §4.5).
    pub async fn update(&self, leader_log: Vec<LogEntry>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.crashed {
            return false;
        }
        if leader_log.len() > inner.log.len() {
            for entry in leader_log.into_iter().skip(inner.log.len()) {
                apply_entry(&mut inner.file_table, &entry);
                inner.log.push(entry);
            }
        }
        true
    }
}

fn apply_entry(file_table: &mut FileTable, entry: &LogEntry) {
    let applied = match entry.cmd {
        Cmd::Mod => FileEntry::written(entry.version, entry.blocklist.clone()),
        Cmd::Del => FileEntry::deleted(entry.version),
    };
    file_table.insert(entry.filename.clone(), applied);
}
