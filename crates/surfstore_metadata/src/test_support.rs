// In-process test doubles for the peer/block-store traits (peer.rs), used
// throughout this crate's test suite. `LocalPeer` is genuine two-replica
// wiring -- it dispatches straight into a second `ReplicaState`, the same
// way a real tonic service would dispatch an incoming RPC, and so is kept
// hand-written. The fixed-canned-behavior doubles (`UnreachablePeer`,
// `AlwaysMissingBlockSource`, `FakeBlockSource`) are backed by `mockall`
// mocks instead, matching the teacher's own tool for mocking an
// `async_trait` interface for canned behavior
// (`examples/starkware-libs-papyrus/crates/sequencing/papyrus_consensus/src/test_utils.rs`'s
// `mock! { pub TestContext {} ... }` for `ConsensusContext`).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use mockall::mock;

use crate::log::LogEntry;
use crate::peer::{BlockSource, MetadataPeer};
use crate::replica::ReplicaState;

/// Wraps another in-process replica as a peer, so a small cluster of
/// `ReplicaState`s can run the full 2PC / catch-up protocol against each
/// other inside a single test process.
pub struct LocalPeer {
    pub replica: Arc<ReplicaState>,
}

#[async_trait]
impl MetadataPeer for LocalPeer {
    async fn vote(&self) -> bool {
        self.replica.vote().await
    }

    async fn commit(&self, entry: &LogEntry) -> Result<(), tonic::Status> {
        self.replica.commit(entry.clone()).await;
        Ok(())
    }

    async fn update(&self, logs: Vec<LogEntry>) -> bool {
        self.replica.update(logs).await
    }

    async fn ping(&self) {}
}

mock! {
    pub MetadataPeerDouble {}

    #[async_trait]
    impl MetadataPeer for MetadataPeerDouble {
        async fn vote(&self) -> bool;
        async fn commit(&self, entry: &LogEntry) -> Result<(), tonic::Status>;
        async fn update(&self, logs: Vec<LogEntry>) -> bool;
        async fn ping(&self);
    }
}

/// A peer that is always unreachable -- every call fails or returns
/// `false`, simulating a permanently crashed follower.
pub struct UnreachablePeer {
    mock: MockMetadataPeerDouble,
}

impl UnreachablePeer {
    pub fn new() -> Self {
        let mut mock = MockMetadataPeerDouble::new();
        mock.expect_vote().returning(|| false);
        mock.expect_commit().returning(|_| Err(tonic::Status::unavailable("peer is down")));
        mock.expect_update().returning(|_| false);
        mock.expect_ping().returning(|| ());
        Self { mock }
    }
}

#[async_trait]
impl MetadataPeer for UnreachablePeer {
    async fn vote(&self) -> bool {
        self.mock.vote().await
    }
    async fn commit(&self, entry: &LogEntry) -> Result<(), tonic::Status> {
        self.mock.commit(entry).await
    }
    async fn update(&self, logs: Vec<LogEntry>) -> bool {
        self.mock.update(logs).await
    }
    async fn ping(&self) {
        self.mock.ping().await
    }
}

mock! {
    pub BlockSourceDouble {}

    #[async_trait]
    impl BlockSource for BlockSourceDouble {
        async fn ping(&self) -> bool;
        async fn has_block(&self, hash: &str) -> bool;
    }
}

/// A block store that reports every block missing. Used by write-path
/// tests that only care about the version/leader gating, not the
/// missing-blocks ratchet.
pub struct AlwaysMissingBlockSource {
    mock: MockBlockSourceDouble,
}

impl AlwaysMissingBlockSource {
    pub fn new() -> Self {
        let mut mock = MockBlockSourceDouble::new();
        mock.expect_ping().returning(|| true);
        mock.expect_has_block().returning(|_| false);
        Self { mock }
    }
}

#[async_trait]
impl BlockSource for AlwaysMissingBlockSource {
    async fn ping(&self) -> bool {
        self.mock.ping().await
    }
    async fn has_block(&self, hash: &str) -> bool {
        self.mock.has_block(hash).await
    }
}

/// A block store mock backed by an in-memory set of "stored" block hashes,
/// mirroring the block store's own `HasBlock` contract for tests that
/// exercise the missing-blocks ratchet (spec.md §8 scenario 1). The `mock`
/// field's `has_block` expectation closes over `stored`, so `.store()` can
/// still mutate the set between `ModifyFile` calls the way the real
/// `BlockMap` does.
pub struct FakeBlockSource {
    mock: MockBlockSourceDouble,
    stored: Arc<Mutex<HashSet<String>>>,
}

impl FakeBlockSource {
    pub fn new() -> Self {
        let stored: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut mock = MockBlockSourceDouble::new();
        mock.expect_ping().returning(|| true);
        let lookup = stored.clone();
        mock.expect_has_block().returning(move |hash| lookup.lock().unwrap().contains(hash));
        Self { mock, stored }
    }

    pub fn store(&self, hash: &str) {
        self.stored.lock().unwrap().insert(hash.to_string());
    }
}

#[async_trait]
impl BlockSource for FakeBlockSource {
    async fn ping(&self) -> bool {
        self.mock.ping().await
    }
    async fn has_block(&self, hash: &str) -> bool {
        self.mock.has_block(hash).await
    }
}
