// Peer connection management (SPEC_FULL.md §4.9): each replica lazily
// connects to the peers its role requires -- a follower only to the
// leader, the leader to every other replica -- mirroring
// `metadata_store.py`'s `get_metadata_stub_list`.
//
// Both RPC surfaces the write path depends on (the other metadata
// replicas, and the block store) are abstracted behind traits so the
// two-phase commit and write-path logic in `replica.rs` can be exercised
// in tests without a real transport, the same way `papyrus_consensus`
// hides its network behind the `ConsensusContext` trait.

use std::time::Duration;

use async_trait::async_trait;
use surfstore_common::ReplicaId;
use surfstore_proto::surfstore::block_store_client::BlockStoreClient;
use surfstore_proto::surfstore::metadata_store_client::MetadataStoreClient;
use surfstore_proto::surfstore::{Block, Empty, Log, Logs};
use tonic::transport::Channel;
use tonic::Request;

use crate::log::LogEntry;

const PEER_TIMEOUT: Duration = Duration::from_secs(1);

fn lazy_channel(port: u16) -> Channel {
    Channel::from_shared(format!("http://127.0.0.1:{port}"))
        .expect("127.0.0.1 endpoint is always a valid URI")
        .timeout(PEER_TIMEOUT)
        .connect_lazy()
}

/// The leader's view of one metadata-store peer: the follower RPCs of
/// spec.md §4.5 plus the startup reachability probe of §6.3.
#[async_trait]
pub trait MetadataPeer: Send + Sync {
    /// `true` only on an explicit `{answer: true}` reply; any transport
    /// failure or explicit `false` is treated identically -- as a vote the
    /// leader cannot count (spec.md §4.6).
    async fn vote(&self) -> bool;

    async fn commit(&self, entry: &LogEntry) -> Result<(), tonic::Status>;

    async fn update(&self, logs: Vec<LogEntry>) -> bool;

    /// Best-effort reachability probe, used only at startup. Failures are
    /// not reported -- a not-yet-running peer at boot time is expected.
    async fn ping(&self);
}

/// A handle to one metadata-store peer, addressed by its 1-based replica
/// index (spec.md §9: "reference them by integer index, never by embedded
/// pointers"), backed by a real gRPC channel.
#[derive(Clone)]
pub struct GrpcPeer {
    pub id: ReplicaId,
    client: MetadataStoreClient<Channel>,
}

impl GrpcPeer {
    pub fn connect(id: ReplicaId, port: u16) -> Self {
        Self { id, client: MetadataStoreClient::new(lazy_channel(port)) }
    }
}

#[async_trait]
impl MetadataPeer for GrpcPeer {
    async fn vote(&self) -> bool {
        let mut client = self.client.clone();
        matches!(client.vote(Request::new(Empty {})).await, Ok(resp) if resp.into_inner().answer)
    }

    async fn commit(&self, entry: &LogEntry) -> Result<(), tonic::Status> {
        let mut client = self.client.clone();
        client.commit(Request::new(entry.to_proto())).await?;
        Ok(())
    }

    async fn update(&self, logs: Vec<LogEntry>) -> bool {
        let mut client = self.client.clone();
        let all_logs = logs.iter().map(LogEntry::to_proto).collect();
        matches!(client.update(Request::new(Logs { all_logs })).await, Ok(resp) if resp.into_inner().answer)
    }

    async fn ping(&self) {
        let mut client = self.client.clone();
        let _ = client.ping(Request::new(Empty {})).await;
    }
}

/// The write path's view of the block store: presence checks and a
/// liveness probe (spec.md §4.4 step 5, §7's "BlockStore unreachable"
/// row).
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns `false` (and logs) if the block store cannot be reached,
    /// matching `check_blockstore_connection`'s reference behavior: the
    /// write path proceeds regardless, treating every block as missing if
    /// the connection is in fact down (SPEC_FULL.md §4.4, §7).
    async fn ping(&self) -> bool;

    async fn has_block(&self, hash: &str) -> bool;
}

#[derive(Clone)]
pub struct GrpcBlockSource {
    client: BlockStoreClient<Channel>,
}

impl GrpcBlockSource {
    pub fn connect(port: u16) -> Self {
        Self { client: BlockStoreClient::new(lazy_channel(port)) }
    }
}

#[async_trait]
impl BlockSource for GrpcBlockSource {
    async fn ping(&self) -> bool {
        let mut client = self.client.clone();
        let reachable = client.ping(Request::new(Empty {})).await.is_ok();
        if !reachable {
            tracing::warn!("metadata store could not connect to block store");
        }
        reachable
    }

    async fn has_block(&self, hash: &str) -> bool {
        let mut client = self.client.clone();
        let request = Request::new(Block { hash: hash.to_string(), data: Vec::new() });
        matches!(client.has_block(request).await, Ok(resp) if resp.into_inner().answer)
    }
}
