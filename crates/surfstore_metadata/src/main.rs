use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use surfstore_common::cli::MetadataStoreArgs;
use surfstore_common::tracing_setup::configure_tracing;
use surfstore_common::{ClusterConfig, ReplicaId};
use surfstore_metadata::{run_catchup_loop, GrpcBlockSource, GrpcPeer, MetadataPeer, MetadataStoreService, ReplicaState};
use surfstore_proto::surfstore::metadata_store_server::MetadataStoreServer;
use tonic::transport::Server;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args = MetadataStoreArgs::parse();
    configure_tracing();

    let config = match ClusterConfig::from_file(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            exit(1);
        }
    };

    if let Err(err) = config.metadata_port(args.number) {
        error!("{err}");
        exit(1);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.threads)
        .enable_all()
        .build()?;
    runtime.block_on(run(config, args.number))
}

/// Builds this replica's peer list per spec.md §4.2: a follower dials only
/// the leader, while the leader dials every other replica.
fn build_peers(config: &ClusterConfig, my_id: ReplicaId) -> anyhow::Result<Vec<Arc<dyn MetadataPeer>>> {
    let is_leader = config.is_leader(my_id);
    let targets: Vec<ReplicaId> = if is_leader {
        (1..=config.num_metadata_servers).filter(|id| *id != my_id).collect()
    } else {
        vec![config.num_leaders]
    };

    targets
        .into_iter()
        .map(|id| -> anyhow::Result<Arc<dyn MetadataPeer>> {
            let port = config.metadata_port(id)?;
            Ok(Arc::new(GrpcPeer::connect(id, port)))
        })
        .collect()
}

async fn run(config: ClusterConfig, my_id: ReplicaId) -> anyhow::Result<()> {
    let is_leader = config.is_leader(my_id);
    let peers = build_peers(&config, my_id)?;
    let block_store = Arc::new(GrpcBlockSource::connect(config.block_port));
    let state = Arc::new(ReplicaState::new(my_id, is_leader, peers, block_store));

    // Best-effort startup probe: a peer that hasn't come up yet is expected
    // and not fatal (SPEC_FULL.md §6.3).
    for peer in &state.peers {
        peer.ping().await;
    }

    if is_leader {
        tokio::spawn(run_catchup_loop(state.clone()));
    }

    let port = config.metadata_port(my_id)?;
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let service = MetadataStoreService::new(state);

    info!(%addr, my_id, is_leader, "metadata store server starting");
    Server::builder().add_service(MetadataStoreServer::new(service)).serve(addr).await?;
    Ok(())
}
