use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use surfstore_block::{BlockMap, BlockStoreService};
use surfstore_common::cli::BlockStoreArgs;
use surfstore_common::tracing_setup::configure_tracing;
use surfstore_common::ClusterConfig;
use surfstore_proto::surfstore::block_store_server::BlockStoreServer;
use tonic::transport::Server;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args = BlockStoreArgs::parse();
    configure_tracing();

    let config = match ClusterConfig::from_file(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            exit(1);
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.threads)
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: ClusterConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), config.block_port);
    let service = BlockStoreService::new(Arc::new(BlockMap::new()));

    info!(%addr, "block store server starting");
    Server::builder().add_service(BlockStoreServer::new(service)).serve(addr).await?;
    Ok(())
}
