#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;

// The BlockStore gRPC service (spec.md §4.1, §6.1): a thin translation
// layer between tonic's `Request`/`Response` envelopes and `BlockMap`.

use std::sync::Arc;

use surfstore_proto::surfstore::block_store_server::BlockStore;
use surfstore_proto::surfstore::{Block, Empty, SimpleAnswer};
use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::block_map::BlockMap;

pub struct BlockStoreService {
    blocks: Arc<BlockMap>,
}

impl BlockStoreService {
    pub fn new(blocks: Arc<BlockMap>) -> Self {
        Self { blocks }
    }
}

#[tonic::async_trait]
impl BlockStore for BlockStoreService {
    #[instrument(skip_all)]
    async fn ping(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all, fields(hash = %request.get_ref().hash))]
    async fn store_block(&self, request: Request<Block>) -> Result<Response<Empty>, Status> {
        let block = request.into_inner();
        self.blocks.store(block.hash, block.data);
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all, fields(hash = %request.get_ref().hash))]
    async fn get_block(&self, request: Request<Block>) -> Result<Response<Block>, Status> {
        let hash = request.into_inner().hash;
        let reply = match self.blocks.get(&hash) {
            Some(data) => Block { hash, data },
            // Absent-key behavior is defensive, not primary (spec.md §4.1):
            // callers are required to call HasBlock first.
            None => {
                tracing::warn!(hash, "GetBlock called for a hash with no stored block");
                Block { hash: String::new(), data: Vec::new() }
            }
        };
        Ok(Response::new(reply))
    }

    #[instrument(skip_all, fields(hash = %request.get_ref().hash))]
    async fn has_block(&self, request: Request<Block>) -> Result<Response<SimpleAnswer>, Status> {
        let hash = request.into_inner().hash;
        let answer = self.blocks.has(&hash);
        Ok(Response::new(SimpleAnswer { answer }))
    }
}
