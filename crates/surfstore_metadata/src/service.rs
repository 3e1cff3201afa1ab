#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;

// The MetadataStore gRPC service (spec.md §4.3-§4.5, §6.1): translates
// tonic's `Request`/`Response` envelopes to and from `ReplicaState`.

use std::sync::Arc;

use surfstore_proto::surfstore::metadata_store_server::MetadataStore;
use surfstore_proto::surfstore::{Empty, FileInfo, Log, Logs, SimpleAnswer, WriteResult as ProtoWriteResult};
use tonic::{Request, Response, Status};
use tracing::instrument;

use crate::log::LogEntry;
use crate::replica::ReplicaState;

pub struct MetadataStoreService {
    state: Arc<ReplicaState>,
}

impl MetadataStoreService {
    pub fn new(state: Arc<ReplicaState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl MetadataStore for MetadataStoreService {
    #[instrument(skip_all)]
    async fn ping(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all, fields(filename = %request.get_ref().filename))]
    async fn read_file(&self, request: Request<FileInfo>) -> Result<Response<FileInfo>, Status> {
        let filename = request.into_inner().filename;
        let result = self.state.read_file(&filename).await;
        Ok(Response::new(FileInfo {
            filename,
            version: result.version as i32,
            blocklist: result.blocklist,
        }))
    }

    #[instrument(skip_all, fields(filename = %request.get_ref().filename, version = request.get_ref().version))]
    async fn modify_file(
        &self,
        request: Request<FileInfo>,
    ) -> Result<Response<ProtoWriteResult>, Status> {
        let fi = request.into_inner();
        let version = non_negative_version(fi.version)?;
        let result = self.state.modify_file(fi.filename, version, fi.blocklist).await;
        Ok(Response::new(to_proto_write_result(result)))
    }

    #[instrument(skip_all, fields(filename = %request.get_ref().filename, version = request.get_ref().version))]
    async fn delete_file(
        &self,
        request: Request<FileInfo>,
    ) -> Result<Response<ProtoWriteResult>, Status> {
        let fi = request.into_inner();
        let version = non_negative_version(fi.version)?;
        let result = self.state.delete_file(fi.filename, version).await;
        Ok(Response::new(to_proto_write_result(result)))
    }

    #[instrument(skip_all)]
    async fn vote(&self, _request: Request<Empty>) -> Result<Response<SimpleAnswer>, Status> {
        let answer = self.state.vote().await;
        Ok(Response::new(SimpleAnswer { answer }))
    }

    #[instrument(skip_all, fields(filename = %request.get_ref().filename))]
    async fn commit(&self, request: Request<Log>) -> Result<Response<Empty>, Status> {
        let entry =
            LogEntry::from_proto(request.into_inner()).map_err(Status::invalid_argument)?;
        self.state.commit(entry).await;
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all, fields(entries = request.get_ref().all_logs.len()))]
    async fn update(&self, request: Request<Logs>) -> Result<Response<SimpleAnswer>, Status> {
        let entries = request
            .into_inner()
            .all_logs
            .into_iter()
            .map(LogEntry::from_proto)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Status::invalid_argument)?;
        let answer = self.state.update(entries).await;
        Ok(Response::new(SimpleAnswer { answer }))
    }

    #[instrument(skip_all)]
    async fn is_leader(&self, _request: Request<Empty>) -> Result<Response<SimpleAnswer>, Status> {
        Ok(Response::new(SimpleAnswer { answer: self.state.is_leader }))
    }

    #[instrument(skip_all)]
    async fn crash(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        self.state.crash().await;
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all)]
    async fn restore(&self, _request: Request<Empty>) -> Result<Response<Empty>, Status> {
        self.state.restore().await;
        Ok(Response::new(Empty {}))
    }

    #[instrument(skip_all)]
    async fn is_crashed(&self, _request: Request<Empty>) -> Result<Response<SimpleAnswer>, Status> {
        Ok(Response::new(SimpleAnswer { answer: self.state.is_crashed().await }))
    }
}

fn non_negative_version(version: i32) -> Result<u32, Status> {
    u32::try_from(version).map_err(|_| Status::invalid_argument("version must be non-negative"))
}

fn to_proto_write_result(result: crate::replica::WriteResult) -> ProtoWriteResult {
    ProtoWriteResult {
        result: result.outcome.code(),
        current_version: result.current_version as i32,
        missing_blocks: result.missing_blocks,
    }
}
