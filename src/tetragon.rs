// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Minimal Tetragon `FineGuidanceSensors` client.
//!
//! Only the subset of `tetragon.proto` needed to subscribe to process-exec
//! events is modelled. Field tags match the upstream definitions so the
//! messages decode the agent's wire format; unknown fields are skipped by
//! prost.

use crate::errors::StreamError;
use futures::{Stream, StreamExt};
use hyper_util::rt::TokioIo;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;
use tracing::{debug, info};

use crate::constants::TETRAGON_PLACEHOLDER_URI;

const GET_EVENTS_PATH: &str = "/tetragon.FineGuidanceSensors/GetEvents";

/// Event categories understood by the sensor's `event_set` filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EventType {
    Undef = 0,
    ProcessExec = 1,
    ProcessExit = 5,
}

/// Subscription request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventsRequest {
    #[prost(message, repeated, tag = "1")]
    pub allow_list: Vec<Filter>,
    #[prost(message, repeated, tag = "2")]
    pub deny_list: Vec<Filter>,
}

/// Server-side event filter. Fields within a filter are ANDed.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Filter {
    #[prost(string, repeated, tag = "1")]
    pub binary_regex: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub namespace: Vec<String>,
    #[prost(enumeration = "EventType", repeated, tag = "6")]
    pub event_set: Vec<i32>,
    #[prost(string, repeated, tag = "7")]
    pub pod_regex: Vec<String>,
    #[prost(string, repeated, tag = "8")]
    pub arguments_regex: Vec<String>,
}

/// One streamed event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetEventsResponse {
    #[prost(oneof = "get_events_response::Event", tags = "1")]
    pub event: Option<get_events_response::Event>,
    #[prost(string, tag = "1000")]
    pub node_name: String,
}

pub mod get_events_response {
    /// Event payload; only process-exec is decoded.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        #[prost(message, tag = "1")]
        ProcessExec(super::ProcessExec),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProcessExec {
    #[prost(message, optional, tag = "1")]
    pub process: Option<Process>,
    #[prost(message, optional, tag = "2")]
    pub parent: Option<Process>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Process {
    #[prost(string, tag = "1")]
    pub exec_id: String,
    #[prost(string, tag = "4")]
    pub cwd: String,
    #[prost(string, tag = "5")]
    pub binary: String,
    #[prost(string, tag = "6")]
    pub arguments: String,
    #[prost(message, optional, tag = "10")]
    pub pod: Option<Pod>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Pod {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(string, tag = "2")]
    pub name: String,
}

/// Hand-rolled equivalent of the generated `FineGuidanceSensorsClient`,
/// limited to `GetEvents`.
#[derive(Debug, Clone)]
pub struct FineGuidanceSensorsClient {
    inner: tonic::client::Grpc<Channel>,
}

impl FineGuidanceSensorsClient {
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Open the server-streaming `GetEvents` call.
    ///
    /// # Errors
    ///
    /// Returns the gRPC status if the channel is not ready or the call is
    /// rejected.
    pub async fn get_events(
        &mut self,
        request: GetEventsRequest,
    ) -> Result<tonic::Response<tonic::Streaming<GetEventsResponse>>, tonic::Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {e}")))?;
        let codec = tonic::codec::ProstCodec::default();
        let path = PathAndQuery::from_static(GET_EVENTS_PATH);
        self.inner
            .server_streaming(tonic::Request::new(request), path, codec)
            .await
    }
}

/// Dial the Tetragon agent over its unix socket.
///
/// # Errors
///
/// Returns [`StreamError::Connect`] if the socket cannot be reached.
pub async fn connect(socket: &Path) -> Result<Channel, StreamError> {
    let connect_error = |reason: String| StreamError::Connect {
        socket: socket.display().to_string(),
        reason,
    };

    let path: PathBuf = socket.to_path_buf();
    debug!(socket = %socket.display(), "Dialing Tetragon agent");
    let channel = Endpoint::try_from(TETRAGON_PLACEHOLDER_URI)
        .map_err(|e| connect_error(e.to_string()))?
        .connect_with_connector(service_fn(move |_: Uri| {
            let path = path.clone();
            async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
        }))
        .await
        .map_err(|e| connect_error(e.to_string()))?;

    info!(socket = %socket.display(), "Connected to Tetragon agent");
    Ok(channel)
}

/// Subscribe to the events selected by `filter`.
///
/// The returned stream yields each response or the error that ended it.
///
/// # Errors
///
/// Returns an error if the socket cannot be dialed or the call is rejected.
pub async fn subscribe(
    socket: &Path,
    filter: Filter,
) -> Result<impl Stream<Item = Result<GetEventsResponse, StreamError>>, StreamError> {
    let channel = connect(socket).await?;
    let mut client = FineGuidanceSensorsClient::new(channel);

    let request = GetEventsRequest {
        allow_list: vec![filter],
        deny_list: vec![],
    };
    let stream = client.get_events(request).await?.into_inner();

    Ok(stream.map(|item| item.map_err(StreamError::from)))
}

#[cfg(test)]
#[path = "tetragon_tests.rs"]
mod tetragon_tests;
