use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use warp::{http::StatusCode, Filter, Rejection};

use super::routes::{api, ApiContext};
use super::types::ApiResponse;
use crate::analysis::Analyzer;
use crate::configuration::QueryLimits;
use crate::error_handling::types::WebError;
use crate::storage::Storage;

/// Maps warp rejections to the JSON error body of the API.
pub async fn handle_rejection(err: Rejection) -> Result<ApiResponse, Infallible> {
    let response = if err.is_not_found() {
        ApiResponse::error(StatusCode::NOT_FOUND, "Endpoint not found")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        ApiResponse::error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        ApiResponse::error(StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        ApiResponse::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        error!("Unhandled rejection: {:?}", err);
        ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(response)
}

/// HTTP API of the detection service
pub struct WebServer<S: Storage> {
    context: Arc<ApiContext<S>>,
}

impl<S: Storage + 'static> WebServer<S> {
    pub fn new(analyzer: Arc<Analyzer<S>>, limits: QueryLimits) -> Self {
        Self {
            context: Arc::new(ApiContext { analyzer, limits }),
        }
    }

    /// Serve the API on `addr` until `shutdown` completes.
    pub async fn start<F>(&self, addr: SocketAddr, shutdown: F) -> Result<(), WebError>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebError::BindFailed(format!("{}: {}", addr, e)))?;

        let routes = api(self.context.clone()).recover(handle_rejection);

        info!("HTTP API listening on http://{}", addr);
        tokio::select! {
            _ = warp::serve(routes).incoming(listener).run() => {}
            _ = shutdown => {
                info!("Stopping HTTP API");
            }
        }
        Ok(())
    }
}
