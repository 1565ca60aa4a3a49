//! HTTP handlers and the warp filters routing to them.

use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use super::types::{ApiResponse, BatchRequest, LimitQuery};
use crate::analysis::{AnalysisRequest, Analyzer};
use crate::configuration::QueryLimits;
use crate::error_handling::types::{AnalysisError, StorageError};
use crate::events::types::SecurityEventInput;
use crate::storage::Storage;
use log::error;

const SERVICE_NAME: &str = "vigie";
const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Shared state handed to every handler.
pub struct ApiContext<S: Storage> {
    pub analyzer: Arc<Analyzer<S>>,
    pub limits: QueryLimits,
}

fn with_context<S: Storage + 'static>(
    context: Arc<ApiContext<S>>,
) -> impl Filter<Extract = (Arc<ApiContext<S>>,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}

fn json_body<T: serde::de::DeserializeOwned + Send>(
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn analysis_failure(err: &AnalysisError) -> ApiResponse {
    if err.is_client_error() {
        ApiResponse::error(StatusCode::BAD_REQUEST, err.to_string())
    } else {
        ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

fn storage_failure(what: &str, err: &StorageError) -> ApiResponse {
    error!("Failed to load {}: {}", what, err);
    ApiResponse::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to load {}", what),
    )
}

/// GET /
pub async fn index() -> Result<ApiResponse, Rejection> {
    Ok(ApiResponse::ok(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "analyze": "POST /analyze",
            "analyze_batch": "POST /analyze/batch",
            "stats": "GET /stats",
            "recent_attacks": "GET /attacks/recent?limit=N",
            "submit_event": "POST /events",
            "events": "GET /events?limit=N",
            "attacks": "GET /attacks?limit=N",
        },
    })))
}

/// GET /health
pub async fn health<S: Storage>(context: Arc<ApiContext<S>>) -> Result<ApiResponse, Rejection> {
    let stats = context.analyzer.memory_stats();
    Ok(ApiResponse::ok(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "detectors_loaded": context.analyzer.detectors_loaded(),
        "events_count": stats.events_received,
        "attacks_count": stats.attack_events,
    })))
}

/// POST /analyze
pub async fn analyze<S: Storage>(
    context: Arc<ApiContext<S>>,
    request: AnalysisRequest,
) -> Result<ApiResponse, Rejection> {
    let sandbox_id = request.sandbox_id.clone();
    match context.analyzer.analyze(request).await {
        Ok(result) => Ok(ApiResponse::ok(json!({
            "success": true,
            "data": result,
            "sandbox_id": sandbox_id,
        }))),
        Err(e) => Ok(analysis_failure(&e)),
    }
}

/// POST /analyze/batch
pub async fn analyze_batch<S: Storage>(
    context: Arc<ApiContext<S>>,
    batch: BatchRequest,
) -> Result<ApiResponse, Rejection> {
    let outcome = context.analyzer.analyze_batch(batch.logs).await;
    Ok(ApiResponse::ok(json!({
        "success": true,
        "total_requests": outcome.total_requests,
        "total_detections": outcome.total_detections,
        "failed": outcome.failed,
        "results": outcome.results,
    })))
}

/// GET /stats
pub async fn stats<S: Storage>(context: Arc<ApiContext<S>>) -> Result<ApiResponse, Rejection> {
    match context.analyzer.stats_report().await {
        Ok(report) => Ok(ApiResponse::ok(json!({
            "success": true,
            "memory_stats": report.memory_stats,
            "database_stats": report.database_stats,
            "summary": report.summary,
            "events_stats": report.events_stats,
        }))),
        Err(e) => Ok(storage_failure("statistics", &e)),
    }
}

/// GET /attacks/recent
pub async fn recent_attacks<S: Storage>(
    context: Arc<ApiContext<S>>,
    query: LimitQuery,
) -> Result<ApiResponse, Rejection> {
    let limit = context.limits.resolve(query.limit);
    match context.analyzer.storage().get_recent_detections(limit).await {
        Ok(attacks) => Ok(ApiResponse::ok(json!({
            "success": true,
            "limit": limit,
            "total": attacks.len(),
            "attacks": attacks,
        }))),
        Err(e) => Ok(storage_failure("recent attacks", &e)),
    }
}

/// POST /events
pub async fn submit_event<S: Storage>(
    context: Arc<ApiContext<S>>,
    input: SecurityEventInput,
) -> Result<ApiResponse, Rejection> {
    match context.analyzer.submit_event(input).await {
        Ok(receipt) => Ok(ApiResponse::ok(json!({
            "success": true,
            "message": "Event received",
            "event_id": receipt.event.event_id,
            "is_attack": receipt.classification.is_attack,
            "attack_type": receipt.classification.attack_type,
            "received_data": receipt.event,
        }))),
        Err(e) => Ok(analysis_failure(&e)),
    }
}

/// GET /events
pub async fn list_events<S: Storage>(
    context: Arc<ApiContext<S>>,
    query: LimitQuery,
) -> Result<ApiResponse, Rejection> {
    let limit = context.limits.resolve(query.limit);
    let storage = context.analyzer.storage();
    let loaded = async {
        let total = storage.count_events().await?;
        let events = storage.get_recent_events(limit).await?;
        Ok::<_, StorageError>((total, events))
    };
    match loaded.await {
        Ok((total, events)) => Ok(ApiResponse::ok(json!({
            "success": true,
            "total_events": total,
            "events": events,
        }))),
        Err(e) => Ok(storage_failure("events", &e)),
    }
}

/// GET /attacks
pub async fn list_attacks<S: Storage>(
    context: Arc<ApiContext<S>>,
    query: LimitQuery,
) -> Result<ApiResponse, Rejection> {
    let limit = context.limits.resolve(query.limit);
    let storage = context.analyzer.storage();
    let loaded = async {
        let total = storage.count_attack_events().await?;
        let attacks = storage.get_recent_attack_events(limit).await?;
        Ok::<_, StorageError>((total, attacks))
    };
    match loaded.await {
        Ok((total, attacks)) => Ok(ApiResponse::ok(json!({
            "success": true,
            "total_attacks": total,
            "attacks": attacks,
        }))),
        Err(e) => Ok(storage_failure("attack events", &e)),
    }
}

/// Every endpoint of the API, unrecovered.
pub fn api<S: Storage + 'static>(
    context: Arc<ApiContext<S>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index_route = warp::path::end().and(warp::get()).and_then(index);

    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(health::<S>);

    let analyze_route = warp::path!("analyze")
        .and(warp::post())
        .and(with_context(context.clone()))
        .and(json_body::<AnalysisRequest>())
        .and_then(analyze::<S>);

    let analyze_batch_route = warp::path!("analyze" / "batch")
        .and(warp::post())
        .and(with_context(context.clone()))
        .and(json_body::<BatchRequest>())
        .and_then(analyze_batch::<S>);

    let stats_route = warp::path!("stats")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(stats::<S>);

    let recent_attacks_route = warp::path!("attacks" / "recent")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and(warp::query::<LimitQuery>())
        .and_then(recent_attacks::<S>);

    let submit_event_route = warp::path!("events")
        .and(warp::post())
        .and(with_context(context.clone()))
        .and(json_body::<SecurityEventInput>())
        .and_then(submit_event::<S>);

    let list_events_route = warp::path!("events")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and(warp::query::<LimitQuery>())
        .and_then(list_events::<S>);

    let list_attacks_route = warp::path!("attacks")
        .and(warp::get())
        .and(with_context(context))
        .and(warp::query::<LimitQuery>())
        .and_then(list_attacks::<S>);

    index_route
        .or(health_route)
        .or(analyze_route)
        .or(analyze_batch_route)
        .or(stats_route)
        .or(recent_attacks_route)
        .or(submit_event_route)
        .or(list_events_route)
        .or(list_attacks_route)
}
