//! HTTP request handlers
//!
//! Implementation of HTTP endpoints for the resolver server.

use crate::{
    Error,
    proxy::{ManifestRewriter, is_manifest},
    server::app::AppState,
    session::RequestToken,
    types::{ErrorResponse, PingResponse, ResolveRequest, ResolveResponse},
    utils::version,
};
use axum::{
    Json as RequestJson,
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use url::Url;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Headers copied from the upstream response for non-manifest bodies
const FORWARDED_HEADERS: [header::HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::CACHE_CONTROL,
];

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Resolve endpoint
///
/// POST /resolve
///
/// Runs one resolution pass and returns the winning source wrapped for the player, plus the
/// other qualities of the same server.
#[axum_macros::debug_handler]
pub async fn resolve(
    State(state): State<AppState>,
    RequestJson(request): RequestJson<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    tracing::debug!("Received resolve request: {:?}", request);

    let resolution = state
        .orchestrator
        .obtain_sources(
            &request.media,
            request.preferred_category,
            &[],
            &RequestToken::detached(),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Resolution failed: {}", e);
            error_response(e)
        })?;

    tracing::info!(
        "Resolved {} via {}/{}/{}",
        request.media.resume_key(),
        resolution.provider,
        resolution.category,
        resolution.server
    );

    ResolveResponse::from_resolution(resolution, &state.proxy)
        .map(Json)
        .ok_or_else(|| error_response(Error::internal("resolution carries no sources")))
}

/// Query of the proxy endpoint
#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: String,
    #[serde(default)]
    pub referer: Option<String>,
}

/// First-party referer proxy
///
/// GET /proxy?url=..&referer=..
///
/// Fetches the target with the given `Referer` and matching `Origin`. Adaptive manifests are
/// rewritten so their references come back through this endpoint; everything else is
/// streamed through unchanged.
#[axum_macros::debug_handler]
pub async fn proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let target = Url::parse(&query.url)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .ok_or_else(|| error_response(Error::invalid_request(format!("bad url: {}", query.url))))?;
    let referer = query.referer.as_deref().filter(|r| !r.is_empty());

    let mut upstream = state.upstream.get(target.clone());
    if let Some(referer) = referer {
        upstream = upstream.header(header::REFERER, referer);
        if let Some(origin) = origin_of(referer) {
            upstream = upstream.header(header::ORIGIN, origin);
        }
    }
    if let Some(range) = headers.get(header::RANGE) {
        upstream = upstream.header(header::RANGE, range.clone());
    }

    let response = upstream.send().await.map_err(|e| {
        tracing::warn!("Proxy fetch of {} failed: {}", target, e);
        error_response(e.into())
    })?;
    let status = response.status();
    let final_url = response.url().clone();

    let mut forwarded = HeaderMap::new();
    for name in FORWARDED_HEADERS {
        if let Some(value) = response.headers().get(&name) {
            forwarded.insert(name, value.clone());
        }
    }

    if !looks_like_manifest(&final_url, response.headers()) {
        tracing::debug!("Streaming {} ({})", target, status);
        let body = Body::from_stream(response.bytes_stream());
        return Ok((status, forwarded, body).into_response());
    }

    let bytes = response.bytes().await.map_err(|e| error_response(e.into()))?;
    if !is_manifest(&bytes) {
        return Ok((status, forwarded, Body::from(bytes)).into_response());
    }

    let rewritten = ManifestRewriter::new(state.proxy.local_base(), &final_url, referer)
        .rewrite(&String::from_utf8_lossy(&bytes));
    tracing::debug!("Rewrote manifest {}", target);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(MANIFEST_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok((status, headers, rewritten).into_response())
}

fn looks_like_manifest(url: &Url, headers: &HeaderMap) -> bool {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    content_type.contains("mpegurl") || url.path().to_ascii_lowercase().ends_with(".m3u8")
}

fn origin_of(referer: &str) -> Option<String> {
    let url = Url::parse(referer).ok()?;
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
        url::Origin::Opaque(_) => None,
    }
}

/// Map an error to its HTTP status and body
pub fn error_response(error: Error) -> ApiError {
    let status = match &error {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::ResolutionExhausted { .. } | Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Superseded => StatusCode::CONFLICT,
        Error::TransientUpstream { .. }
        | Error::Upstream { .. }
        | Error::Network(_)
        | Error::Bootstrap(_)
        | Error::PlaybackFatal { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = error.to_string();
    let body = match error {
        Error::ResolutionExhausted { attempts } => {
            ErrorResponse::new(message).with_attempts(attempts.entries().to_vec())
        }
        _ => ErrorResponse::new(message),
    };
    (status, Json(body))
}

/// Ping endpoint for health checks
///
/// GET /ping
///
/// Returns server status and uptime information.
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    let response = PingResponse::new(uptime, version::get_version());

    tracing::debug!(
        "Ping response: uptime={}s, version={}",
        uptime,
        version::get_version()
    );
    Json(response)
}

/// Invalidate caches endpoint
///
/// POST /invalidate_caches
///
/// Forgets every cached provider identity.
pub async fn invalidate_caches(State(state): State<AppState>) -> StatusCode {
    tracing::info!("Invalidating identity caches");
    state.orchestrator.resolver().invalidate().await;
    StatusCode::NO_CONTENT
}
