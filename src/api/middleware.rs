use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, services::rate_limit::RateLimiter, AppState};

const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Global request ceiling per client address.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_key(&request, state.config.rate_limit.trust_proxy);

    let decision = match state.limiter.check(&client).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, letting request through: {}", e);
            return Ok(next.run(request).await);
        }
    };

    if !decision.allowed {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after_secs: decision.reset_after_secs,
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_LIMIT),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(X_RATELIMIT_REMAINING),
        HeaderValue::from(decision.remaining),
    );

    Ok(response)
}

/// Identify the caller: the first `X-Forwarded-For` hop when running behind
/// a trusted proxy, otherwise the socket peer address.
pub fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|h| !h.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
