use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware::rate_limit_middleware};
use crate::{
    config::{Config, CorsConfig, MediaBackend},
    AppState,
};

pub fn create_router(config: &Config) -> Router<AppState> {
    let upload_limit = config.pages.upload_body_limit();

    Router::new()
        .route(
            "/api/pages",
            post(handlers::pages::create_page).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/pages/:page_id", get(handlers::pages::get_page))
        .route(
            "/api/pages/:page_id/feedback",
            post(handlers::pages::add_feedback),
        )
}

/// Full application: routes plus the middleware stack shared by every endpoint.
pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .merge(create_router(&config));

    if config.media_backend == MediaBackend::Local {
        app = app.nest_service("/media", ServeDir::new(&config.local_media.dir));
    }

    if config.rate_limit.enabled {
        app = app.layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));
    }

    app.layer(DefaultBodyLimit::max(config.pages.json_body_limit))
        .layer(RequestBodyLimitLayer::new(config.pages.upload_body_limit()))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
}
