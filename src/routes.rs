//! HTTP route table.

use axum::{
    Router,
    http::{Method, header},
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

/// Build the router with every public, portal and admin route.
pub fn router(state: AppState) -> Router {
    // Admin routes, gated by the access code
    let admin_routes = Router::new()
        .route("/api/admin/orders", get(handlers::admin::list_orders))
        .route("/api/admin/orders/{id}", get(handlers::admin::get_order))
        .route(
            "/api/admin/orders/{id}/status",
            patch(handlers::admin::update_status),
        )
        .route("/api/admin/stats", get(handlers::admin::stats))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth,
        ));

    let subscription_routes = Router::new()
        .route(
            "/api/subscription/process",
            get(handlers::subscription::process_subscription),
        )
        .route("/api/subscription/login", post(handlers::subscription::login))
        .route("/api/subscription/status", get(handlers::subscription::status))
        .route(
            "/api/subscription/download",
            post(handlers::subscription::download),
        )
        .route(
            "/api/subscription/feedback",
            post(handlers::subscription::feedback),
        )
        .route("/api/subscription/pin", post(handlers::subscription::set_pin));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/orders", post(handlers::checkout::create_order))
        .route("/api/verify-payment", get(handlers::payments::verify_payment))
        .route(
            "/api/payment-complete",
            get(handlers::payments::payment_complete),
        )
        .route("/api/download-pdf", get(handlers::downloads::download_pdf))
        .route(
            "/api/webhook/paystack",
            post(handlers::webhooks::paystack_webhook),
        )
        .merge(subscription_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PATCH])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
                ),
        )
        .with_state(state)
}
