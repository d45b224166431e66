//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    dashboard::{get_dashboard_page, get_summary_endpoint},
    endpoints,
    export::export_transactions_endpoint,
    logging::logging_middleware,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        list_transactions_endpoint,
    },
};

/// The plain text body returned by the health check.
pub const HEALTH_MESSAGE: &str = "Expense Tracker Backend is running";

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_dashboard_page))
        .route(endpoints::HEALTH, get(get_health))
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::EXPORT, get(export_transactions_endpoint))
        .route(endpoints::SUMMARY, get(get_summary_endpoint))
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_health() -> &'static str {
    HEALTH_MESSAGE
}
