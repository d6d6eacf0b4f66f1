use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::*;

/// 貸出管理APIのルーターを作成
///
/// 貸出:
/// - POST /loans, GET /loans?borrower_id=, GET /loans/overdue
/// - GET /loans/:id, POST /loans/:id/return, POST /loans/:id/renew
/// - GET /loans/:id/history
///
/// 予約:
/// - POST /reservations, GET /reservations
/// - POST /reservations/:id/confirm, POST /reservations/:id/cancel
/// - DELETE /reservations/:id（本人による取消）
/// - POST /reservations/expire, GET /reservations/:id/history
///
/// 利用者・所蔵品:
/// - POST /borrowers, GET /borrowers/sanctioned, DELETE /borrowers/:id/sanction
/// - POST /titles/:id/copies, PUT /copies/:kind/:id/state, DELETE /copies/:kind/:id
/// - GET /inventory/attention
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Loans
        .route("/loans", post(create_loan).get(list_loans))
        .route("/loans/overdue", get(list_overdue_loans))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/return", post(return_loan))
        .route("/loans/:id/renew", post(renew_loan))
        .route("/loans/:id/history", get(get_loan_history))
        // Reservations
        .route(
            "/reservations",
            post(create_reservation).get(list_reservations),
        )
        .route("/reservations/expire", post(expire_reservations))
        .route("/reservations/:id", delete(cancel_my_reservation))
        .route("/reservations/:id/confirm", post(confirm_reservation))
        .route("/reservations/:id/cancel", post(cancel_reservation))
        .route("/reservations/:id/history", get(get_reservation_history))
        // Borrowers
        .route("/borrowers", post(register_borrower))
        .route("/borrowers/sanctioned", get(list_sanctioned_borrowers))
        .route("/borrowers/:id/sanction", delete(clear_sanction))
        // Inventory
        .route("/titles/:id/copies", post(add_copies))
        .route("/copies/:kind/:id", delete(decommission_copy))
        .route("/copies/:kind/:id/state", put(override_copy_state))
        .route("/inventory/attention", get(items_for_attention))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
