use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route("/api/bookings/mine", get(handlers::bookings::list_my_bookings))
        .route("/api/bookings/summary", get(handlers::bookings::student_summary))
        .route(
            "/api/bookings/:id",
            get(handlers::bookings::get_booking)
                .put(handlers::bookings::update_booking)
                .delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/review-eligibility",
            get(handlers::bookings::review_eligibility),
        )
}
