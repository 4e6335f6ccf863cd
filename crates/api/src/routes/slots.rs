use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/slots",
            post(handlers::slots::create_slot).get(handlers::slots::list_slots),
        )
        .route(
            "/api/slots/:id",
            get(handlers::slots::get_slot).delete(handlers::slots::delete_slot),
        )
}
