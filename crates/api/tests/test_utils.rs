use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, header::AUTHORIZATION};
use axum_test::TestServer;
use chrono::NaiveDateTime;
use slotbook_api::{ApiState, build_router, config::ApiConfig, middleware::auth::issue_token};
use slotbook_core::{
    clock::ManualClock, models::Actor, policy::BookingPolicy, services::Services,
    store::MemoryStore,
};

pub const SECRET: &str = "test-secret";

pub struct TestContext {
    pub server: TestServer,
    pub clock: Arc<ManualClock>,
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

impl TestContext {
    /// A server over a fresh in-memory store with the clock at 2025-06-01 08:00.
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(at("2025-06-01 08:00")));
        let services = Services::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            BookingPolicy::default(),
        );
        let state = Arc::new(ApiState::new(services, SECRET));
        let config = ApiConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap();
        let app = build_router(state, &config).unwrap();

        Self {
            server: TestServer::new(app).unwrap(),
            clock,
        }
    }
}

pub fn bearer(actor: &Actor) -> (HeaderName, HeaderValue) {
    let token = issue_token(actor, SECRET, 3600).unwrap();
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}
