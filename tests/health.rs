mod common;

use axum::extract::State;
use order_pricing_api::routes::health::health_check;

#[tokio::test]
async fn health_check_reports_database() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let response = health_check(State(state)).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "ok");
    Ok(())
}

#[tokio::test]
async fn api_router_accepts_every_handler() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let _app: axum::Router = axum::Router::new()
        .nest("/api", order_pricing_api::routes::create_api_router())
        .with_state(state);
    Ok(())
}
