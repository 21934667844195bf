use marquee_api::{
    api::{create_router, AppState},
    config::Config,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = Config::from_env()?;
    let address = config.bind_address();

    // Models are loaded once here and shared read-only by every handler
    let state = AppState::load(config);
    if !state.is_ready() {
        tracing::warn!("Serving without models; recommendation routes return 503");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
