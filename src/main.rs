use tasktrack::{
    app::{build_app, init_tracing, install_panic_hook, serve},
    config::AppConfig,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("tasktrack=debug,axum=info,tower_http=info");
    install_panic_hook();

    let config = AppConfig::from_env()?;
    let (host, port) = (config.host.clone(), config.port);
    tracing::info!(
        environment = config.environment.as_str(),
        cors = ?config.cors_origins,
        "starting backend"
    );

    let (app_state, db) = AppState::init(config).await?;
    tracing::info!("database connected");

    let app = build_app(app_state);
    let result = serve(app, &host, port).await;

    db.close().await;
    tracing::info!("database connection closed");
    result
}
