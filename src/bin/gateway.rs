use tasktrack::{
    app::{init_tracing, install_panic_hook, serve},
    config::GatewayConfig,
    gateway::{build_gateway, GatewayState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("tasktrack=debug,tower_http=info");
    install_panic_hook();

    let config = GatewayConfig::from_env()?;
    let (host, port) = (config.host.clone(), config.port);
    tracing::info!(backend = %config.backend_url, "starting gateway");

    let app = build_gateway(GatewayState::new(config)?);
    serve(app, &host, port).await
}
