use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod storage;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_FILE.to_string());
    let env: config::EnvMap = std::env::vars().collect();

    // Configuration problems are fatal before anything is bound
    let cfg = match config::AppConfig::load(&config_path, &env) {
        Ok(cfg) => cfg,
        Err(e) => {
            logger::log_error(&format!("Startup failed: {e}"));
            std::process::exit(1);
        }
    };

    logger::init(&cfg.logging)?;

    // Create the Tokio runtime, sized by the workers setting when present
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.workers.filter(|&w| w > 0) {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = server::create_listener(cfg.listen_addr)?;
    let state = Arc::new(server::ServerState::new(&cfg));

    let (shutdown_tx, shutdown_rx) = server::shutdown_channel();
    server::spawn_signal_listener(shutdown_tx)?;

    logger::log_server_start(&cfg);
    server::run(listener, state, shutdown_rx).await;
    logger::log_info("Server stopped");
    Ok(())
}
