use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Notify;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod store;

use store::{JsonStore, ResourceStore};

fn main() {
    if let Err(e) = run() {
        logger::log_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    // First CLI argument: config file path without extension
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing worker threads from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store: Arc<dyn ResourceStore> = match &cfg.store.path {
        Some(path) => Arc::new(JsonStore::open(path, cfg.store.pretty)?),
        None => Arc::new(JsonStore::in_memory()),
    };

    let listener = server::create_listener(addr, &cfg.server)?;
    logger::log_server_start(&addr, &cfg);

    let state = Arc::new(config::AppState::new(cfg, store)?);
    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    server::start_server_loop(listener, state, Arc::new(AtomicUsize::new(0)), shutdown).await;
    Ok(())
}
