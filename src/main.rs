use std::error::Error;
use std::sync::Arc;

use imgcollect::config::{Config, Mode, RenderFormat};
use imgcollect::fetch::image_source::PicsumSource;
use imgcollect::logs::init_logger;
use imgcollect::render::{JsonRenderer, Renderer, TextRenderer};
use imgcollect::server::collection_server::{run_collection_server, run_stdio_session, Services};
use imgcollect::utils::rate_limiter::RateLimiter;
use log::info;
use tokio::net::TcpListener;

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    init_logger()?;

    let config = Config::from_env()?;
    let source = PicsumSource::new(
        &config.image_base_url,
        config.image_width,
        config.image_height,
    )?;
    let renderer: Arc<dyn Renderer> = match config.render {
        RenderFormat::Text => Arc::new(TextRenderer),
        RenderFormat::Json => Arc::new(JsonRenderer),
    };
    let services = Services {
        source: Arc::new(source),
        renderer,
        limiter: Arc::new(RateLimiter::new(config.fetches_per_minute)),
    };

    match config.mode {
        Mode::Tcp => {
            let listener = TcpListener::bind(config.listen_addr).await?;
            tokio::select! {
                _ = run_collection_server(listener, services) => {},
                _ = shutdown_signal() => {},
            }
        }
        Mode::Stdio => {
            tokio::select! {
                result = run_stdio_session(services) => result?,
                _ = shutdown_signal() => {},
            }
        }
    }
    Ok(())
}
