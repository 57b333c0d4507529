use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::fetch::image_source::{ImageSource, RateLimitedSource};
use crate::render::Renderer;
use crate::server::console::Session;
use crate::utils::rate_limiter::RateLimiter;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Shared by every session; each session still gets its own store.
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn ImageSource>,
    pub renderer: Arc<dyn Renderer>,
    pub limiter: Arc<RateLimiter>,
}

impl Services {
    fn session_for(&self, peer: String) -> Session {
        let source = RateLimitedSource::new(self.source.clone(), self.limiter.clone(), peer);
        Session::new(Arc::new(source), self.renderer.clone())
    }
}

pub async fn handle_collection_client(stream: TcpStream, peer: SocketAddr, services: Services) {
    let session = services.session_for(peer.ip().to_string());
    let (read, write) = stream.into_split();
    match session.run(read, write).await {
        Ok(()) => info!("{} disconnected", peer),
        Err(e) => warn!("{} session ended with error: {}", peer, e),
    }
}

pub async fn run_collection_server(listener: TcpListener, services: Services) {
    if let Ok(addr) = listener.local_addr() {
        info!("collection server listening on {}", addr);
    }
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!("new connection from {}", peer);
        services.limiter.forget_idle();
        let services = services.clone();
        tokio::spawn(async move {
            handle_collection_client(stream, peer, services).await;
        });
    }
}

pub async fn run_stdio_session(services: Services) -> std::io::Result<()> {
    let session = services.session_for("stdio".to_string());
    session
        .run(tokio::io::stdin(), tokio::io::stdout())
        .await
}
