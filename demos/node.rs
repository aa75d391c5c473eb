//! Runs a node with a UDP heartbeat loop until Ctrl-C.
//!
//! ```text
//! RUST_LOG=debug cargo run --example node
//! ```

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tunvisor::{LoopError, Node, NodeConfig, Router};

struct StaticRouter;

impl Router for StaticRouter {
    fn tunnel_addr(&self) -> Ipv4Addr {
        Ipv4Addr::new(10, 10, 0, 1)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cfg = NodeConfig {
        log_clean_stop: true,
        ..NodeConfig::default()
    };
    let node = Node::builder(cfg).with_router(Arc::new(StaticRouter)).build();
    tracing::info!(addr = ?node.tunnel_addr(), "node started");

    let sock = Arc::new(UdpSocket::bind("127.0.0.1:0").await?);
    let target = sock.local_addr()?;

    node.run_named_loop("init", |_ctx: CancellationToken| async {
        tracing::info!("initialisation done");
        Err::<(), _>(LoopError::Stop)
    });

    let n = Arc::clone(&node);
    node.run_loop(move |ctx: CancellationToken| {
        let (node, sock) = (Arc::clone(&n), Arc::clone(&sock));
        async move {
            if let Err(err) = sock.send_to(b"heartbeat", target).await {
                node.report_link_send_fault(&err);
            }
            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
            Ok::<(), LoopError>(())
        }
    });

    node.run_deferred(|| tracing::info!("tunnel device closed"));

    node.run_until_signal().await?;
    tracing::info!("node stopped");
    Ok(())
}
