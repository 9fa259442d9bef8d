//! TCP accept loop: binds the listening socket and spawns one session
//! task per accepted connection.

use crate::coordinator::Coordinator;
use crate::session;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// The listening server and the coordinator shared by all sessions.
pub struct Server {
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
}

impl Server {
    /// Binds the listening socket. Failing to bind is the only fatal
    /// startup error.
    pub async fn new(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("CTF server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            coordinator: Arc::new(Coordinator::new()),
        })
    }

    /// Address the listener actually bound, for callers that asked for
    /// port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one session task each, unbounded in
    /// count. An accept error is logged and the loop continues.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Client connected from {}", addr);
                    let coordinator = Arc::clone(&self.coordinator);
                    tokio::spawn(session::handle_connection(stream, addr, coordinator));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
