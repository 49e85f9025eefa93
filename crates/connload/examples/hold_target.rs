//! Minimal accept-and-hold listener to point connload at on loopback.
//!
//! Usage: `cargo run --example hold_target -- [addr]` (defaults to
//! 127.0.0.1:8090, the tool's default target).

use std::error::Error;

use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8090".to_string());
    let listener = TcpListener::bind(&addr).await?;
    println!("🎯 Holding listener on {addr} (ctrl-c to stop)");

    let mut held = Vec::new();
    loop {
        let (socket, peer) = listener.accept().await?;
        held.push(socket);
        println!("[{}] ✅ accepted {peer}", held.len());
    }
}
