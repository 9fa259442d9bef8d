//! Minimal line-protocol client for poking at a running server.
//!
//! Joins with the given name, prints every server event as it arrives,
//! and forwards stdin lines to the server verbatim, e.g.
//! `FLAG_PICKUP Red` or `POS 1 0 2 90 0`.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args
        .next()
        .unwrap_or_else(|| format!("127.0.0.1:{}", shared::DEFAULT_PORT));
    let name = args.next().unwrap_or_else(|| "tester".to_string());

    let stream = TcpStream::connect(&addr).await?;
    println!("Connected to {}", addr);
    let (read_half, mut write_half) = stream.into_split();

    write_half
        .write_all(format!("JOIN {}\n", name).as_bytes())
        .await?;

    // Print server events as they arrive
    tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("<- {}", line);
        }
        println!("Server closed the connection");
        std::process::exit(0);
    });

    // Forward stdin lines to the server
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        write_half.write_all(line.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
    }

    Ok(())
}
