//! Relay client
//!
//! Run with: cargo run --example relay_client -- [ADDR]
//!
//! Pipes stdin to the relay server and everything the server sends to
//! stdout. `ADDR` defaults to `127.0.0.1:9000`. Exits when the server
//! closes the connection, e.g. after a quota notice.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_ADDR: &str = "127.0.0.1:9000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let stream = TcpStream::connect(&addr).await?;
    eprintln!("Connected to {}", addr);

    let (mut reader, mut writer) = stream.into_split();

    let upload = tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let result = tokio::io::copy(&mut stdin, &mut writer).await;
        let _ = writer.shutdown().await;
        result
    });

    let mut stdout = tokio::io::stdout();
    let downloaded = tokio::io::copy(&mut reader, &mut stdout).await?;
    stdout.flush().await?;

    eprintln!("Connection closed after {} bytes received", downloaded);
    upload.abort();

    Ok(())
}
