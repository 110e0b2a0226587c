use std::net::SocketAddr;
use std::time::Duration;

use byte_relay::endpoint::{DOWNLOAD_LIMIT_NOTICE, UPLOAD_LIMIT_NOTICE};
use byte_relay::{HubConfig, RelayServer, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::timeout;

struct TestServer {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

async fn start_server(byte_quota: u64) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = RelayServer::new(
        ServerConfig::with_addr(addr),
        HubConfig::with_quota(byte_quota),
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        let _ = server.serve_until(listener, shutdown).await;
    });

    TestServer {
        addr,
        _shutdown: shutdown_tx,
    }
}

/// Connect `count` clients and give the hub time to register them
async fn connect_clients(addr: SocketAddr, count: usize) -> Vec<TcpStream> {
    let mut clients = Vec::with_capacity(count);
    for _ in 0..count {
        clients.push(TcpStream::connect(addr).await.unwrap());
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    clients
}

async fn read_exactly(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(1), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for data")
        .unwrap();
    buf
}

async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    timeout(Duration::from_secs(1), stream.read_to_end(&mut received))
        .await
        .expect("connection was not closed")
        .unwrap();
    received
}

async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let read = timeout(Duration::from_millis(100), stream.read(&mut buf)).await;
    assert!(read.is_err(), "unexpected data: {:?}", read);
}

#[tokio::test]
async fn relays_between_two_clients() {
    let server = start_server(100).await;
    let mut clients = connect_clients(server.addr, 2).await;

    clients[0].write_all(b"From client1!").await.unwrap();

    assert_eq!(read_exactly(&mut clients[1], 13).await, b"From client1!");
    assert_silent(&mut clients[0]).await;
}

#[tokio::test]
async fn broadcasts_to_every_other_client() {
    let server = start_server(100).await;
    let mut clients = connect_clients(server.addr, 5).await;

    let message = b"Broadcast test message";
    clients[0].write_all(message).await.unwrap();

    for client in clients.iter_mut().skip(1) {
        assert_eq!(read_exactly(client, message.len()).await, message);
    }
    assert_silent(&mut clients[0]).await;
}

#[tokio::test]
async fn preserves_order_from_one_sender() {
    let server = start_server(1000).await;
    let mut clients = connect_clients(server.addr, 2).await;

    let mut expected = Vec::new();
    for i in 0..10 {
        let chunk = format!("msg{};", i);
        clients[0].write_all(chunk.as_bytes()).await.unwrap();
        expected.extend_from_slice(chunk.as_bytes());
    }

    assert_eq!(read_exactly(&mut clients[1], expected.len()).await, expected);
}

#[tokio::test]
async fn upload_limit_disconnects_sender() {
    let server = start_server(100).await;
    let mut clients = connect_clients(server.addr, 2).await;

    clients[0].write_all(&[b'A'; 100]).await.unwrap();

    assert_eq!(read_until_closed(&mut clients[0]).await, UPLOAD_LIMIT_NOTICE);
    // The chunk that reached the limit is never relayed
    assert_silent(&mut clients[1]).await;
}

#[tokio::test]
async fn download_limit_disconnects_receiver() {
    let server = start_server(20).await;
    let mut clients = connect_clients(server.addr, 3).await;

    clients[0].write_all(b"twelve bytes").await.unwrap();
    assert_eq!(read_exactly(&mut clients[1], 12).await, b"twelve bytes");

    // Takes the receiver to 24 of 20 bytes: notice instead of payload
    clients[2].write_all(b"twelve bytes").await.unwrap();
    assert_eq!(read_until_closed(&mut clients[1]).await, DOWNLOAD_LIMIT_NOTICE);

    // The first sender is still under its download quota
    assert_eq!(read_exactly(&mut clients[0], 12).await, b"twelve bytes");
}

#[tokio::test]
async fn departed_client_does_not_affect_others() {
    let server = start_server(100).await;
    let mut clients = connect_clients(server.addr, 3).await;

    drop(clients.pop());
    tokio::time::sleep(Duration::from_millis(50)).await;

    clients[0].write_all(b"still here").await.unwrap();
    assert_eq!(read_exactly(&mut clients[1], 10).await, b"still here");
}

#[tokio::test]
async fn late_joiner_only_sees_new_messages() {
    let server = start_server(100).await;
    let mut clients = connect_clients(server.addr, 2).await;

    clients[0].write_all(b"early").await.unwrap();
    assert_eq!(read_exactly(&mut clients[1], 5).await, b"early");

    let mut late = connect_clients(server.addr, 1).await.remove(0);
    clients[0].write_all(b"late").await.unwrap();

    assert_eq!(read_exactly(&mut late, 4).await, b"late");
    assert_eq!(read_exactly(&mut clients[1], 4).await, b"late");
}
