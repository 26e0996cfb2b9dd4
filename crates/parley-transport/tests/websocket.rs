//! Integration tests for the WebSocket transport against a real client.

use futures_util::{SinkExt, StreamExt};
use parley_transport::{Connection, Transport, WebSocketTransport};
use tokio_tungstenite::tungstenite::Message;

/// Binds a transport on a random port and returns it with its address.
async fn bind_transport() -> (WebSocketTransport, String) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport
        .local_addr()
        .expect("should have local addr")
        .to_string();
    (transport, addr)
}

#[tokio::test]
async fn test_accept_and_receive_text_frame() {
    let (mut transport, addr) = bind_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws.send(Message::Text("hello".into()))
            .await
            .expect("client send should succeed");
        ws
    });

    let conn = transport.accept().await.expect("accept should succeed");
    let frame = conn.recv().await.expect("recv should succeed");

    assert_eq!(frame, Some(b"hello".to_vec()));
    client.await.unwrap();
}

#[tokio::test]
async fn test_binary_frames_are_accepted_too() {
    let (mut transport, addr) = bind_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws.send(Message::Binary(vec![1, 2, 3].into()))
            .await
            .expect("client send should succeed");
        ws
    });

    let conn = transport.accept().await.expect("accept should succeed");
    let frame = conn.recv().await.expect("recv should succeed");

    assert_eq!(frame, Some(vec![1, 2, 3]));
    client.await.unwrap();
}

#[tokio::test]
async fn test_send_reaches_client_as_text() {
    let (mut transport, addr) = bind_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws.next().await.expect("should receive a frame").unwrap()
    });

    let conn = transport.accept().await.expect("accept should succeed");
    conn.send(br#"{"event":"connected"}"#)
        .await
        .expect("send should succeed");

    let received = client.await.unwrap();
    assert_eq!(
        received,
        Message::Text(r#"{"event":"connected"}"#.into())
    );
}

#[tokio::test]
async fn test_recv_returns_none_on_client_close() {
    let (mut transport, addr) = bind_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        ws.close(None).await.expect("close should succeed");
    });

    let conn = transport.accept().await.expect("accept should succeed");
    let frame = conn.recv().await.expect("recv should succeed");

    assert_eq!(frame, None, "clean close surfaces as None");
    client.await.unwrap();
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (mut transport, addr) = bind_transport().await;

    let addr2 = addr.clone();
    let clients = tokio::spawn(async move {
        let a = tokio_tungstenite::connect_async(format!("ws://{addr2}"))
            .await
            .expect("first client should connect");
        let b = tokio_tungstenite::connect_async(format!("ws://{addr2}"))
            .await
            .expect("second client should connect");
        (a, b)
    });

    let first = transport.accept().await.expect("first accept");
    let second = transport.accept().await.expect("second accept");

    assert_ne!(first.id(), second.id());
    clients.await.unwrap();
}
