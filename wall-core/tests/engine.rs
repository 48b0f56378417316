//! Integration tests: full session lifecycle against a fake wall on a
//! real localhost TCP connection.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::UnboundedReceiver;
use wall_core::codec::{encode_connect, encode_disconnect, encode_text};
use wall_core::{
    ChannelSubscriber, ConnectionEngine, ConnectionState, EngineConfig, Event, OutboundQueue,
    Stone, SubscriberSlot, TextColor, WallError,
};

const WAIT: Duration = Duration::from_secs(5);

type WallLines = Lines<BufReader<OwnedReadHalf>>;

// ── Helpers ──────────────────────────────────────────────────────

/// Listener on an OS-assigned port standing in for the wall.
async fn fake_wall() -> (TcpListener, ConnectionState) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ConnectionState::new(addr.ip().to_string(), addr.port(), 42);
    (listener, state)
}

fn engine_for(state: ConnectionState) -> (ConnectionEngine, UnboundedReceiver<Event>) {
    let (sub, rx) = ChannelSubscriber::new();
    let subscribers = SubscriberSlot::with(Arc::new(sub));
    let engine = ConnectionEngine::new(state, OutboundQueue::new(), subscribers)
        .with_config(EngineConfig {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            close_grace: Duration::from_millis(20),
        });
    (engine, rx)
}

/// Accept the remote and split the socket into a line reader and writer.
async fn accept(listener: &TcpListener) -> (WallLines, OwnedWriteHalf) {
    let (stream, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("remote never connected")
        .unwrap();
    let (read, write) = stream.into_split();
    (BufReader::new(read).lines(), write)
}

async fn next_line(lines: &mut WallLines) -> Value {
    let line = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .expect("timeout waiting for a message")
        .unwrap()
        .expect("remote closed the socket");
    serde_json::from_str(&line).unwrap()
}

async fn next_event(rx: &mut UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timeout waiting for an event")
        .expect("event channel closed")
}

async fn reply(write: &mut OwnedWriteHalf, value: Value) {
    write.write_all(value.to_string().as_bytes()).await.unwrap();
}

async fn join(engine: &ConnectionEngine) {
    tokio::time::timeout(WAIT, engine.join())
        .await
        .expect("session did not finish");
}

/// Drive a session up to an accepted handshake.
async fn connected_session(
    listener: &TcpListener,
    engine: &ConnectionEngine,
    rx: &mut UnboundedReceiver<Event>,
) -> (WallLines, OwnedWriteHalf) {
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    let (mut lines, mut write) = accept(listener).await;
    let connect = next_line(&mut lines).await;
    assert_eq!(connect["function"], "connect");
    reply(&mut write, json!({"status": "success"})).await;

    assert_eq!(next_event(rx).await, Event::Connected);
    (lines, write)
}

// ── Handshake ────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_success_sets_connected() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    let (mut lines, mut write) = accept(&listener).await;
    let connect = next_line(&mut lines).await;
    assert_eq!(connect["function"], "connect");
    assert_eq!(connect["status"], "menu");
    assert_eq!(connect["udid"], 42);

    reply(&mut write, json!({"status": "success"})).await;
    assert_eq!(next_event(&mut rx).await, Event::Connected);
    assert!(state.is_connected());
    assert!(state.session().is_some());
    assert!(engine.phase().is_exchanging());

    engine.stop();
    join(&engine).await;
}

#[tokio::test]
async fn handshake_rejection_reports_failure() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    let (mut lines, mut write) = accept(&listener).await;
    next_line(&mut lines).await;
    reply(&mut write, json!({"status": "failure"})).await;

    assert!(matches!(next_event(&mut rx).await, Event::Failure(_)));
    join(&engine).await;
    assert!(!state.is_connected());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn start_without_connect_message_fails() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state);
    engine.start().unwrap();

    let _wall = accept(&listener).await;
    assert!(matches!(next_event(&mut rx).await, Event::Failure(_)));
    join(&engine).await;
}

#[tokio::test]
async fn refused_connection_reports_failure() {
    let (listener, state) = fake_wall().await;
    drop(listener);
    let (engine, mut rx) = engine_for(state.clone());
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    assert!(matches!(next_event(&mut rx).await, Event::Failure(_)));
    join(&engine).await;
    assert!(!state.is_connected());
    assert!(engine.queue().is_empty());
}

#[tokio::test]
async fn unreachable_wall_fails_within_connect_timeout() {
    // Non-routable: the SYN goes nowhere, or the host reports no route.
    let state = ConnectionState::new("10.255.255.1", 5432, 42);
    let (sub, mut rx) = ChannelSubscriber::new();
    let engine = ConnectionEngine::new(
        state.clone(),
        OutboundQueue::new(),
        SubscriberSlot::with(Arc::new(sub)),
    )
    .with_config(EngineConfig {
        connect_timeout: Duration::from_millis(200),
        read_timeout: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
        close_grace: Duration::from_millis(20),
    });
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    assert!(matches!(next_event(&mut rx).await, Event::Failure(_)));
    join(&engine).await;
    assert!(!state.is_connected());
    assert!(state.session().is_none());
    assert!(engine.queue().is_empty());
    assert!(!engine.is_running());
}

// ── Exchange ─────────────────────────────────────────────────────

#[tokio::test]
async fn queued_intents_reach_the_wall_in_order() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state);
    let (mut lines, _write) = connected_session(&listener, &engine, &mut rx).await;

    engine.enqueue(encode_text("HELLO", "WALL", TextColor::Green, false, "none").unwrap());
    engine.enqueue(r#"{"function":"break"}"#);

    let text = next_line(&mut lines).await;
    assert_eq!(text["function"], "text");
    assert_eq!(text["text-top"], "HELLO");
    assert_eq!(text["text-bottom"], "WALL");
    assert_eq!(text["color"], "green");
    assert_eq!(next_line(&mut lines).await["function"], "break");

    engine.stop();
    join(&engine).await;
}

#[tokio::test]
async fn tetris_updates_carry_the_previous_next_stone() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state);
    let (_lines, mut write) = connected_session(&listener, &engine, &mut rx).await;

    reply(
        &mut write,
        json!({"function": "tetris", "gameState": {"score": 0, "level": 1, "isRunning": true, "nextStone": "T"}}),
    )
    .await;
    reply(
        &mut write,
        json!({"function": "tetris", "gameState": {"score": 40, "level": 1, "isRunning": true, "nextStone": "L"}}),
    )
    .await;

    let Event::GameUpdate(first) = next_event(&mut rx).await else {
        panic!("expected a game update");
    };
    assert_eq!(first.curr_stone, None);
    assert_eq!(first.next_stone, Some(Stone::T));

    let Event::GameUpdate(second) = next_event(&mut rx).await else {
        panic!("expected a game update");
    };
    assert_eq!(second.score, 40);
    assert_eq!(second.curr_stone, Some(Stone::T));
    assert_eq!(second.next_stone, Some(Stone::L));

    engine.stop();
    join(&engine).await;
}

// ── Teardown ─────────────────────────────────────────────────────

#[tokio::test]
async fn peer_disconnect_ends_session_once() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    let (_lines, mut write) = connected_session(&listener, &engine, &mut rx).await;

    reply(&mut write, json!({"function": "disconnect"})).await;

    assert_eq!(next_event(&mut rx).await, Event::Disconnected);
    join(&engine).await;
    assert!(!state.is_connected());
    assert!(state.session().is_none());
    assert!(engine.queue().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn dropped_socket_ends_session_with_failure() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    let wall = connected_session(&listener, &engine, &mut rx).await;
    drop(wall);

    assert!(matches!(next_event(&mut rx).await, Event::Failure(_)));
    join(&engine).await;
    assert!(!state.is_connected());
    assert!(engine.queue().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stop_flushes_queued_disconnect() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    let (mut lines, _write) = connected_session(&listener, &engine, &mut rx).await;

    engine.enqueue(encode_disconnect().unwrap());
    engine.stop();

    assert_eq!(next_line(&mut lines).await["function"], "disconnect");
    assert_eq!(next_event(&mut rx).await, Event::Disconnected);
    join(&engine).await;
    assert!(!state.is_connected());

    // the socket is closed after the grace delay
    let closed = tokio::time::timeout(WAIT, lines.next_line()).await.unwrap();
    assert!(matches!(closed, Ok(None) | Err(_)));
}

#[tokio::test]
async fn engine_can_start_again_after_a_session() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state);

    let wall = connected_session(&listener, &engine, &mut rx).await;
    assert!(matches!(engine.start(), Err(WallError::SessionActive)));
    engine.stop();
    assert_eq!(next_event(&mut rx).await, Event::Disconnected);
    join(&engine).await;
    drop(wall);

    let _wall = connected_session(&listener, &engine, &mut rx).await;
    engine.stop();
    assert_eq!(next_event(&mut rx).await, Event::Disconnected);
    join(&engine).await;
}

#[tokio::test]
async fn unregistered_subscriber_misses_events() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state);
    let _wall = connected_session(&listener, &engine, &mut rx).await;

    engine.subscribers().unregister();
    engine.stop();
    join(&engine).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stop_before_the_wall_answers() {
    let (listener, state) = fake_wall().await;
    let (engine, mut rx) = engine_for(state.clone());
    engine.enqueue(encode_connect(42).unwrap());
    engine.start().unwrap();

    let (mut lines, _write) = accept(&listener).await;
    next_line(&mut lines).await;
    engine.stop();

    assert_eq!(next_event(&mut rx).await, Event::Disconnected);
    join(&engine).await;
    assert!(!state.is_connected());
}
