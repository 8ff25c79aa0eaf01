use crate::core::DaemonEvent;
use crate::BroadcastMessage;
use nowplaying::protocol::{
    frame_len, Broadcast, Command, Message, MAX_FRAME_LEN, PROTOCOL_VERSION,
};
use nowplaying::state::StateManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);

        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind TCP socket {}: {}", addr, e);
                return;
            }
        };

        info!("TCP server listening at {}", addr);

        let connected = Arc::new(AtomicUsize::new(0));
        let mut client_id = 0usize;

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            client_id += 1;
            let id = client_id;
            let count = connected.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Client {} connected from {} ({} connected)", id, peer, count);

            let sm = state_manager.clone();
            let evt_tx = event_tx.clone();
            let bcast_rx = broadcast_tx.subscribe();
            let connected = connected.clone();

            tokio::spawn(async move {
                handle_client(stream, sm, id, evt_tx, bcast_rx).await;
                let count = connected.fetch_sub(1, Ordering::SeqCst) - 1;
                info!("Client {} disconnected ({} connected)", id, count);
            });
        }
    })
}

async fn handle_client(
    stream: TcpStream,
    state_manager: Arc<StateManager>,
    client_id: usize,
    event_tx: mpsc::Sender<DaemonEvent>,
    mut broadcast_rx: broadcast::Receiver<BroadcastMessage>,
) {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut tmp = [0u8; 4096];
    let mut read_buf: Vec<u8> = Vec::new();

    if let Ok(encoded) = encode_hello(&state_manager).await {
        if write_half.write_all(&encoded).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            result = read_half.read(&mut tmp) => {
                match result {
                    Ok(0) => {
                        info!("Client {} closed connection", client_id);
                        break;
                    }
                    Ok(n) => {
                        read_buf.extend_from_slice(&tmp[..n]);
                        if !drain_commands(&mut read_buf, client_id, &state_manager, &event_tx, &mut write_half).await {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Read error from client {}: {}", client_id, e);
                        break;
                    }
                }
            }

            msg = broadcast_rx.recv() => {
                let outgoing = match msg {
                    Ok(BroadcastMessage::StateUpdated) => encode_state(&state_manager).await,
                    Ok(BroadcastMessage::NowPlaying(snapshot)) => {
                        Message::Broadcast(Broadcast::NowPlaying { snapshot }).encode()
                    }
                    Ok(BroadcastMessage::Log(message)) => {
                        Message::Broadcast(Broadcast::Log { message }).encode()
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} missed {} broadcast messages", client_id, n);
                        encode_state(&state_manager).await
                    }
                    Err(_) => break,
                };
                if let Ok(encoded) = outgoing {
                    if write_half.write_all(&encoded).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Handles every complete frame in `read_buf`.  Returns `false` when the
/// connection should be dropped.
async fn drain_commands(
    read_buf: &mut Vec<u8>,
    client_id: usize,
    state_manager: &StateManager,
    event_tx: &mpsc::Sender<DaemonEvent>,
    write_half: &mut OwnedWriteHalf,
) -> bool {
    while let Some(len) = frame_len(read_buf) {
        if len > MAX_FRAME_LEN {
            warn!("Client {} announced a {} byte frame, disconnecting", client_id, len);
            let _ = send_error(write_half, format!("frame too large: {len} bytes")).await;
            return false;
        }
        if read_buf.len() < len + 4 {
            break;
        }

        match Message::decode(read_buf) {
            Ok((Message::Command(Command::GetState), consumed)) => {
                read_buf.drain(..consumed);
                if let Ok(encoded) = encode_state(state_manager).await {
                    if write_half.write_all(&encoded).await.is_err() {
                        return false;
                    }
                }
            }
            Ok((Message::Command(cmd), consumed)) => {
                read_buf.drain(..consumed);
                info!("Client {} sent command: {:?}", client_id, cmd);

                if event_tx.send(DaemonEvent::ClientCommand(cmd)).await.is_err() {
                    warn!("DaemonEvent channel closed");
                    return false;
                }
            }
            Ok((_, consumed)) => {
                read_buf.drain(..consumed);
            }
            Err(e) => {
                warn!("Dropping malformed frame from client {}: {}", client_id, e);
                read_buf.drain(..len + 4);
                if send_error(write_half, format!("malformed message: {e}"))
                    .await
                    .is_err()
                {
                    return false;
                }
            }
        }
    }
    true
}

async fn send_error(write_half: &mut OwnedWriteHalf, message: String) -> anyhow::Result<()> {
    let encoded = Message::Broadcast(Broadcast::Error { message }).encode()?;
    write_half.write_all(&encoded).await?;
    Ok(())
}

async fn encode_hello(state_manager: &StateManager) -> anyhow::Result<Vec<u8>> {
    let state = state_manager.get_state().await;
    Message::Broadcast(Broadcast::Hello {
        protocol_version: PROTOCOL_VERSION,
        state,
    })
    .encode()
}

async fn encode_state(state_manager: &StateManager) -> anyhow::Result<Vec<u8>> {
    let state = state_manager.get_state().await;
    Message::Broadcast(Broadcast::State { data: state }).encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Harness {
        client: TcpStream,
        events: mpsc::Receiver<DaemonEvent>,
        session: tokio::task::JoinHandle<()>,
        _broadcast_tx: broadcast::Sender<BroadcastMessage>,
    }

    async fn connect(name: &str) -> Harness {
        let state_file = std::env::temp_dir()
            .join(format!("nowplaying-socket-{}-{}", std::process::id(), name))
            .join("state.json");
        let state_manager = Arc::new(StateManager::new(state_file, Vec::new()));
        let (event_tx, events) = mpsc::channel(8);
        let (broadcast_tx, _) = broadcast::channel(8);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        let session = tokio::spawn(handle_client(
            server,
            state_manager,
            1,
            event_tx,
            broadcast_tx.subscribe(),
        ));

        let mut harness = Harness {
            client,
            events,
            session,
            _broadcast_tx: broadcast_tx,
        };
        match read_frame(&mut harness.client).await {
            Message::Broadcast(Broadcast::Hello { .. }) => {}
            other => panic!("expected Hello, got {other:?}"),
        }
        harness
    }

    async fn read_frame(stream: &mut TcpStream) -> Message {
        let mut frame = vec![0u8; 4];
        stream.read_exact(&mut frame).await.unwrap();
        let len = frame_len(&frame).unwrap();
        frame.resize(len + 4, 0);
        stream.read_exact(&mut frame[4..]).await.unwrap();
        Message::decode(&frame).unwrap().0
    }

    fn raw_frame(body: &[u8]) -> Vec<u8> {
        let mut frame = (body.len() as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(body);
        frame
    }

    #[tokio::test]
    async fn test_command_is_forwarded_to_core() {
        let mut h = connect("forward").await;
        let frame = Message::Command(Command::Play { station_idx: 2 }).encode().unwrap();
        h.client.write_all(&frame).await.unwrap();

        match h.events.recv().await {
            Some(DaemonEvent::ClientCommand(Command::Play { station_idx })) => {
                assert_eq!(station_idx, 2)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_state_is_answered_directly() {
        let mut h = connect("get-state").await;
        let frame = Message::Command(Command::GetState).encode().unwrap();
        h.client.write_all(&frame).await.unwrap();

        match read_frame(&mut h.client).await {
            Message::Broadcast(Broadcast::State { data }) => assert!(data.stations.is_empty()),
            other => panic!("expected State, got {other:?}"),
        }
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_and_connection_survives() {
        let mut h = connect("malformed").await;
        h.client.write_all(&raw_frame(b"{not json")).await.unwrap();
        match read_frame(&mut h.client).await {
            Message::Broadcast(Broadcast::Error { message }) => {
                assert!(message.starts_with("malformed message"))
            }
            other => panic!("expected Error, got {other:?}"),
        }

        let frame = Message::Command(Command::Stop).encode().unwrap();
        h.client.write_all(&frame).await.unwrap();
        assert!(matches!(
            h.events.recv().await,
            Some(DaemonEvent::ClientCommand(Command::Stop))
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_header_disconnects() {
        let mut h = connect("oversized").await;
        h.client.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();

        match read_frame(&mut h.client).await {
            Message::Broadcast(Broadcast::Error { message }) => {
                assert!(message.starts_with("frame too large"))
            }
            other => panic!("expected Error, got {other:?}"),
        }

        // The session ends without waiting for the announced body.
        tokio::time::timeout(Duration::from_secs(1), h.session)
            .await
            .expect("session should end")
            .unwrap();
        let mut rest = Vec::new();
        h.client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert!(h.events.try_recv().is_err());
    }
}
