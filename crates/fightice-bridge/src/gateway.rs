//! Gateway client: the supervisor's side of the RPC bridge
//!
//! One TCP connection to the game's gateway port carries strictly ordered
//! request/response traffic; a background reader routes responses to pending
//! requests in FIFO order. Connecting also brings up the callback server and
//! performs the mandatory callback-port re-handshake.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use fightice_core::{FightIceError, Result};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::callback::{CallbackServer, FrameObserver};
use crate::protocol::{GatewayRequest, GatewayResponse, serialize};
use crate::transport::{AsyncReader, AsyncWriter, TcpReadWrapper, TcpWriteWrapper};

/// Opaque handle for one configured match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDescriptor {
    game_id: u64,
}

impl MatchDescriptor {
    pub fn game_id(&self) -> u64 {
        self.game_id
    }
}

/// Client side of the bridge to a running game process
pub struct GatewayClient {
    /// Writer half of the gateway connection
    writer: Arc<Mutex<Option<Box<dyn AsyncWriter>>>>,
    /// Hands pending-response slots to the reader task
    request_tx: mpsc::Sender<oneshot::Sender<Result<GatewayResponse>>>,
    /// Listener the game calls back into
    callback: CallbackServer,
    /// Background reader task handle
    reader_handle: JoinHandle<()>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient").finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Connect to the game's gateway port and redirect its callback traffic
    /// to a freshly bound local listener.
    pub async fn connect(port: u16, connect_timeout: Duration) -> Result<Self> {
        info!(port, "connecting to game gateway");

        let stream = tokio::time::timeout(
            connect_timeout,
            TcpStream::connect(("127.0.0.1", port)),
        )
        .await
        .map_err(|_| FightIceError::Ipc(format!("connection timeout to gateway port {}", port)))?
        .map_err(|e| FightIceError::Ipc(format!("failed to connect to gateway: {}", e)))?;

        stream
            .set_nodelay(true)
            .map_err(|e| FightIceError::Ipc(format!("failed to set TCP_NODELAY: {}", e)))?;

        let (read_half, write_half) = stream.into_split();
        let writer: Arc<Mutex<Option<Box<dyn AsyncWriter>>>> =
            Arc::new(Mutex::new(Some(Box::new(TcpWriteWrapper(write_half)))));

        let (request_tx, request_rx) = mpsc::channel(16);
        let reader_handle = tokio::spawn(response_reader(TcpReadWrapper(read_half), request_rx));

        let callback = CallbackServer::bind().await?;

        let client = Self {
            writer,
            request_tx,
            callback,
            reader_handle,
        };

        // Without this step the game keeps its default callback target and
        // registered handlers are unreachable.
        let callback_port = client.callback.port();
        match client
            .request(GatewayRequest::RedirectCallback {
                port: callback_port,
            })
            .await?
        {
            GatewayResponse::Ok => {
                info!(callback_port, "callback channel redirected");
                Ok(client)
            }
            GatewayResponse::Error { message } => Err(FightIceError::Protocol(format!(
                "callback redirect rejected: {}",
                message
            ))),
            other => Err(FightIceError::Protocol(format!(
                "unexpected redirect response: {:?}",
                other
            ))),
        }
    }

    /// The port the game's callbacks arrive on
    pub fn callback_port(&self) -> u16 {
        self.callback.port()
    }

    /// Register a local AI: it joins the callback registry and is announced
    /// to the game under its own name.
    pub async fn register_handler(&self, handler: Box<dyn FrameObserver>) -> Result<()> {
        let name = handler.name().to_string();
        self.callback.registry().insert(handler);

        match self
            .request(GatewayRequest::RegisterAi { name: name.clone() })
            .await?
        {
            GatewayResponse::Ok => {
                debug!(%name, "handler registered");
                Ok(())
            }
            GatewayResponse::Error { message } => Err(FightIceError::Protocol(format!(
                "register rejected for {}: {}",
                name, message
            ))),
            other => Err(FightIceError::Protocol(format!(
                "unexpected register response: {:?}",
                other
            ))),
        }
    }

    /// Configure one match between two named players.
    pub async fn create_game(
        &self,
        character1: &str,
        character2: &str,
        player1: &str,
        player2: &str,
        rounds_per_match: u32,
    ) -> Result<MatchDescriptor> {
        match self
            .request(GatewayRequest::CreateGame {
                character1: character1.to_string(),
                character2: character2.to_string(),
                player1: player1.to_string(),
                player2: player2.to_string(),
                rounds_per_match,
            })
            .await?
        {
            GatewayResponse::GameCreated { game_id } => {
                info!(game_id, player1, player2, "match created");
                Ok(MatchDescriptor { game_id })
            }
            GatewayResponse::Error { message } => Err(FightIceError::Protocol(format!(
                "create_game rejected: {}",
                message
            ))),
            other => Err(FightIceError::Protocol(format!(
                "unexpected create_game response: {:?}",
                other
            ))),
        }
    }

    /// Run a match to completion. Blocks (from the driver thread's view)
    /// until the game reports the match finished; any failure before that is
    /// a crash signal, not a normal return.
    pub async fn run_game(&self, descriptor: &MatchDescriptor) -> Result<()> {
        let game_id = descriptor.game_id;
        match self.request(GatewayRequest::RunGame { game_id }).await {
            Ok(GatewayResponse::GameFinished) => {
                info!(game_id, "match finished");
                Ok(())
            }
            Ok(GatewayResponse::Error { message }) => Err(FightIceError::GameCrashed(message)),
            Ok(other) => Err(FightIceError::GameCrashed(format!(
                "unexpected run_game response: {:?}",
                other
            ))),
            Err(e) => Err(FightIceError::GameCrashed(e.to_string())),
        }
    }

    /// Close the callback listener, then the client channel. Must tolerate an
    /// already-broken bridge, so every step is best-effort.
    pub async fn disconnect(&self) {
        self.callback.shutdown();
        self.reader_handle.abort();
        let mut guard = self.writer.lock().await;
        *guard = None;
        debug!("gateway disconnected");
    }

    async fn request(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        let data = serialize(&request).map_err(|e| FightIceError::Serialization(e.to_string()))?;

        // Claim the response slot before writing so a fast reply cannot race
        // past the reader's pending queue.
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(response_tx)
            .await
            .map_err(|_| FightIceError::Ipc("gateway reader not running".into()))?;

        {
            let mut guard = self.writer.lock().await;
            let writer = guard
                .as_mut()
                .ok_or_else(|| FightIceError::Ipc("gateway not connected".into()))?;
            let preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
            debug!("[env→game] len={} json={}", data.len(), preview);
            writer.write_message(&data).await?;
        }

        response_rx
            .await
            .map_err(|_| FightIceError::Ipc("gateway closed while awaiting response".into()))?
    }
}

/// Background reader routing gateway responses to pending requests
async fn response_reader<R: AsyncReader>(
    mut reader: R,
    mut request_rx: mpsc::Receiver<oneshot::Sender<Result<GatewayResponse>>>,
) {
    let mut pending: VecDeque<oneshot::Sender<Result<GatewayResponse>>> = VecDeque::new();

    loop {
        tokio::select! {
            slot = request_rx.recv() => {
                match slot {
                    Some(response_tx) => pending.push_back(response_tx),
                    None => {
                        debug!("request channel closed, gateway reader exiting");
                        break;
                    }
                }
            }

            msg_result = reader.read_message() => {
                match msg_result {
                    Ok(data) => {
                        let preview: String = String::from_utf8_lossy(&data).chars().take(200).collect();
                        debug!("[game→env] len={} json={}", data.len(), preview);

                        let response = serde_json::from_slice::<GatewayResponse>(&data)
                            .map_err(|e| FightIceError::Serialization(e.to_string()));
                        if let Some(response_tx) = pending.pop_front() {
                            let _ = response_tx.send(response);
                        } else {
                            warn!("gateway response with no pending request");
                        }
                    }
                    Err(e) => {
                        debug!("gateway reader failed: {}", e);
                        for response_tx in pending.drain(..) {
                            let _ = response_tx.send(Err(FightIceError::Ipc("connection lost".into())));
                        }
                        break;
                    }
                }
            }
        }
    }
}
