//! Callback server: the game's path back into registered handlers
//!
//! At connect time the gateway tells the game to redirect its callback
//! traffic to this listener's OS-assigned port. The game then drives each
//! registered AI by name, once per simulated frame.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use fightice_core::{ActionId, FightIceError, FrameState, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::protocol::{CallbackReply, CallbackRequest};
use crate::transport::{AsyncReader, AsyncWriter, TcpReadWrapper, TcpWriteWrapper};

/// Capability interface the game invokes on a registered AI.
///
/// Implementations may block inside `on_frame` (the environment's own
/// observer waits there for the caller's next command); dispatch runs on the
/// blocking pool to allow this.
pub trait FrameObserver: Send {
    /// Stable name the game addresses this handler by
    fn name(&self) -> &str;

    /// One simulated frame; returns the move to apply
    fn on_frame(&mut self, state: FrameState) -> Result<ActionId>;

    /// A round just finished
    fn on_round_end(&mut self, state: FrameState);
}

type SharedObserver = Arc<Mutex<Box<dyn FrameObserver>>>;

/// Name → handler mapping owned by the bridge
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    inner: Arc<Mutex<HashMap<String, SharedObserver>>>,
}

impl HandlerRegistry {
    /// Register a handler under its own name, replacing any previous holder.
    pub fn insert(&self, handler: Box<dyn FrameObserver>) {
        let name = handler.name().to_string();
        self.lock().insert(name, Arc::new(Mutex::new(handler)));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn get(&self, name: &str) -> Option<SharedObserver> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedObserver>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Listener for the game's callback connection
pub struct CallbackServer {
    port: u16,
    registry: HandlerRegistry,
    accept_handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind to an OS-assigned port and start accepting.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| FightIceError::Ipc(format!("callback bind failed: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| FightIceError::Ipc(format!("callback local_addr failed: {}", e)))?
            .port();

        let registry = HandlerRegistry::default();
        let accept_handle = tokio::spawn(accept_loop(listener, registry.clone()));

        debug!(port, "callback server listening");
        Ok(Self {
            port,
            registry,
            accept_handle,
        })
    }

    /// The negotiated listener port, announced to the game via
    /// `RedirectCallback`.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Stop accepting and drop all handlers. Safe on a broken bridge.
    pub fn shutdown(&self) {
        self.accept_handle.abort();
        self.registry.clear();
    }
}

async fn accept_loop(listener: TcpListener, registry: HandlerRegistry) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "callback connection accepted");
                tokio::spawn(serve_connection(stream, registry.clone()));
            }
            Err(e) => {
                warn!("callback accept failed: {}", e);
                break;
            }
        }
    }
}

async fn serve_connection(stream: TcpStream, registry: HandlerRegistry) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay on callback connection failed: {}", e);
    }
    let (read_half, write_half) = stream.into_split();
    let mut reader = TcpReadWrapper(read_half);
    let mut writer = TcpWriteWrapper(write_half);

    loop {
        let data = match reader.read_message().await {
            Ok(data) => data,
            Err(_) => {
                debug!("callback connection closed");
                break;
            }
        };

        let reply = dispatch(&registry, &data).await;
        let bytes = match serde_json::to_vec(&reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode callback reply: {}", e);
                break;
            }
        };
        if writer.write_message(&bytes).await.is_err() {
            debug!("callback connection lost while replying");
            break;
        }
    }
}

async fn dispatch(registry: &HandlerRegistry, data: &[u8]) -> CallbackReply {
    let request: CallbackRequest = match serde_json::from_slice(data) {
        Ok(request) => request,
        Err(e) => {
            warn!("undecodable callback: {}", e);
            return CallbackReply::Error {
                message: format!("bad callback payload: {}", e),
            };
        }
    };

    match request {
        CallbackRequest::Frame { ai, state } => {
            let Some(handler) = registry.get(&ai) else {
                warn!(%ai, "frame callback for unregistered handler");
                return CallbackReply::Error {
                    message: FightIceError::HandlerNotRegistered(ai).to_string(),
                };
            };
            // The observer may block waiting on the caller's next command.
            let result = tokio::task::spawn_blocking(move || {
                let mut guard = handler.lock().unwrap_or_else(|e| e.into_inner());
                guard.on_frame(state)
            })
            .await;
            match result {
                Ok(Ok(action)) => CallbackReply::Action { action },
                Ok(Err(e)) => CallbackReply::Error {
                    message: e.to_string(),
                },
                Err(e) => CallbackReply::Error {
                    message: format!("handler panicked: {}", e),
                },
            }
        }
        CallbackRequest::RoundEnd { ai, state } => {
            let Some(handler) = registry.get(&ai) else {
                warn!(%ai, "round-end callback for unregistered handler");
                return CallbackReply::Error {
                    message: FightIceError::HandlerNotRegistered(ai).to_string(),
                };
            };
            let result = tokio::task::spawn_blocking(move || {
                let mut guard = handler.lock().unwrap_or_else(|e| e.into_inner());
                guard.on_round_end(state);
            })
            .await;
            match result {
                Ok(()) => CallbackReply::Ok,
                Err(e) => CallbackReply::Error {
                    message: format!("handler panicked: {}", e),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::serialize;

    struct FixedAction {
        name: String,
        action: ActionId,
        rounds_seen: Arc<Mutex<u32>>,
    }

    impl FrameObserver for FixedAction {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_frame(&mut self, _state: FrameState) -> Result<ActionId> {
            Ok(self.action)
        }

        fn on_round_end(&mut self, _state: FrameState) {
            *self.rounds_seen.lock().unwrap() += 1;
        }
    }

    async fn send_callback(
        writer: &mut TcpWriteWrapper,
        reader: &mut TcpReadWrapper,
        request: &CallbackRequest,
    ) -> CallbackReply {
        writer
            .write_message(&serialize(request).unwrap())
            .await
            .unwrap();
        let data = reader.read_message().await.unwrap();
        serde_json::from_slice(&data).unwrap()
    }

    #[tokio::test]
    async fn frame_dispatch_returns_handler_action() {
        let server = CallbackServer::bind().await.unwrap();
        let rounds_seen = Arc::new(Mutex::new(0));
        server.registry().insert(Box::new(FixedAction {
            name: "TestAi".into(),
            action: ActionId::new(22).unwrap(),
            rounds_seen: rounds_seen.clone(),
        }));

        let stream = TcpStream::connect(("127.0.0.1", server.port()))
            .await
            .unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = TcpReadWrapper(read_half);
        let mut writer = TcpWriteWrapper(write_half);

        let reply = send_callback(
            &mut writer,
            &mut reader,
            &CallbackRequest::Frame {
                ai: "TestAi".into(),
                state: FrameState::default(),
            },
        )
        .await;
        match reply {
            CallbackReply::Action { action } => assert_eq!(action.index(), 22),
            other => panic!("expected action reply, got {:?}", other),
        }

        let reply = send_callback(
            &mut writer,
            &mut reader,
            &CallbackRequest::RoundEnd {
                ai: "TestAi".into(),
                state: FrameState::default(),
            },
        )
        .await;
        assert!(matches!(reply, CallbackReply::Ok));
        assert_eq!(*rounds_seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_handler_gets_error_reply() {
        let server = CallbackServer::bind().await.unwrap();

        let stream = TcpStream::connect(("127.0.0.1", server.port()))
            .await
            .unwrap();
        let (read_half, write_half) = stream.into_split();
        let mut reader = TcpReadWrapper(read_half);
        let mut writer = TcpWriteWrapper(write_half);

        let reply = send_callback(
            &mut writer,
            &mut reader,
            &CallbackRequest::Frame {
                ai: "Nobody".into(),
                state: FrameState::default(),
            },
        )
        .await;
        match reply {
            CallbackReply::Error { message } => assert!(message.contains("Nobody")),
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn shutdown_clears_registry_and_listener() {
        let server = CallbackServer::bind().await.unwrap();
        server.registry().insert(Box::new(FixedAction {
            name: "TestAi".into(),
            action: ActionId::NEUTRAL,
            rounds_seen: Arc::new(Mutex::new(0)),
        }));
        assert!(server.registry().contains("TestAi"));

        server.shutdown();
        assert!(!server.registry().contains("TestAi"));
        // Calling again must stay harmless
        server.shutdown();
    }
}
