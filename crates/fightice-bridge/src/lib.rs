//! # fightice-bridge
//!
//! The process and RPC layer under the FightingICE environment:
//! - Wire protocol between the supervisor and the game's gateway
//! - Length-prefixed TCP transport (AsyncReader/AsyncWriter)
//! - Gateway client: register AIs, create matches, run the match loop
//! - Callback server: dispatches the game's per-frame callbacks to
//!   registered [`FrameObserver`] handlers
//! - Java process launcher with install validation

pub mod callback;
pub mod gateway;
pub mod launcher;
pub mod protocol;
pub mod transport;

pub use callback::{CallbackServer, FrameObserver, HandlerRegistry};
pub use gateway::{GatewayClient, MatchDescriptor};
pub use launcher::{GameInstall, GameProcess, Platform, free_port};
pub use protocol::{CallbackReply, CallbackRequest, GatewayRequest, GatewayResponse};
pub use transport::{AsyncReader, AsyncWriter, TcpReadWrapper, TcpWriteWrapper};
