//! Length-prefixed TCP transport
//!
//! Both bridge channels frame their messages the same way: a 4-byte
//! little-endian length followed by the JSON payload.

use async_trait::async_trait;
use fightice_core::{FightIceError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Upper bound on a single message (display-mode frames carry image data)
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Trait for async reading from a transport
#[async_trait]
pub trait AsyncReader: Send {
    /// Read one complete length-prefixed message
    async fn read_message(&mut self) -> Result<Vec<u8>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait AsyncWriter: Send + Sync {
    /// Write one complete length-prefixed message
    async fn write_message(&mut self, data: &[u8]) -> Result<()>;
}

/// TCP read wrapper
pub struct TcpReadWrapper(pub OwnedReadHalf);

#[async_trait]
impl AsyncReader for TcpReadWrapper {
    async fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut len_bytes = [0u8; 4];
        self.0
            .read_exact(&mut len_bytes)
            .await
            .map_err(|e| FightIceError::Ipc(format!("TCP read length failed: {}", e)))?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > MAX_MESSAGE_BYTES {
            return Err(FightIceError::Ipc(format!(
                "Message too large: {} bytes",
                len
            )));
        }

        let mut data = vec![0u8; len];
        self.0
            .read_exact(&mut data)
            .await
            .map_err(|e| FightIceError::Ipc(format!("TCP read data failed: {}", e)))?;

        Ok(data)
    }
}

/// TCP write wrapper
pub struct TcpWriteWrapper(pub OwnedWriteHalf);

#[async_trait]
impl AsyncWriter for TcpWriteWrapper {
    async fn write_message(&mut self, data: &[u8]) -> Result<()> {
        let len = (data.len() as u32).to_le_bytes();
        self.0
            .write_all(&len)
            .await
            .map_err(|e| FightIceError::Ipc(format!("TCP write length failed: {}", e)))?;

        self.0
            .write_all(data)
            .await
            .map_err(|e| FightIceError::Ipc(format!("TCP write data failed: {}", e)))?;

        self.0
            .flush()
            .await
            .map_err(|e| FightIceError::Ipc(format!("TCP flush failed: {}", e)))?;

        Ok(())
    }
}
