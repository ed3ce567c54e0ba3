//! `Dragonfly` (Redis-compatible) board operations.
//!
//! The whole canvas is one string value under a single key. Cells are
//! addressed with `BITFIELD`, which reads and writes an unsigned `B`-bit
//! integer at bit position `#offset * B` in one server-side step, so a cell
//! write is never a client-side read-modify-write.
//!
//! # Commands
//!
//! | Operation | Command |
//! |-----------|---------|
//! | set cell | `BITFIELD <key> SET u<B> #<offset> <color>` |
//! | get cell | `BITFIELD <key> GET u<B> #<offset>` |
//! | snapshot | `GET <key>` |
//! | clear | `DEL <key>` |

use fred::prelude::*;

use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. Cloning is cheap and shares the
/// underlying connection.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Unavailable`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Close the connection. Pending commands are flushed first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the `QUIT` fails.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.client.quit().await?;
        tracing::info!("Disconnected from Dragonfly");
        Ok(())
    }

    /// Round-trip a `PING` to the server.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the server does not answer.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let _: String = self
            .client
            .custom(fred::cmd!("PING"), Vec::<Value>::new())
            .await?;
        Ok(())
    }

    // =========================================================================
    // Bit-field cells
    // =========================================================================

    /// Write `value` into the `bit_width`-bit cell at `index` of `key`.
    ///
    /// The key is created (zero-filled) if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the write fails.
    pub async fn set_bits(
        &self,
        key: &str,
        bit_width: u32,
        index: u64,
        value: u32,
    ) -> Result<(), StoreError> {
        let args = vec![
            Value::from(key),
            Value::from("SET"),
            Value::from(format!("u{bit_width}")),
            Value::from(format!("#{index}")),
            Value::from(i64::from(value)),
        ];
        let _previous: Vec<i64> = self.client.custom(fred::cmd!("BITFIELD"), args).await?;
        Ok(())
    }

    /// Read the `bit_width`-bit cell at `index` of `key`.
    ///
    /// A missing key, or a key shorter than the cell, reads as zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the read fails, or
    /// [`StoreError::UnexpectedReply`] if the reply is not one unsigned
    /// integer of the requested width.
    pub async fn get_bits(&self, key: &str, bit_width: u32, index: u64) -> Result<u32, StoreError> {
        let args = vec![
            Value::from(key),
            Value::from("GET"),
            Value::from(format!("u{bit_width}")),
            Value::from(format!("#{index}")),
        ];
        let reply: Vec<i64> = self.client.custom(fred::cmd!("BITFIELD"), args).await?;
        let raw = reply
            .first()
            .copied()
            .ok_or_else(|| StoreError::UnexpectedReply("empty BITFIELD reply".to_owned()))?;
        u32::try_from(raw)
            .map_err(|e| StoreError::UnexpectedReply(format!("BITFIELD returned {raw}: {e}")))
    }

    // =========================================================================
    // Whole buffer
    // =========================================================================

    /// Read the raw bytes stored at `key`. A missing key reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the read fails.
    pub async fn get_buffer(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let value: Option<Vec<u8>> = self.client.get(key).await?;
        Ok(value.unwrap_or_default())
    }

    /// Delete a key from `Dragonfly`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }
}
