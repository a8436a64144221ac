//! Replication wire protocol
//!
//! Newline-delimited JSON frames over any byte stream:
//!
//! ```text
//! → {"frame":"hello","capability":"<hex>"}
//! ← {"frame":"hello","capability":"<hex>"}
//! → {"frame":"entry","entry":{…}}      (full log, then every new entry)
//! → {"frame":"wakeup","length":42}     (after each batch of local entries)
//! ```
//!
//! A peer whose capability differs is dropped after the hello exchange.
//! Entries are idempotent by id; entries a peer sent are not sent back to
//! it.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use roomq_core::{to_hex, Error, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::oplog::Entry;
use crate::replica::Replica;

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    /// Handshake carrying the room capability
    Hello {
        /// Hex capability token
        capability: String,
    },
    /// A replicated log entry
    Entry {
        /// The entry
        entry: Entry,
    },
    /// Wakeup notice: the sender's log now has `length` entries
    Wakeup {
        /// Sender's log length
        length: usize,
    },
}

async fn send<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn send_log<W>(writer: &mut W, replica: &Replica) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for entry in replica.entries() {
        send(writer, &Frame::Entry { entry }).await?;
    }
    send(
        writer,
        &Frame::Wakeup {
            length: replica.len(),
        },
    )
    .await?;
    writer.flush().await?;
    Ok(())
}

/// Run the replication protocol on `stream` until the peer disconnects.
///
/// After the handshake the outbound half (full log, then new entries) and
/// the inbound half run as independent futures, so neither side can block
/// the other on a full socket buffer.
///
/// `peer` is only used for diagnostics.
pub async fn replicate<S>(
    stream: S,
    replica: Arc<Replica>,
    capability: [u8; 32],
    peer: String,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut writer = BufWriter::new(writer);
    let mut lines = BufReader::new(reader).lines();

    let ours = to_hex(&capability);
    send(
        &mut writer,
        &Frame::Hello {
            capability: ours.clone(),
        },
    )
    .await?;
    writer.flush().await?;

    let hello = lines
        .next_line()
        .await?
        .ok_or_else(|| Error::session("handshake", format!("{} closed before hello", peer)))?;
    match serde_json::from_str::<Frame>(&hello) {
        Ok(Frame::Hello { capability }) if capability == ours => {}
        Ok(Frame::Hello { .. }) => {
            return Err(Error::session(
                "handshake",
                format!("{} presented a different capability", peer),
            ))
        }
        _ => {
            return Err(Error::session(
                "handshake",
                format!("{} did not send hello", peer),
            ))
        }
    }
    debug!(target: "roomq::swarm", peer = %peer, "Handshake complete");

    replica.wait_ready().await;
    // Subscribe before snapshotting so nothing falls between the two.
    let mut updates = replica.subscribe();
    // Ids this peer sent us; their wakeups are not echoed back.
    let received: Mutex<HashSet<String>> = Mutex::new(HashSet::new());

    let outbound = async {
        send_log(&mut writer, &replica).await?;
        loop {
            match updates.recv().await {
                Ok(entry) => {
                    let echo = received.lock().remove(&entry.id);
                    if echo {
                        continue;
                    }
                    send(&mut writer, &Frame::Entry { entry }).await?;
                    send(&mut writer, &Frame::Wakeup { length: replica.len() }).await?;
                    writer.flush().await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "roomq::swarm", peer = %peer, skipped, "Wakeup stream lagged, resending log");
                    send_log(&mut writer, &replica).await?;
                }
                Err(RecvError::Closed) => break,
            }
        }
        Ok::<(), Error>(())
    };

    let inbound = async {
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Frame>(&line)? {
                Frame::Entry { entry } => {
                    let id = entry.id.clone();
                    received.lock().insert(id.clone());
                    if !replica.apply(entry).await? {
                        received.lock().remove(&id);
                    }
                }
                Frame::Wakeup { length } => {
                    debug!(target: "roomq::swarm", peer = %peer, length, local = replica.len(), "Wakeup");
                }
                Frame::Hello { .. } => {
                    warn!(target: "roomq::swarm", peer = %peer, "Unexpected hello, ignoring");
                }
            }
        }
        Ok::<(), Error>(())
    };

    tokio::select! {
        result = outbound => result?,
        result = inbound => result?,
    }

    debug!(target: "roomq::swarm", peer = %peer, "Peer disconnected");
    Ok(())
}
