//! Stream table
//!
//! Maps stream ids to the event channel feeding that stream's egress
//! pump. Each endpoint owns its own table; the client-side and
//! relay-side tables are correlated only by stream id. The lock covers
//! lookup/insert/remove only; per-stream cursors and buffers are owned
//! by the stream's own pumps.

use super::stream::StreamEvent;
use crate::error::SockweaveError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Registry of live streams for one session
#[derive(Debug, Clone, Default)]
pub struct StreamTable {
    inner: Arc<Mutex<HashMap<u32, mpsc::Sender<StreamEvent>>>>,
}

impl StreamTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream's event channel
    ///
    /// Fails if the id is already present; ids are unique for the
    /// lifetime of the stream they name.
    pub fn insert(
        &self,
        stream_id: u32,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), SockweaveError> {
        let mut map = self.inner.lock().unwrap();
        if map.contains_key(&stream_id) {
            return Err(SockweaveError::Config(format!(
                "stream id {} already registered",
                stream_id
            )));
        }
        map.insert(stream_id, tx);
        Ok(())
    }

    /// Remove a stream; subsequent frames for the id are unknown
    pub fn remove(&self, stream_id: u32) {
        self.inner.lock().unwrap().remove(&stream_id);
    }

    /// Whether the table holds the given id
    pub fn contains(&self, stream_id: u32) -> bool {
        self.inner.lock().unwrap().contains_key(&stream_id)
    }

    /// Number of live streams
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Deliver an event to the stream's egress pump
    ///
    /// The sender is cloned out of the table so the lock is never held
    /// across the await.
    pub async fn dispatch(
        &self,
        stream_id: u32,
        event: StreamEvent,
    ) -> Result<(), SockweaveError> {
        let tx = {
            let map = self.inner.lock().unwrap();
            map.get(&stream_id).cloned()
        };

        match tx {
            Some(tx) => {
                if tx.send(event).await.is_err() {
                    // Pump already exited; entry removal is in flight
                    self.remove(stream_id);
                }
                Ok(())
            }
            None => Err(SockweaveError::UnknownStream(stream_id)),
        }
    }

    /// Tear down every stream in the table (session shutdown)
    ///
    /// Sends a close event to each pump and clears the map. Pumps that
    /// already exited are ignored.
    pub async fn close_all(&self) {
        let drained: Vec<(u32, mpsc::Sender<StreamEvent>)> = {
            let mut map = self.inner.lock().unwrap();
            map.drain().collect()
        };

        for (_, tx) in drained {
            let _ = tx.send(StreamEvent::Close).await;
        }
    }
}
