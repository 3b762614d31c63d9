// ABOUTME: Networked relay transport
// ABOUTME: WebSocket client to a hosted sync relay, with reconnect and an online gate

use crate::protocol::messages::SyncMessage;
use crate::protocol::relay::{PresenceMeta, RelayFrame};
use crate::transport::{EventHandler, SyncTransport, TransportEvent};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// Delay between reconnection attempts
const RECONNECT_DELAY: Duration = Duration::from_secs(3);
/// Poll interval while the online gate is closed
const OFFLINE_POLL: Duration = Duration::from_secs(1);

/// Transport speaking to a hosted relay over WebSocket
///
/// Reachable across physical devices, subject to real network latency and
/// loss: while the link is down the transport simply delivers nothing and
/// outbound messages are dropped, which the protocol is built to tolerate.
/// The online gate decides whether connection attempts are made at all, so
/// an offline participant is not burning retries.
pub struct RelayTransport {
    inner: Arc<Inner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    url: String,
    handlers: RwLock<Vec<EventHandler>>,
    outbox: Mutex<Option<mpsc::UnboundedSender<WsMessage>>>,
    online: AtomicBool,
    connected: AtomicBool,
    closed: AtomicBool,
    /// Last announced identity, replayed after every reconnect
    announced: Mutex<Option<PresenceMeta>>,
}

impl Inner {
    fn dispatch(&self, event: TransportEvent) {
        let targets: Vec<EventHandler> = self.handlers.read().iter().cloned().collect();
        for handler in targets {
            handler(event.clone());
        }
    }

    fn set_connected(&self, up: bool) {
        if self.connected.swap(up, Ordering::SeqCst) != up {
            self.dispatch(TransportEvent::ConnectivityChanged(up));
        }
    }

    /// Queue a frame for the relay; silently dropped while the link is down
    fn send_frame(&self, frame: &RelayFrame) {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                log::error!("failed to serialize relay frame: {}", e);
                return;
            }
        };
        if let Some(tx) = self.outbox.lock().clone() {
            let _ = tx.send(WsMessage::Text(json));
        } else {
            log::trace!("relay link down, dropping outbound frame");
        }
    }

    fn handle_text(&self, text: &str) {
        let frame = match serde_json::from_str::<RelayFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("failed to parse relay frame: {}", e);
                return;
            }
        };

        match frame {
            RelayFrame::Broadcast(message) => self.dispatch(TransportEvent::Message(message)),
            RelayFrame::PresenceSync(entries) => {
                self.dispatch(TransportEvent::PresenceSync(entries))
            }
            RelayFrame::Track(_) | RelayFrame::Untrack => {
                // Peer-originated frames are consumed by the relay itself
                log::debug!("ignoring relay-bound frame echoed to a peer");
            }
        }
    }
}

impl RelayTransport {
    /// Create a transport for the given relay URL (not yet connected)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                handlers: RwLock::new(Vec::new()),
                outbox: Mutex::new(None),
                online: AtomicBool::new(true),
                connected: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                announced: Mutex::new(None),
            }),
            supervisor: Mutex::new(None),
        }
    }

    /// Start the connection supervisor (requires a tokio runtime)
    pub fn start(&self) {
        let mut supervisor = self.supervisor.lock();
        if supervisor.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *supervisor = Some(tokio::spawn(run(inner)));
    }

    /// Feed an external connectivity signal
    ///
    /// While offline no connection attempts are made; an established link is
    /// severed so the participant falls back to local-only propagation.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        if !online {
            *self.inner.outbox.lock() = None;
        }
    }

    /// Whether the relay link is currently established
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

/// Connection supervisor: connect, pump, reconnect until closed
async fn run(inner: Arc<Inner>) {
    while !inner.closed.load(Ordering::SeqCst) {
        if !inner.online.load(Ordering::SeqCst) {
            tokio::time::sleep(OFFLINE_POLL).await;
            continue;
        }

        match connect_async(inner.url.as_str()).await {
            Ok((stream, _)) => {
                log::info!("relay connected: {}", inner.url);
                let (mut ws_tx, mut ws_rx) = stream.split();
                let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
                *inner.outbox.lock() = Some(tx);
                inner.set_connected(true);

                // Re-announce presence after a reconnect
                if let Some(meta) = inner.announced.lock().clone() {
                    inner.send_frame(&RelayFrame::Track(meta));
                }

                let send_task = tokio::spawn(async move {
                    while let Some(msg) = rx.recv().await {
                        if ws_tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                });

                while let Some(frame) = ws_rx.next().await {
                    if inner.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    match frame {
                        Ok(WsMessage::Text(text)) => inner.handle_text(&text),
                        Ok(WsMessage::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            log::debug!("relay socket error: {}", e);
                            break;
                        }
                    }
                }

                send_task.abort();
                *inner.outbox.lock() = None;
                inner.set_connected(false);
                log::info!("relay disconnected");
            }
            Err(e) => {
                log::debug!("relay connect failed: {}", e);
            }
        }

        if inner.closed.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

impl SyncTransport for RelayTransport {
    fn send(&self, message: &SyncMessage) {
        self.inner
            .send_frame(&RelayFrame::Broadcast(message.clone()));
    }

    fn announce(&self, meta: &PresenceMeta) {
        *self.inner.announced.lock() = Some(meta.clone());
        self.inner.send_frame(&RelayFrame::Track(meta.clone()));
    }

    fn depart(&self) {
        self.inner.send_frame(&RelayFrame::Untrack);
    }

    fn subscribe(&self, handler: EventHandler) {
        self.inner.handlers.write().push(handler);
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        *self.inner.outbox.lock() = None;
        self.inner.handlers.write().clear();
        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }
        self.inner.set_connected(false);
    }
}
