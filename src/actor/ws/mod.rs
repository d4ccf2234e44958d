//! WebSocket Actor - pushes protocol messages to attached browser sessions.
//!
//! ```text
//! ReloadActor --[Broadcast/Error/ClearError]--> WsActor --[broadcast]--> Clients
//! ```
//!
//! Sessions connecting after a failed build receive the pending error right
//! after `connected`, so a reload never hides a broken build.

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::HotReloadMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the reader thread)
    clients: Clients,
    /// Overlay message of the last failed build, until a build succeeds
    pending_error: Arc<Mutex<Option<String>>>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || Self::client_reader_loop(clients_for_reader));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Broadcast(hr_msg) => self.broadcast(&hr_msg),

                WsMsg::Error(message) => {
                    *self.pending_error.lock() = Some(message.clone());
                    self.broadcast(&HotReloadMessage::error(message));
                }

                WsMsg::ClearError => {
                    *self.pending_error.lock() = None;
                    self.broadcast(&HotReloadMessage::clear_error());
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    for mut client in self.clients.lock().drain(..) {
                        let _ = client.close(None);
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn read_text(socket: &mut WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>>) -> HotReloadMessage {
        let msg = socket.read().unwrap();
        HotReloadMessage::from_json(msg.to_text().unwrap()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_client_gets_pending_error_then_broadcasts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (ws_tx, ws_rx) = mpsc::channel(8);
        tokio::spawn(WsActor::new(ws_rx).run());

        ws_tx.send(WsMsg::Error("build failed".into())).await.unwrap();

        let client = std::thread::spawn(move || {
            let (mut socket, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
            let received = [read_text(&mut socket), read_text(&mut socket), read_text(&mut socket)];
            let _ = socket.close(None);
            received
        });

        let (stream, _) = listener.accept().unwrap();
        ws_tx.send(WsMsg::AddClient(stream)).await.unwrap();
        ws_tx.send(WsMsg::ClearError).await.unwrap();

        let received = tokio::task::spawn_blocking(move || client.join().unwrap())
            .await
            .unwrap();
        assert_eq!(
            received,
            [
                HotReloadMessage::connected(),
                HotReloadMessage::error("build failed"),
                HotReloadMessage::clear_error(),
            ]
        );
    }
}
