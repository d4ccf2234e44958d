use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use tungstenite::protocol::Message;

use crate::reload::HotReloadMessage;

use super::{Clients, WsActor};

impl WsActor {
    /// Complete the handshake, greet the client and replay a pending error.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Blocking during the handshake, non-blocking afterwards for polling
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        let connected = HotReloadMessage::connected();
        if let Err(e) = ws.send(Message::Text(connected.to_json().into())) {
            crate::log!("ws"; "failed to send connected message: {}", e);
            return;
        }

        if let Some(message) = self.pending_error.lock().clone() {
            let hr_msg = HotReloadMessage::error(message);
            match ws.send(Message::Text(hr_msg.to_json().into())) {
                Ok(()) => crate::debug!("ws"; "sent pending error to new client"),
                Err(e) => crate::log!("ws"; "failed to send pending error: {}", e),
            }
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }

    /// Poll clients for close frames and broken connections.
    ///
    /// Sessions never send anything we act on; reading keeps the socket's
    /// control frames (ping/close) flowing.
    pub(super) fn client_reader_loop(clients: Clients) {
        while !crate::core::is_shutdown() {
            std::thread::sleep(Duration::from_millis(100));

            clients.lock().retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
                Err(e) => {
                    crate::debug!("ws"; "client dropped: {}", e);
                    false
                }
            });
        }
    }
}
