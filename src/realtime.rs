//! Sink for the external realtime notification channel. The transport
//! lives elsewhere; this only remembers which socket belongs to which user.

use std::collections::HashMap;

use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct SocketRegistry {
    sockets: Mutex<HashMap<String, String>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the socket for a user.
    pub async fn add_user(&self, user_id: &str, socket_id: &str) {
        let mut sockets = self.sockets.lock().await;
        sockets.insert(user_id.to_string(), socket_id.to_string());
    }

    pub async fn socket_for(&self, user_id: &str) -> Option<String> {
        let sockets = self.sockets.lock().await;
        sockets.get(user_id).cloned()
    }
}
