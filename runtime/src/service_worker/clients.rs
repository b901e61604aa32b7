//! Clients API
//!
//! Pages connected to the worker's scope. `claim` puts every one of them
//! under this worker's control without waiting for a reload.

use spin::RwLock;

/// Client type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    /// Browser window or tab
    #[default]
    Window,
    /// Dedicated worker
    Worker,
    /// Shared worker
    SharedWorker,
    /// Matches any type in [`Clients::match_all`]
    All,
}

/// Client info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client ID
    pub id: String,
    /// Current URL of the client
    pub url: String,
    /// Client type
    pub client_type: ClientType,
    /// Whether requests from this client route through the worker
    pub controlled: bool,
}

impl ClientInfo {
    pub fn window(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            client_type: ClientType::Window,
            controlled: false,
        }
    }
}

/// Options for matchAll
#[derive(Debug, Clone, Default)]
pub struct MatchAllOptions {
    /// Include clients not controlled by this worker
    pub include_uncontrolled: bool,
    /// Client type filter
    pub client_type: ClientType,
}

/// Clients API
#[derive(Debug, Default)]
pub struct Clients {
    /// Connected clients, in connection order
    clients: RwLock<Vec<ClientInfo>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client, replacing one with the same ID
    pub fn add(&self, client: ClientInfo) {
        let mut clients = self.clients.write();
        clients.retain(|c| c.id != client.id);
        clients.push(client);
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut clients = self.clients.write();
        let len_before = clients.len();
        clients.retain(|c| c.id != id);
        clients.len() != len_before
    }

    pub fn get(&self, id: &str) -> Option<ClientInfo> {
        self.clients.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn match_all(&self, options: &MatchAllOptions) -> Vec<ClientInfo> {
        self.clients
            .read()
            .iter()
            .filter(|c| options.client_type == ClientType::All || c.client_type == options.client_type)
            .filter(|c| options.include_uncontrolled || c.controlled)
            .cloned()
            .collect()
    }

    /// Take control of every client; returns how many changed hands
    pub fn claim(&self) -> usize {
        let mut claimed = 0;
        for client in self.clients.write().iter_mut() {
            if !client.controlled {
                client.controlled = true;
                claimed += 1;
            }
        }
        claimed
    }
}
