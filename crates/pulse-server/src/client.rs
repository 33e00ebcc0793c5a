use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique client identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub String);

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }
}

impl ClientId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected streaming client. Immutable after registration; the
/// receiving half of `tx` lives inside the client's SSE response stream.
pub struct Client {
    pub id: ClientId,
    pub tx: mpsc::Sender<String>,
    pub connected_at: u64,
}

impl Client {
    fn new(id: ClientId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: now_secs(),
        }
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Registry of all connected streaming clients.
///
/// The only shared-mutable state in the live pipeline. Membership changes
/// are atomic per entry; `snapshot` hands the broadcaster a stable copy so
/// connects and disconnects during a fan-out pass cannot corrupt iteration.
pub struct ClientRegistry {
    clients: DashMap<ClientId, Client>,
    max_send_queue: usize,
}

impl ClientRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new client and return its ID + the receiving half of its
    /// outbound queue.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<String>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.clients.insert(id.clone(), Client::new(id.clone(), tx));
        (id, rx)
    }

    /// Remove a client by ID. No-op when absent, which covers the race
    /// between an explicit disconnect and a failed broadcast removing the
    /// same client.
    pub fn unregister(&self, id: &ClientId) {
        self.clients.remove(id);
    }

    /// Stable copy of the current membership for one fan-out pass. A client
    /// that connects mid-pass may or may not see the in-flight frame.
    pub fn snapshot(&self) -> Vec<(ClientId, mpsc::Sender<String>)> {
        self.clients
            .iter()
            .map(|entry| (entry.id.clone(), entry.tx.clone()))
            .collect()
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }
}
