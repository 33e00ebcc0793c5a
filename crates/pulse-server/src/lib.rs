pub mod broadcast;
pub mod client;
pub mod handlers;
pub mod server;
pub mod stream;
pub mod watcher;

pub use broadcast::Broadcaster;
pub use client::{ClientId, ClientRegistry};
pub use server::{start, AppState, ServerConfig, ServerHandle};
pub use watcher::ChangeWatcher;
