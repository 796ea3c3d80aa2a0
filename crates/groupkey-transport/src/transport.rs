//! Transport abstraction.
//!
//! The access manager publishes records and answers requests through a
//! [`Transport`]. Implementations may sit on a named-data forwarder, HTTP,
//! or anything else that can route a request name to a handler.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use groupkey_core::Name;

use crate::error::Result;
use crate::messages::Response;

/// Answers requests under a registered prefix.
///
/// Called synchronously on the request path; implementations must not block.
pub trait RequestHandler: Send + Sync {
    /// Produce the response for `name`.
    fn handle(&self, name: &Name) -> Response;
}

/// Transport trait for publishing content and routing requests.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Make `payload` retrievable under `name`, replacing any previous content.
    async fn publish(&self, name: Name, payload: Bytes) -> Result<()>;

    /// Stop serving `name`. Returns whether anything was published there.
    async fn withdraw(&self, name: &Name) -> Result<bool>;

    /// Route every request under `prefix` to `handler`.
    async fn on_request(&self, prefix: Name, handler: Arc<dyn RequestHandler>) -> Result<()>;

    /// Send a request for `name` and wait for the response.
    async fn express(&self, name: &Name) -> Result<Response>;
}

/// An in-process network for tests and single-process deployments.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    use crate::error::TransportError;

    /// Shared state for the memory network.
    ///
    /// Requests go to the handler with the longest matching prefix; names no
    /// handler covers fall back to published content.
    pub struct MemoryNetwork {
        handlers: RwLock<HashMap<Name, Arc<dyn RequestHandler>>>,
        content: RwLock<HashMap<Name, Bytes>>,
        closed: AtomicBool,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Shut the network down. Every later call fails with `Closed`.
        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        /// Names with published content, sorted.
        pub async fn published(&self) -> Vec<Name> {
            let mut names: Vec<Name> = self.content.read().await.keys().cloned().collect();
            names.sort();
            names
        }

        /// The content published under `name`, if any.
        pub async fn published_content(&self, name: &Name) -> Option<Bytes> {
            self.content.read().await.get(name).cloned()
        }

        fn ensure_open(&self) -> Result<()> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }
            Ok(())
        }

        async fn route(&self, name: &Name) -> Option<Arc<dyn RequestHandler>> {
            let handlers = self.handlers.read().await;
            handlers
                .iter()
                .filter(|(prefix, _)| prefix.is_prefix_of(name))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, handler)| Arc::clone(handler))
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                handlers: RwLock::new(HashMap::new()),
                content: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Transport for MemoryNetwork {
        async fn publish(&self, name: Name, payload: Bytes) -> Result<()> {
            self.ensure_open()?;
            tracing::trace!(name = %name, len = payload.len(), "publish");
            self.content.write().await.insert(name, payload);
            Ok(())
        }

        async fn withdraw(&self, name: &Name) -> Result<bool> {
            self.ensure_open()?;
            Ok(self.content.write().await.remove(name).is_some())
        }

        async fn on_request(&self, prefix: Name, handler: Arc<dyn RequestHandler>) -> Result<()> {
            self.ensure_open()?;
            tracing::debug!(prefix = %prefix, "registered request handler");
            self.handlers.write().await.insert(prefix, handler);
            Ok(())
        }

        async fn express(&self, name: &Name) -> Result<Response> {
            self.ensure_open()?;

            if let Some(handler) = self.route(name).await {
                return Ok(handler.handle(name));
            }
            match self.content.read().await.get(name) {
                Some(payload) => Ok(Response::Data(payload.clone())),
                None => Err(TransportError::NoRoute(name.to_uri())),
            }
        }
    }
}
