//! # Event Bus System
//!
//! Provides typed lifecycle events for the mirroring core using
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps per-domain enums ([`UploadEvent`],
//!   [`AuthEvent`])
//! - **EventBus**: Central broadcast channel for publishing events
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Upload(UploadEvent::Started {
//!     job_id: "42".to_string(),
//!     name: "holiday-photos".to_string(),
//! }))
//! .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Upload started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: all senders were dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns `SendError`; publishers in this
//! workspace ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Upload job lifecycle
    Upload(UploadEvent),
    /// Credential lifecycle
    Auth(AuthEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.description(),
            CoreEvent::Auth(e) => e.description(),
        }
    }
}

// ============================================================================
// Upload Events
// ============================================================================

/// Events emitted while one upload job runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// Job moved to `Started`.
    Started {
        job_id: String,
        /// Display name of the uploaded root (file or directory name).
        name: String,
    },
    /// Job finished with a public link.
    Completed {
        job_id: String,
        name: String,
        link: String,
    },
    /// Job failed. Partial remote state is left in place.
    Failed {
        job_id: String,
        name: String,
        message: String,
    },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Started { .. } => "Upload started",
            UploadEvent::Completed { .. } => "Upload completed",
            UploadEvent::Failed { .. } => "Upload failed",
        }
    }
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events emitted by the credential provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// No usable cached token; interactive consent is starting.
    ConsentRequired,
    /// Interactive consent completed and tokens were stored.
    SignedIn,
    /// Access token is being refreshed.
    TokenRefreshing,
    /// Token refresh completed.
    TokenRefreshed {
        /// Unix epoch seconds.
        expires_at: i64,
    },
    AuthError { message: String },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::ConsentRequired => "Interactive consent required",
            AuthEvent::SignedIn => "Signed in successfully",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus.
///
/// Cloning is cheap and every clone publishes into the same channel.
/// Subscribers that fall more than `capacity` events behind receive
/// `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with [`DEFAULT_EVENT_BUFFER_SIZE`].
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        debug!(
            event = event.description(),
            subscribers = self.sender.receiver_count(),
            "Publishing event"
        );
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(job_id: &str) -> CoreEvent {
        CoreEvent::Upload(UploadEvent::Started {
            job_id: job_id.to_string(),
            name: "photos".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.emit(started("1")).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("1")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Upload(UploadEvent::Completed {
            job_id: "7".to_string(),
            name: "report.pdf".to_string(),
            link: "https://drive.google.com/uc?id=abc&export=download".to_string(),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(started(&i.to_string())).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Auth(AuthEvent::TokenRefreshed {
            expires_at: 1_700_000_000,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("TokenRefreshed"));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
