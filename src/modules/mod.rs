//! Cross-cutting services module
//!
//! Network identity providers (proxy selection, Tor rotation) and the event
//! layer the executor reports through.

pub mod events;
pub mod proxy;
pub mod tor;

// Re-export commonly used types
pub use events::{
    AttemptEvent, EventDispatcher, EventHandler, ExhaustedEvent, IdentityEvent, LoggingHandler,
    NetworkEvent, RotationEvent, StrategyEvent,
};
pub use proxy::{ProxyLocation, ProxyProvider, ProxySource};
pub use tor::{ControlChannel, ControlError, IdentityRotator, TorControlClient, TorRotator};
