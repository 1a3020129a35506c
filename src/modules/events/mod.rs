//! Event system for the request executor.
//!
//! Every attempt, rotation and fallback is broadcast to registered handlers.
//! The logging handler turns them into log records; tests register their own
//! handlers to observe the state machine.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

use crate::network::core::{AttemptOutcome, RequestAttempt, Strategy};

#[derive(Debug, Clone)]
pub struct StrategyEvent {
    pub url: Url,
    pub strategy: Strategy,
    pub timestamp: DateTime<Utc>,
}

/// Identity in use right before an attempt is sent.
#[derive(Debug, Clone)]
pub struct IdentityEvent {
    pub strategy: Strategy,
    pub attempt: u32,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttemptEvent {
    pub attempt: RequestAttempt,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RotationEvent {
    pub url: Url,
    pub trigger_status: u16,
    /// Exit IP observed before the request was rotated, when known.
    pub previous_ip: Option<String>,
    pub new_ip: String,
    pub timestamp: DateTime<Utc>,
}

impl RotationEvent {
    /// True only when a new, non-empty exit IP differs from the previous one.
    pub fn changed(&self) -> bool {
        !self.new_ip.is_empty() && self.previous_ip.as_deref() != Some(self.new_ip.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ExhaustedEvent {
    pub url: Url,
    pub last_outcome: Option<AttemptOutcome>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    StrategyStarted(StrategyEvent),
    Identity(IdentityEvent),
    Attempt(AttemptEvent),
    Rotation(RotationEvent),
    StrategyExhausted(StrategyEvent),
    Exhausted(ExhaustedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &NetworkEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn dispatch(&self, event: NetworkEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &NetworkEvent) {
        match event {
            NetworkEvent::StrategyStarted(start) => {
                log::info!("starting {} strategy for {}", start.strategy.as_str().to_uppercase(), start.url);
            }
            NetworkEvent::Identity(identity) => {
                log::debug!(
                    "attempt {} via {}: {}",
                    identity.attempt,
                    identity.strategy,
                    identity.description
                );
            }
            NetworkEvent::Attempt(record) => {
                let attempt = &record.attempt;
                match attempt.outcome {
                    AttemptOutcome::Response(status) => log::info!(
                        "attempt {}/{} | {} {} | {} ({}) -> {}",
                        attempt.attempt,
                        attempt.max_attempts,
                        attempt.method,
                        attempt.url,
                        attempt.strategy.as_str().to_uppercase(),
                        attempt.identity,
                        status
                    ),
                    AttemptOutcome::Failed(kind) => log::warn!(
                        "attempt {}/{} | {} {} | {} ({}) -> {kind} error",
                        attempt.attempt,
                        attempt.max_attempts,
                        attempt.method,
                        attempt.url,
                        attempt.strategy.as_str().to_uppercase(),
                        attempt.identity
                    ),
                }
            }
            NetworkEvent::Rotation(rotation) => {
                if rotation.changed() {
                    log::warn!(
                        "block status {} on {} via TOR, rotated identity (exit ip: {})",
                        rotation.trigger_status,
                        rotation.url,
                        rotation.new_ip
                    );
                } else {
                    log::warn!(
                        "block status {} on {} via TOR, rotation failed, exit unchanged (exit ip: {})",
                        rotation.trigger_status,
                        rotation.url,
                        if rotation.new_ip.is_empty() { "unknown" } else { &rotation.new_ip }
                    );
                }
            }
            NetworkEvent::StrategyExhausted(exhausted) => {
                log::warn!(
                    "{} strategy exhausted for {}",
                    exhausted.strategy.as_str().to_uppercase(),
                    exhausted.url
                );
            }
            NetworkEvent::Exhausted(exhausted) => match exhausted.last_outcome {
                Some(ref outcome) => log::error!(
                    "all strategies failed for {} (last outcome: {outcome})",
                    exhausted.url
                ),
                None => log::error!("all strategies failed for {}", exhausted.url),
            },
        }
    }
}
