// Transport, retry policy and request shaping used by the resilient executor.

pub mod core;
pub mod user_agents;
