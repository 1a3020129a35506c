//! Core utilities shared by the identity providers and the request executor.

pub mod reqwest_transport;
pub mod retry;
pub mod transport;
pub mod types;

pub use reqwest_transport::ReqwestTransport;
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, TransportError};
pub use types::{
    AttemptOutcome, FetchResponse, NetworkIdentity, OutboundRequest, ProxyRoute, RequestAttempt,
    Strategy,
};
