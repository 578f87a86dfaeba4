pub mod client;
pub mod error;
pub mod key_cache;
pub mod transport;
pub mod wire;

pub use client::SpamCheckClient;
pub use error::ServiceError;
pub use key_cache::VerifiedKeySet;
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use wire::{Endpoint, Endpoints};
