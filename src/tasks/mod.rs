pub mod worker;

pub use worker::{EventEnvelope, EventSender, EventWorker};
