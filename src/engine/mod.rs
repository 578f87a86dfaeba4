pub mod dispatcher;
pub mod payload;
pub mod resolver;
pub mod subscriber;

pub use dispatcher::{ActionDispatcher, ApplyReport, Decision, WorkflowStatus, decide};
pub use payload::{PayloadDefaults, build_payload};
pub use resolver::ConfigResolver;
pub use subscriber::{EngineError, EventOutcome, EventSubscriber, SkipReason, SubmissionRejected};
