pub mod action;
pub mod classification;
pub mod comment;
pub mod event;
pub mod spam_config;

pub use action::{ActionKind, SpamAction, UnknownActionValue};
pub use classification::{ClassificationKind, ClassificationResult};
pub use comment::{CommentPayload, CommentType};
pub use event::{EventKind, LifecycleEvent};
pub use spam_config::SpamCheckConfig;
