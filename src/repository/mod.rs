pub mod memory;
pub mod node;
pub mod props;
pub mod session;
pub mod workflow;

pub use memory::{MemoryRepository, MemoryWorkflowManager, TreeSnapshot};
pub use node::{Capability, ContentNode, NodeId, NodeKind};
pub use session::{ContentRepository, ContentSession, RepositoryError};
pub use workflow::{PublicationWorkflow, WorkflowError, WorkflowManager};
