//! Core traits (interfaces) for the external collaborators

pub mod completion;
pub mod graph_store;

pub use completion::{ChatMessage, ChatRole, CompletionClient};
#[cfg(any(test, feature = "mocks"))]
pub use completion::MockCompletionClient;
pub use graph_store::{GraphConnector, GraphQuery, GraphStore};
