//! In-memory test doubles for the graph store and the completion service

pub mod fake_store;
pub mod fakes;

pub use fake_store::{FakeConnector, FakeGraphStore};
pub use fakes::{ScriptedCall, ScriptedCompletionClient};
