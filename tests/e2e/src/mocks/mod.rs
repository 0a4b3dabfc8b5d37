//! Deterministic provider mocks.

mod providers;

pub use providers::{BagOfWordsEmbeddings, FailingEmbeddings, ScriptedChat};
