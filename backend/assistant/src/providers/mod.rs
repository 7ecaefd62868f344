pub mod mock;
pub mod openai;

pub use mock::{Reply, ScriptCall, ScriptedBackend};
pub use openai::OpenAiAssistants;
