//! Client side of the hosted assistant service: backends, the per-prompt
//! session driver, scoped assistants, and document registration.

pub mod document;
pub mod lease;
pub mod providers;
pub mod session;

pub use document::{DocumentRegistrar, RegisteredDocument};
pub use lease::with_assistant;
pub use providers::{OpenAiAssistants, Reply, ScriptCall, ScriptedBackend};
pub use session::SessionDriver;
