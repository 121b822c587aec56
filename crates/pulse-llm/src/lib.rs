//! pulse-llm — remote text-completion abstraction.
//! One trait, four providers, a retry wrapper and a factory that wires them.

pub mod backend;
pub mod factory;
pub mod retry;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use factory::{build_backend, BackendConfig, BackendKind};
pub use retry::{RetryPolicy, RetryingBackend};
