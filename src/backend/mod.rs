//! Backend adapters and resilient invocation
//!
//! Provides adapters for OpenAI-compatible, Anthropic and Gemini APIs, a
//! transport seam over reqwest, and an invoker that adds timeouts, retries
//! and rate-limit backoff.
//!
//! # Example
//!
//! ```ignore
//! use quiz_mux::backend::{BackendAdapter, ReqwestTransport, ResilientInvoker, RetryPolicy};
//!
//! let invoker = ResilientInvoker::new(Arc::new(ReqwestTransport::new()), RetryPolicy::default());
//! let request = adapter.build_request(&prompt)?;
//! let response = invoker.invoke(adapter.name(), &request).await?;
//! let text = adapter.parse_response(&response.body)?;
//! ```

mod adapter;
mod anthropic;
mod gemini;
mod openai_compat;
mod registry;
mod retry;
mod transport;
mod types;

pub use adapter::{AdapterSettings, BackendAdapter};
pub(crate) use adapter::text_at;
pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai_compat::OpenAiCompatBackend;
pub use registry::{backends_from_env, build_backends, create_adapter};
pub use retry::ResilientInvoker;
pub use transport::{HttpReply, ReqwestTransport, Transport};
pub use types::{BackendError, RawResponse, RequestConfig, RetryPolicy};
