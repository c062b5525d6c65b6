//! Multi-step tool-calling analysis agent.
//!
//! The crate turns one natural-language analysis request into a bounded
//! sequence of model calls and tool invocations and assembles the final
//! answer, an optional chart specification, a step trace, and token totals.
//! Transport to callers (HTTP or otherwise) is out of scope; the binary
//! exposes the same operations on the command line.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod testing;
pub mod tools;

pub use error::Error;
