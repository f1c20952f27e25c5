#![deny(missing_docs)]
//! Batchfetch API contains the orchestration traits and the basic types
//! required to define the api of those traits.
//!
//! A batch is one invocation of an [orchestrator::Orchestrator] over a list
//! of [Key]s. The orchestrator drives one [fetch::Fetcher::fetch_one] call
//! per key, deposits completed [Entity]s into a [sink::Sink], and reports
//! everything that happened in a [BatchResult].
//!
//! If you want the actual strategy implementations, please see the
//! batchfetch_core crate.

/// Boxed future type.
pub type BoxFut<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub mod builder;
pub mod config;
pub mod doc;
pub mod fetch;
pub mod orchestrator;
pub mod progress;
pub mod sink;

mod batch;
pub use batch::*;

mod cancel;
pub use cancel::*;

mod error;
pub use error::*;

pub mod id;
pub use id::{Entity, Key};

mod outcome;
pub use outcome::*;

mod strategy;
pub use strategy::*;
