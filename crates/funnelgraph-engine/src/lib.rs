//! Funnelgraph calculation engine
//!
//! Given a declarative funnel definition with no observed data, the engine
//! synthesizes plausible per-step population counts using bounded, decaying
//! conversion-rate heuristics, allocates each step's population across its
//! split variations so the parts reconcile exactly to the whole, and builds
//! a validated directed flow graph (entry -> steps -> splits -> exit) for
//! any graph-visualization front end.
//!
//! The engine is a pure, synchronous computation: no I/O, no shared state
//! across calls. Randomness is injected via a seedable generator so tests
//! can assert exact outputs.

pub mod error;
pub mod services;
pub mod store;

pub use services::engine::FunnelEngine;
pub use store::{FunnelStore, InMemoryFunnelStore, StoredFunnel};
