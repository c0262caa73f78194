//! Request orchestration.
//!
//! [`PipelineOrchestrator`] composes the rate limiter and the three
//! cache tiers into the end-to-end flow:
//!
//! ```text
//! request ──► ADMIT ──► L1 ──hit──────────────────────────► FINALIZE
//!               │        │miss
//!               │        ▼
//!               │       L2 ──miss──► embed() ──► L2.put
//!               │        │
//!               │        ▼
//!               │       L3 ──miss──► search() ──► L3.put
//!               │        │
//!               │        ▼
//!               │    fetch_chunks() ──► GENERATE ──► STORE_L1
//!               │                                        │
//!               └──denied──► retry-after                 ▼
//!                                                    FINALIZE
//! ```
//!
//! Built via [`Heimdall::builder()`](crate::Heimdall::builder).

mod builder;
mod context;
mod orchestrator;

pub use builder::{Heimdall, HeimdallBuilder};
pub use orchestrator::PipelineOrchestrator;
