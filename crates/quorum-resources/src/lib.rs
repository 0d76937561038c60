//! quorum-resources — offer matching for the Quorum framework.
//!
//! The cluster resource manager presents offers: bundles of CPU, memory,
//! disk and port ranges on one agent. This crate decides whether an offer
//! can host a node and carves out exactly what the node needs.
//!
//! # Components
//!
//! - **`types`** — `Resource`, ranges, reservation and volume metadata
//! - **`ports`** — range codec and randomized port allocation
//! - **`scalar`** — first-match scalar fit checks and debits
//! - **`reservation`** — reserved / unreserved classification, re-declaration
//! - **`offer`** — `OfferEvaluator` composing the above
//!
//! Everything here is synchronous and side-effect free on its inputs;
//! evaluations work on copies of the offer.

pub mod error;
pub mod offer;
pub mod ports;
pub mod reservation;
pub mod scalar;
pub mod types;

pub use error::{ResourceError, ResourceResult};
pub use offer::{Allocation, NodeRequest, OfferEvaluator, OfferMatch, Rejection};
pub use ports::{PortAllocator, PortSplit, iter_ports, port_resource_will_fit, to_ports, to_ranges};
pub use scalar::{ScalarShortfall, debit, debit_all, will_fit, will_fit_all};
pub use types::*;
