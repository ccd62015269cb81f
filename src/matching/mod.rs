//! Record scoring and best-candidate selection.
//!
//! This module provides the matching half of the engine:
//!
//! - [`Matcher`]: scores a pair of records under a static rule set
//! - [`Score`]: aggregate value plus per-rule similarities
//! - [`TopN`]: bounded, group-deduplicating best-candidate accumulator
//! - [`FunctionRegistry`] / [`MatcherConfig`]: declarative rule sets that name
//!   their gate and similarity functions
//!
//! ## Scoring Algorithm
//!
//! Rules are evaluated in a fixed order, and the first failing step returns a zero
//! score without evaluating anything after it:
//!
//! 1. **must**: every listed field is exactly equal on both records
//! 2. **either**: at least one listed field is exactly equal
//! 3. **sequential**: gate predicates, evaluated in order
//! 4. **should**: weighted similarities, combined as a power product
//!
//! The `should` aggregate is
//!
//! ```text
//! score = Π (stone_geary + (1 - stone_geary) * sim_i) ^ weight_i
//! ```
//!
//! Weights are independent exponents and are never normalized. The Stone-Geary
//! floor keeps a single zero-similarity field from zeroing the whole product.

pub mod config;
pub mod matcher;
pub mod registry;
pub mod scoring;
pub mod similarity;
pub mod topn;

pub use config::MatcherConfig;
pub use matcher::{MatchError, Matcher, MatcherBuilder};
pub use registry::FunctionRegistry;
pub use scoring::Score;
pub use topn::TopN;
