//! # Tree Snapshots
//!
//! Helpers for looking at a finished tree.
//!
//! ## Modules
//!
//! - **`outline`**: stable, indented text rendering of a tree, used by
//!   inline snapshot tests and the CLI
//! - **`invariants`**: structural checks a normalized, finalized tree must pass

pub mod invariants;
pub mod outline;

pub use invariants::{Violation, violations};
pub use outline::outline;
