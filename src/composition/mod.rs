//! # Composition
//!
//! Selection, budgeting and the run orchestrator that ties the media layer
//! together into one finished compilation.

pub mod budget;
pub mod engine;
pub mod selector;

// Re-exports for convenience
pub use budget::{BudgetReport, DurationBudgeter};
pub use engine::CompilationEngine;
pub use selector::{select, Selection};
