//! Property-based tests for pipeline invariants

mod template;
mod validation;
