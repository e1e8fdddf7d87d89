//! Keeps clang-formatted code clang-formatted.
//!
//! Two tools live here: `apply-format`, which formats only the lines you
//! changed and shows or applies the result, and a git pre-commit hook that
//! stops badly formatted staged content and offers to fix it before the
//! commit is created.
pub mod builders;
pub mod core;
pub mod utils;

#[cfg(test)]
mod tests;
