// This file is the module declaration file for the `core` module.
// It declares the submodules of `src/core/` and exposes them to the rest of
// the crate.

// `apply` module:
// The `apply-format` helper and the pieces it shares with the gate:
// formatting the changed lines of a file into a `FileFix` and carrying a
// staged fix over to the working tree.
pub mod apply;

// `config` module:
// Reads the gate configuration (interactive switch and style) from git
// configuration, and the ignore list from the work tree.
pub mod config;

// `engine` module:
// The pre-commit format gate itself: verdicts, the single decision prompt,
// and applying, forcing or cancelling.
pub mod engine;

// `error` module:
// `GateError`, the error type shared by the whole library.
pub mod error;

// `git` module:
// The `GitClient` trait over the staging area and its `git2` implementation.
pub mod git;
