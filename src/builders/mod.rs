// This file is the module declaration file for the `builders` module.
// It declares and makes public all the sub-modules within the `src/builders`
// directory. These modules hold the collaborators the gate is built from.

// `formatter` module:
// Defines the `Formatter` trait and `ClangFormat`, which runs the external
// formatter on a file's content and classifies its failures (a bad style
// configuration is reported apart from other errors).
pub mod formatter;

// `hooks` module:
// Installs and removes the `pre-commit` hook script in the hooks directory,
// telling our own hook apart from one written by something else.
pub mod hooks;

// `patch` module:
// Computes which lines changed between two versions of a file, and the
// `FormatPatch` between a file and its formatted version. A patch can be
// rendered as a unified diff or re-applied to a file that has drifted.
pub mod patch;

// `patterns` module:
// The ignore list (whole-path regular expressions read from
// `.clang-format-hook-ignore`) and the filter for formattable extensions.
pub mod patterns;

// `reporter` module:
// All the text shown to the person committing: patches, the list of files
// needing formatting, the decision prompt and its acknowledgements.
pub mod reporter;
