#![forbid(missing_docs)]
//! # `red`
//! A small, dependency-light regex compiler and matcher.
//!
//! Patterns are compiled ahead of time through [`CompilerBuilder`] into a
//! minimised DFA, serialized into a compact, self-describing byte image, and
//! matched through [`Program`] with one of five match [`Style`]s. Multiple
//! patterns can share one compiled [`Program`]; each carries its own `result`
//! tag so a successful match reports which pattern won.
//!
//! The pipeline is scanner -> parser -> NFA -> subset construction -> DFA
//! minimisation -> serialization, the same shape a hand-written lexer
//! generator takes, just built at runtime instead of at code-gen time.

/// Module with error definitions.
mod errors;
pub use errors::{RedError, RedErrorKind, Result};

/// Module with the compile-time resource budget.
mod budget;
pub use budget::Budget;

/// Module with the pattern compiler and its builder.
mod compiler;
pub use compiler::CompilerBuilder;

/// Module with the serialized entry-width selector.
mod format;
pub use format::Format;

/// The module with internal implementation details (scanner, parser, NFA,
/// subset construction, minimizer, serializer).
mod internal;

/// Module that provides the match `Outcome` type.
mod outcome;
pub use outcome::Outcome;

/// Module that provides pattern flags and pattern languages.
mod pattern;
pub use pattern::{Flags, PatternLanguage};

/// Module with the compiled, matchable `Program`.
mod program;
pub use program::{Program, StatefulMatcher};

/// Module with per-stage compilation instrumentation.
mod stats;
pub use stats::CompileStats;

/// Module with the match style enum.
mod style;
pub use style::Style;
