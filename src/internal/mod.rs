//! Internal implementation of the compile pipeline: scanner, parser, NFA,
//! subset construction, minimizer, and serializer. None of this is exposed
//! outside the crate; [`crate::compiler::CompilerBuilder`] and
//! [`crate::program::Program`] are the public surface built on top of it.

/// Generic, auto-growing bitset used both for character classes and for sets
/// of NFA state ids during subset construction.
pub(crate) mod bitset;

/// The minimised, serialization-ready DFA representation.
pub(crate) mod dfa;

/// Newtype id types for NFA states, DFA states, and minimizer blocks.
pub(crate) mod ids;

/// Hopcroft/Gries-style partition-refinement DFA minimization.
pub(crate) mod minimizer;

/// `MultiChar` bitsets over the byte alphabet plus synthetic end-marks.
pub(crate) mod multichar;

/// The epsilon-then-eliminate NFA representation and its builders.
pub(crate) mod nfa;

/// The regex/glob/exact pattern parser, built on top of [`scanner`].
pub(crate) mod parser;

/// Rabin-Scott subset construction from NFA to DFA.
pub(crate) mod powerset;

/// Hand-rolled byte scanner feeding the parser's recursive descent.
pub(crate) mod scanner;

/// Serializes a minimised DFA to and from the self-describing byte format.
pub(crate) mod serializer;

/// Tokens produced by the scanner and consumed by the parser.
pub(crate) mod token;
