//! Builder that drives the full pipeline: patterns in, a serialized [`Program`] out.

use crate::budget::Budget;
use crate::errors::Result;
use crate::format::Format;
use crate::internal::minimizer::minimize;
use crate::internal::parser::Parser;
use crate::internal::powerset::powerset_convert;
use crate::internal::serializer::serialize;
use crate::pattern::{Flags, PatternLanguage};
use crate::program::Program;
use crate::stats::CompileStats;

struct PendingPattern {
    language: PatternLanguage,
    text: String,
    result: u32,
    flags: Flags,
}

/// Accumulates patterns and compile-time configuration, then runs the full
/// scanner/parser/NFA/powerset/minimizer/serializer pipeline.
#[derive(Debug, Clone, Default)]
pub struct CompilerBuilder {
    budget: Option<Budget>,
    format: Format,
    patterns: Vec<PendingPatternRepr>,
}

// `PendingPattern` holds a `String`, which isn't `Copy`/`Default`-friendly for a
// derive; keep the public builder's Debug/Clone/Default derives simple by storing
// the same shape under a name that also derives cleanly.
#[derive(Debug, Clone)]
struct PendingPatternRepr {
    language: PatternLanguage,
    text: String,
    result: u32,
    flags: Flags,
}

impl From<PendingPattern> for PendingPatternRepr {
    fn from(p: PendingPattern) -> Self {
        PendingPatternRepr {
            language: p.language,
            text: p.text,
            result: p.result,
            flags: p.flags,
        }
    }
}

impl CompilerBuilder {
    /// A builder with no patterns, no budget, and automatic entry-width selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap how many NFA states and how deep parenthesis nesting this compilation
    /// may use.
    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Fix the serialized entry width instead of auto-selecting the smallest one
    /// that fits.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Add a pattern in the given language, tagged with `result`, honouring `flags`.
    pub fn add_as(
        mut self,
        language: PatternLanguage,
        pattern: impl Into<String>,
        result: u32,
        flags: Flags,
    ) -> Self {
        self.patterns.push(
            PendingPattern {
                language,
                text: pattern.into(),
                result,
                flags,
            }
            .into(),
        );
        self
    }

    /// Add a full-syntax regex pattern with explicit flags.
    pub fn add(self, pattern: impl Into<String>, result: u32, flags: Flags) -> Self {
        self.add_as(PatternLanguage::Regex, pattern, result, flags)
    }

    /// Add a full-syntax regex pattern, inferring loose-start/loose-end/ignore-case
    /// from leading/trailing anchors.
    pub fn add_auto(self, pattern: impl Into<String>, result: u32) -> Self {
        self.add_as(PatternLanguage::RegexAuto, pattern, result, Flags::empty())
    }

    /// Add a shell-glob pattern (`*`, `?`, `[...]`).
    pub fn add_glob(self, pattern: impl Into<String>, result: u32, flags: Flags) -> Self {
        self.add_as(PatternLanguage::Glob, pattern, result, flags)
    }

    /// Add a literal pattern, matched byte for byte with no metacharacters.
    pub fn add_exact(self, text: impl Into<String>, result: u32, flags: Flags) -> Self {
        self.add_as(PatternLanguage::Exact, text, result, flags)
    }

    /// Run the pipeline and produce a serialized, ready-to-match [`Program`].
    pub fn compile(self) -> Result<Program> {
        self.compile_inner(None)
    }

    /// Same as [`CompilerBuilder::compile`], additionally filling in `stats` with
    /// per-stage size instrumentation.
    pub fn compile_with_stats(self, stats: &mut CompileStats) -> Result<Program> {
        self.compile_inner(Some(stats))
    }

    fn compile_inner(self, mut stats: Option<&mut CompileStats>) -> Result<Program> {
        let mut parser = Parser::new(self.budget);
        for pattern in &self.patterns {
            parser.add_as(pattern.language, &pattern.text, pattern.result, pattern.flags)?;
            if let Some(s) = stats.as_deref_mut() {
                s.num_patterns += 1;
            }
        }
        if let Some(s) = stats.as_deref_mut() {
            s.num_tokens = parser.tokens_scanned();
        }
        let (nfa, initial, orig_nfa_states) = parser.finish()?;
        if let Some(s) = stats.as_deref_mut() {
            s.orig_nfa_states = orig_nfa_states;
            s.useful_nfa_states = nfa.len() as u64;
        }

        let dfa = powerset_convert(&nfa, initial, stats.as_deref_mut())?;
        let dfa = minimize(dfa, stats.as_deref_mut())?;
        let leader = dfa.compute_leader();
        let bytes = serialize(&dfa, &leader, self.format, stats)?;
        Program::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_single_pattern() {
        let program = CompilerBuilder::new()
            .add("ab*c", 1, Flags::empty())
            .compile()
            .unwrap();
        assert_eq!(program.check(b"ac"), 1);
        assert_eq!(program.check(b"abbbc"), 1);
        assert_eq!(program.check(b"x"), 0);
    }

    #[test]
    fn compiles_with_explicit_format_and_stats() {
        let mut stats = CompileStats::default();
        let program = CompilerBuilder::new()
            .format(Format::Width4)
            .add("a", 1, Flags::empty())
            .compile_with_stats(&mut stats)
            .unwrap();
        assert_eq!(program.check(b"a"), 1);
        assert!(stats.serialized_bytes > 0);
        assert_eq!(stats.num_patterns, 1);
        assert!(stats.num_tokens > 0);
    }

    #[test]
    fn stats_distinguish_orig_from_useful_nfa_states() {
        let mut stats = CompileStats::default();
        CompilerBuilder::new()
            .add("(ab|ac)", 1, Flags::empty())
            .compile_with_stats(&mut stats)
            .unwrap();
        assert!(stats.orig_nfa_states >= stats.useful_nfa_states);
    }

    #[test]
    fn empty_compiler_matches_only_empty_string() {
        let program = CompilerBuilder::new().compile().unwrap();
        assert_eq!(program.check(b""), 1);
        assert_eq!(program.check(b"x"), 0);
    }
}
