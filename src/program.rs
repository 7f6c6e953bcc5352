//! The compiled, immutable [`Program`] and the matcher that walks it.
//!
//! A `Program` owns (or borrows) the serialized byte image produced by
//! [`crate::internal::serializer::serialize`] and offers the style-parameterised
//! entry points described by the matcher design: `check`, `match_at`, `scan`/
//! `search`, `replace`, `match_all`, plus a [`StatefulMatcher`] for byte-at-a-time
//! stepping. None of these mutate the program; any number of them may run
//! concurrently against the same `Program` on different threads.

use std::sync::Arc;

use crate::errors::Result;
use crate::internal::serializer::{check_header, leader_bytes, read_entry, read_transition, Header};
use crate::outcome::Outcome;
use crate::style::Style;

/// How a [`Program`]'s serialized byte image is owned.
///
/// Mirrors the source's four ownership variants for the serialized buffer: an
/// owned growable copy, an owned fixed-size allocation released as a unit, a
/// reference-counted allocation shared across clones, or a buffer whose lifetime
/// outlives the program entirely (e.g. `include_bytes!`).
#[derive(Debug, Clone)]
enum ProgramBuf {
    /// An owned, heap-allocated copy produced by this crate's own compiler.
    Owned(Vec<u8>),
    /// A reference-counted allocation, cheaply cloned across threads.
    Shared(Arc<[u8]>),
    /// A buffer with `'static` lifetime, never copied or freed by this crate.
    Static(&'static [u8]),
}

impl ProgramBuf {
    fn as_slice(&self) -> &[u8] {
        match self {
            ProgramBuf::Owned(v) => v,
            ProgramBuf::Shared(s) => s,
            ProgramBuf::Static(s) => s,
        }
    }
}

/// A compiled, validated, immutable scanning program: a minimised DFA serialized
/// into the byte format described in the crate's external interface (§6.1).
///
/// `Program` is `Send + Sync`: once built it is read-only, so any number of
/// matcher calls may run concurrently against one instance without coordination.
#[derive(Debug, Clone)]
pub struct Program {
    buf: ProgramBuf,
    header: Header,
}

impl Program {
    /// Validate and wrap a freshly serialized byte image. Used internally by
    /// [`crate::compiler::CompilerBuilder::compile`]; the buffer is assumed to
    /// have just come out of [`crate::internal::serializer::serialize`], but is
    /// still validated like any other input.
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = check_header(&bytes)?;
        Ok(Program {
            buf: ProgramBuf::Owned(bytes),
            header,
        })
    }

    /// Wrap a serialized image that is already behind a reference-counted
    /// allocation, e.g. one loaded once and handed out to many worker threads.
    pub fn from_shared(bytes: Arc<[u8]>) -> Result<Self> {
        let header = check_header(&bytes)?;
        Ok(Program {
            buf: ProgramBuf::Shared(bytes),
            header,
        })
    }

    /// Wrap a serialized image with `'static` lifetime, e.g. one embedded with
    /// `include_bytes!` at compile time. No copy is made.
    pub fn from_static(bytes: &'static [u8]) -> Result<Self> {
        let header = check_header(bytes)?;
        Ok(Program {
            buf: ProgramBuf::Static(bytes),
            header,
        })
    }

    fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// The raw serialized byte image, e.g. to persist it or hand it to another
    /// process. How that buffer reaches disk is outside this crate's scope.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes()
    }

    /// Number of states in the serialized table.
    pub fn state_count(&self) -> u32 {
        self.header.state_cnt
    }

    /// The fixed leader prefix (in equivalence-class space), if any.
    fn leader(&self) -> &[u8] {
        leader_bytes(self.bytes(), &self.header)
    }

    /// Anchored match, returning only the winning result (or `0`). Equivalent to
    /// `self.match_at(input, Style::default()).result`.
    pub fn check(&self, input: &[u8]) -> u32 {
        self.match_at(input, Style::default()).result
    }

    /// Anchored match: walk `input` from byte 0 under `style`, returning the
    /// winning `Outcome` (result `0` on no match).
    pub fn match_at(&self, input: &[u8], style: Style) -> Outcome {
        walk(self.bytes(), &self.header, input, style)
    }

    /// Like [`Program::match_at`], but when no match is found at the start of
    /// `input`, slide the anchor forward by one byte and try again. When
    /// `do_leader` is set and the program carries a non-empty leader prefix, each
    /// anchor position is first fast-rejected against the leader before a full
    /// walk is attempted.
    pub fn search(&self, input: &[u8], style: Style, do_leader: bool) -> Outcome {
        let leader = if do_leader { self.leader() } else { &[] };
        for start in 0..=input.len() {
            if !leader.is_empty() && !leader_matches(&self.header, leader, &input[start..]) {
                continue;
            }
            let outcome = walk(self.bytes(), &self.header, &input[start..], style);
            if outcome.is_match() {
                return Outcome {
                    result: outcome.result,
                    start: outcome.start + start,
                    end: outcome.end + start,
                };
            }
        }
        Outcome::fail()
    }

    /// Alias for [`Program::search`]; the original source exposed both names for
    /// the same sliding-anchor walk.
    pub fn scan(&self, input: &[u8], style: Style, do_leader: bool) -> Outcome {
        self.search(input, style, do_leader)
    }

    /// Slide a `search`-style walk over `input`, replacing every non-overlapping
    /// match with `repl` (verbatim, no capture-group substitution -- this crate
    /// reports no captures), copying everything else unchanged. Stops performing
    /// replacements after `max` matches; remaining input is still copied
    /// verbatim. `max == 0` means unlimited.
    pub fn replace(&self, input: &[u8], repl: &[u8], max: usize, style: Style) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut pos = 0usize;
        let mut done = 0usize;
        while pos < input.len() {
            if max != 0 && done >= max {
                break;
            }
            let outcome = walk(self.bytes(), &self.header, &input[pos..], style);
            if outcome.is_match() && outcome.end > outcome.start {
                out.extend_from_slice(repl);
                pos += outcome.end;
                done += 1;
            } else {
                out.push(input[pos]);
                pos += 1;
            }
        }
        out.extend_from_slice(&input[pos..]);
        out
    }

    /// Slide over `input` collecting every non-overlapping accepting window,
    /// each reported as an `Outcome`. Fixed to `Style::Tangent` regardless of
    /// any style the caller might otherwise have picked (Open Question 1, §9):
    /// the original source's `match_all` hard-codes this behaviour and this
    /// crate preserves it rather than guessing a more "consistent" design.
    pub fn match_all(&self, input: &[u8]) -> Vec<Outcome> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos < input.len() {
            let outcome = walk(self.bytes(), &self.header, &input[pos..], Style::Tangent);
            if outcome.is_match() && outcome.end > outcome.start {
                out.push(Outcome {
                    result: outcome.result,
                    start: outcome.start + pos,
                    end: outcome.end + pos,
                });
                pos += outcome.end.max(outcome.start + 1);
            } else {
                pos += 1;
            }
        }
        out
    }

    /// Begin a byte-at-a-time walk over this program, for callers that feed
    /// input incrementally rather than as one buffer.
    pub fn stateful(&self) -> StatefulMatcher<'_> {
        StatefulMatcher::new(self)
    }
}

/// Check whether `input` begins, byte for byte (through the equivalence map),
/// with the already-class-translated `leader` prefix.
fn leader_matches(header: &Header, leader: &[u8], input: &[u8]) -> bool {
    if input.len() < leader.len() {
        return false;
    }
    input
        .iter()
        .zip(leader.iter())
        .all(|(&b, &class)| header.equiv_map[b as usize] == class)
}

/// One step of the walk: the byte offset reached and whatever result/dead-end
/// flag its record carries.
struct Step {
    off: usize,
    result: u32,
    dead_end: bool,
}

/// Walk `input` from the initial state, under `style`, and return the winning
/// `Outcome`. This is the single per-byte cycle every public entry point above
/// reduces to; it never decodes more than the equivalence-class lookup and one
/// transition-table read per byte.
fn walk(bytes: &[u8], header: &Header, input: &[u8], style: Style) -> Outcome {
    let (result0, dead0) = read_entry(bytes, header, header.initial_off as usize);
    // trajectory[i] is the result (0 if none) of the state reached after
    // consuming i bytes of input; trajectory[0] is the initial state itself.
    let mut trajectory: Vec<u32> = Vec::with_capacity(input.len() + 1);
    trajectory.push(result0);
    let mut departed_at: Option<usize> = None;
    let mut consumed_all = true;

    if !dead0 {
        let mut step = Step {
            off: header.initial_off as usize,
            result: result0,
            dead_end: dead0,
        };
        for (i, &b) in input.iter().enumerate() {
            let class = header.equiv_map[b as usize];
            let next_off = read_transition(bytes, header, step.off, class);
            if departed_at.is_none() && next_off != header.initial_off as usize {
                departed_at = Some(i);
            }
            let (result, dead_end) = read_entry(bytes, header, next_off);
            trajectory.push(result);
            step = Step {
                off: next_off,
                result,
                dead_end,
            };
            if step.dead_end {
                consumed_all = i + 1 == input.len();
                break;
            }
        }
    } else {
        consumed_all = input.is_empty();
    }

    select_outcome(style, &trajectory, departed_at, consumed_all, input.len())
}

/// Apply one of the five match styles (§4.9) to a fully-walked trajectory.
fn select_outcome(
    style: Style,
    trajectory: &[u32],
    departed_at: Option<usize>,
    consumed_all: bool,
    input_len: usize,
) -> Outcome {
    let start = departed_at.unwrap_or(0);
    match style {
        Style::Instant => match trajectory.iter().position(|&r| r != 0) {
            Some(end) => Outcome {
                result: trajectory[end],
                start,
                end,
            },
            None => Outcome::fail(),
        },
        Style::First => {
            let mut first: Option<u32> = None;
            let mut last_end = 0usize;
            for (end, &r) in trajectory.iter().enumerate() {
                if r == 0 {
                    continue;
                }
                match first {
                    None => {
                        first = Some(r);
                        last_end = end;
                    }
                    Some(r0) if r0 == r => last_end = end,
                    Some(_) => break,
                }
            }
            match first {
                Some(r) => Outcome {
                    result: r,
                    start,
                    end: last_end,
                },
                None => Outcome::fail(),
            }
        }
        Style::Tangent => {
            let first_accept = trajectory.iter().position(|&r| r != 0);
            match first_accept {
                Some(i0) => {
                    let mut end = i0;
                    let mut result = trajectory[i0];
                    let mut j = i0;
                    while j < trajectory.len() {
                        if trajectory[j] == 0 {
                            break;
                        }
                        result = trajectory[j];
                        end = j;
                        j += 1;
                    }
                    Outcome { result, start, end }
                }
                None => Outcome::fail(),
            }
        }
        Style::Last => {
            match trajectory
                .iter()
                .enumerate()
                .filter(|&(_, &r)| r != 0)
                .next_back()
            {
                Some((end, &result)) => Outcome { result, start, end },
                None => Outcome::fail(),
            }
        }
        Style::Full => {
            if consumed_all && trajectory.len() == input_len + 1 {
                let result = trajectory[input_len];
                if result != 0 {
                    return Outcome {
                        result,
                        start,
                        end: input_len,
                    };
                }
            }
            Outcome::fail()
        }
    }
}

/// Byte-at-a-time stepping over an already-compiled [`Program`], for callers
/// that cannot hand over the whole input buffer at once. State between calls is
/// entirely caller-owned (just this struct): the matcher itself still holds
/// nothing mutable beyond it.
pub struct StatefulMatcher<'a> {
    program: &'a Program,
    off: usize,
    result: u32,
    dead_end: bool,
}

impl<'a> StatefulMatcher<'a> {
    fn new(program: &'a Program) -> Self {
        let (result, dead_end) = read_entry(program.bytes(), &program.header, program.header.initial_off as usize);
        StatefulMatcher {
            program,
            off: program.header.initial_off as usize,
            result,
            dead_end,
        }
    }

    /// Feed one more byte. Returns the result (possibly `0`) of the state
    /// reached after consuming it; does nothing once the walk has already hit a
    /// dead end.
    pub fn advance(&mut self, byte: u8) -> u32 {
        if self.dead_end {
            return self.result;
        }
        let header = &self.program.header;
        let class = header.equiv_map[byte as usize];
        let next_off = read_transition(self.program.bytes(), header, self.off, class);
        let (result, dead_end) = read_entry(self.program.bytes(), header, next_off);
        self.off = next_off;
        self.result = result;
        self.dead_end = dead_end;
        result
    }

    /// The result of the most recently reached state.
    pub fn result(&self) -> u32 {
        self.result
    }

    /// Whether no further byte can ever change the result from here.
    pub fn is_dead_end(&self) -> bool {
        self.dead_end
    }

    /// Reset the walk back to the program's initial state.
    pub fn reset(&mut self) {
        *self = StatefulMatcher::new(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::Budget;
    use crate::compiler::CompilerBuilder;
    use crate::pattern::Flags;

    fn compile(patterns: &[(&str, u32)]) -> Program {
        let mut builder = CompilerBuilder::new().budget(Budget::unlimited());
        for &(p, r) in patterns {
            builder = builder.add(p, r, Flags::empty());
        }
        builder.compile().unwrap()
    }

    #[test]
    fn scenario_1_kleene_star_literal() {
        let program = compile(&[("ab*c", 1)]);
        assert_eq!(program.match_at(b"abbbc", Style::Last).result, 1);
    }

    #[test]
    fn scenario_2_and_3_tie_break_between_two_patterns() {
        let program = compile(&[("ab*c", 1), ("ca*b", 2)]);
        assert_eq!(program.match_at(b"bca", Style::Last).result, 0);
        assert_eq!(program.match_at(b"cab", Style::Last).result, 2);
    }

    #[test]
    fn scenario_4_and_5_full_style_requires_exact_consumption() {
        let program = compile(&[("a", 1), ("aa", 2), ("aaa", 3)]);
        assert_eq!(program.match_at(b"aaa", Style::Full).result, 3);
        assert_eq!(program.match_at(b"aaaa", Style::Full).result, 0);
    }

    #[test]
    fn scenario_6_instant_style_stops_at_first_accept() {
        let program = compile(&[("[0-9]+", 1)]);
        let outcome = program.match_at(b"0123456789", Style::Instant);
        assert_eq!(outcome.result, 1);
        assert_eq!((outcome.start, outcome.end), (0, 1));
    }

    #[test]
    fn scenario_7_tangent_style_prefers_longest_contiguous_accept() {
        let program = compile(&[("abc", 1), ("abcd", 2)]);
        let outcome = program.match_at(b"abcde", Style::Tangent);
        assert_eq!(outcome.result, 2);
        assert_eq!((outcome.start, outcome.end), (0, 4));
    }

    #[test]
    fn scenario_8_last_style_prefers_the_longer_of_two_overlapping_accepts() {
        let program = compile(&[("new", 1), ("new york", 2)]);
        let outcome = program.match_at(b"new york", Style::Last);
        assert_eq!(outcome.result, 2);
        assert_eq!((outcome.start, outcome.end), (0, 8));
    }

    #[test]
    fn first_style_stops_as_soon_as_the_result_changes() {
        let program = compile(&[("ab", 1), ("abc", 2)]);
        // "First" keeps extending while the result stays 1; at "abc" the result
        // becomes 2, a change, so First reports the shorter match.
        let outcome = program.match_at(b"abc", Style::First);
        assert_eq!(outcome.result, 1);
        assert_eq!(outcome.end, 2);
    }

    #[test]
    fn search_slides_the_anchor_forward() {
        let program = compile(&[("cat", 1)]);
        let outcome = program.search(b"a cat sat", Style::Last, false);
        assert_eq!(outcome.result, 1);
        assert_eq!((outcome.start, outcome.end), (2, 5));
    }

    #[test]
    fn search_with_leader_finds_the_same_match() {
        let program = compile(&[("cat", 1)]);
        let with_leader = program.search(b"a cat sat", Style::Last, true);
        let without_leader = program.search(b"a cat sat", Style::Last, false);
        assert_eq!(with_leader, without_leader);
    }

    #[test]
    fn replace_substitutes_every_non_overlapping_match() {
        let program = compile(&[("cat", 1)]);
        let out = program.replace(b"cat and cat", b"dog", 0, Style::Last);
        assert_eq!(out, b"dog and dog");
    }

    #[test]
    fn replace_stops_after_max_substitutions() {
        let program = compile(&[("cat", 1)]);
        let out = program.replace(b"cat and cat", b"dog", 1, Style::Last);
        assert_eq!(out, b"dog and cat");
    }

    #[test]
    fn match_all_reports_every_non_overlapping_window() {
        let program = compile(&[("ab", 1), ("cd", 2)]);
        let outcomes = program.match_all(b"abXcdab");
        let results: Vec<u32> = outcomes.iter().map(|o| o.result).collect();
        assert_eq!(results, vec![1, 2, 1]);
    }

    #[test]
    fn stateful_matcher_tracks_result_byte_by_byte() {
        let program = compile(&[("ab", 1)]);
        let mut m = program.stateful();
        assert_eq!(m.advance(b'a'), 0);
        assert_eq!(m.advance(b'b'), 1);
        assert_eq!(m.result(), 1);
    }

    #[test]
    fn empty_pattern_matches_empty_input_under_full_style() {
        let program = compile(&[]);
        assert_eq!(program.match_at(b"", Style::Full).result, 1);
    }
}
