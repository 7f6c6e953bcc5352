//! Recursive-descent parser: turns a token stream into an ε-free NFA fragment.
//!
//! Grammar (lowest to highest precedence):
//! ```text
//! expr   := part ( '|' part )*
//! part   := multi multi*
//! multi  := unit ( closure )?
//! unit   := '(' expr ')' | chars | ε
//! ```

use log::trace;

use super::ids::NfaId;
use super::multichar::{self, MultiChar};
use super::nfa::Nfa;
use super::scanner::Scanner;
use super::token::{Token, TokEnum, INFINITE};
use crate::budget::Budget;
use crate::errors::{RedError, Result};
use crate::pattern::{Flags, PatternLanguage};

/// The largest pattern result this crate will assign; kept well under `u32::MAX`
/// so the serializer always has room for the dead-end flag bit even at width 1.
pub(crate) const MAX_RESULT: u32 = 0x7fff_ffff;

/// Builds a multi-pattern NFA one `add*` call at a time.
pub(crate) struct Parser {
    pub(crate) nfa: Nfa,
    shared_start: Option<NfaId>,
    budget: Option<Budget>,
    paren_depth: u32,
    patterns_added: u32,
    tokens_scanned: u64,
}

impl Parser {
    /// A parser with no patterns added yet.
    pub(crate) fn new(budget: Option<Budget>) -> Self {
        Parser {
            nfa: Nfa::new(),
            shared_start: None,
            budget,
            paren_depth: 0,
            patterns_added: 0,
            tokens_scanned: 0,
        }
    }

    /// Total tokens scanned across every pattern added so far.
    pub(crate) fn tokens_scanned(&self) -> u64 {
        self.tokens_scanned
    }

    /// Scan the next token, transparently absorbing any `\i` `Flags` marker
    /// wherever it appears in the stream and folding it into `flags`.
    fn next_token(&mut self, sc: &mut Scanner, flags: &mut Flags) -> Result<Token> {
        loop {
            let tok = sc.scan_one()?;
            self.tokens_scanned += 1;
            if tok.kind == TokEnum::Flags {
                *flags |= Flags::IGNORE_CASE;
                continue;
            }
            return Ok(tok);
        }
    }

    /// The shared initial state built up so far, if any pattern has been added.
    pub(crate) fn start(&self) -> Option<NfaId> {
        self.shared_start
    }

    fn check_state_budget(&self) -> Result<()> {
        if let Some(b) = self.budget {
            if let Some(max) = b.max_states {
                if self.nfa.len() as u64 > max as u64 {
                    return Err(RedError::limit(format!(
                        "nfa state budget of {} exceeded",
                        max
                    )));
                }
            }
        }
        Ok(())
    }

    fn take_paren(&mut self) -> Result<()> {
        self.paren_depth += 1;
        if let Some(b) = self.budget {
            if let Some(max) = b.max_paren_depth {
                if self.paren_depth > max {
                    return Err(RedError::limit(format!(
                        "parenthesis nesting depth of {} exceeded",
                        max
                    )));
                }
            }
        }
        Ok(())
    }

    fn give_paren(&mut self) {
        self.paren_depth -= 1;
    }

    /// Add a regex pattern with explicit flags, tagged with `result`.
    pub(crate) fn add(&mut self, pattern: &str, result: u32, flags: Flags) -> Result<()> {
        self.add_inner(pattern, result, flags)
    }

    /// Add a regex pattern, inferring `LOOSE_START`/`LOOSE_END`/`IGNORE_CASE` from
    /// leading/trailing anchors and a leading `\i`, per the `add_auto` heuristic.
    pub(crate) fn add_auto(&mut self, pattern: &str, result: u32) -> Result<()> {
        let mut flags = Flags::LOOSE_START | Flags::LOOSE_END;
        let mut body = pattern;

        if let Some(rest) = body.strip_prefix("\\i") {
            flags |= Flags::IGNORE_CASE;
            body = rest;
        }
        if let Some(rest) = body.strip_prefix('^') {
            flags -= Flags::LOOSE_START;
            body = rest;
        } else if let Some(rest) = body.strip_prefix(".*") {
            flags |= Flags::LOOSE_START;
            body = rest;
        }
        if let Some(rest) = body.strip_suffix('$') {
            flags -= Flags::LOOSE_END;
            body = rest;
        } else if let Some(rest) = body.strip_suffix(".*") {
            flags |= Flags::LOOSE_END;
            body = rest;
        }
        self.add_inner(body, result, flags)
    }

    /// Dispatch to the requested pattern language.
    pub(crate) fn add_as(
        &mut self,
        language: PatternLanguage,
        input: &str,
        result: u32,
        flags: Flags,
    ) -> Result<()> {
        match language {
            PatternLanguage::Regex => self.add(input, result, flags),
            PatternLanguage::RegexAuto => self.add_auto(input, result),
            PatternLanguage::Glob => self.add_glob(input, result, flags),
            PatternLanguage::Exact => self.add_exact(input, result, flags),
        }
    }

    fn validate_result(result: u32) -> Result<()> {
        if result == 0 {
            return Err(RedError::api("pattern result must be positive"));
        }
        if result > MAX_RESULT {
            return Err(RedError::api("pattern result is too large"));
        }
        Ok(())
    }

    fn add_inner(&mut self, pattern: &str, result: u32, flags: Flags) -> Result<()> {
        Self::validate_result(result)?;
        trace!("parser::add result={} pattern={:?}", result, pattern);
        let mut scanner = Scanner::new(pattern);
        let mut flags = flags;
        let mut tok = self.next_token(&mut scanner, &mut flags)?;
        let frag = self.parse_expr(&mut scanner, &mut tok, result, &mut flags)?;
        if tok.kind != TokEnum::End {
            return Err(RedError::parse(tok.pos, "trailing input after pattern"));
        }
        self.finish_fragment(frag, result, flags)?;
        self.patterns_added += 1;
        Ok(())
    }

    fn finish_fragment(&mut self, frag: (NfaId, NfaId), result: u32, flags: Flags) -> Result<()> {
        let mut frag = frag;
        if flags.contains(Flags::IGNORE_CASE) {
            // Case-folding is applied per-pattern, but our arena is shared across
            // patterns; fold only the transitions reachable from this fragment.
            self.fold_case_reachable(frag.0);
        }
        if flags.contains(Flags::LOOSE_START) {
            frag = self.nfa.apply_start_wild(frag);
        }
        if flags.contains(Flags::LOOSE_END) {
            frag = self.nfa.apply_end_wild(frag);
        }
        frag = self.nfa.apply_end_mark(frag, result);
        self.check_state_budget()?;
        self.shared_start = Some(self.nfa.self_union(self.shared_start, frag));
        Ok(())
    }

    fn fold_case_reachable(&mut self, start: NfaId) {
        let ids: Vec<NfaId> = self.nfa.bfs_from(start).collect();
        for id in ids {
            let state = self.nfa.state_mut(id);
            for tr in state.transitions.iter_mut() {
                tr.chars = multichar::fold_ascii_case(&tr.chars);
            }
        }
    }

    /// Finalize the parser: if nothing was ever added, install the trivial
    /// "matches the empty string" pattern with result 1. Returns the finished
    /// arena together with its initial state id and the state count immediately
    /// after epsilon elimination but before `drop_useless_transitions`, since
    /// `self` is consumed here and [`Parser::initial`] can no longer be called
    /// afterwards.
    pub(crate) fn finish(mut self) -> Result<(Nfa, NfaId, u64)> {
        if self.shared_start.is_none() {
            let empty = self.nfa.new_state();
            self.nfa.state_mut(empty).result = 1;
            self.shared_start = Some(empty);
        }
        let start = self.shared_start.unwrap();
        self.nfa.eliminate_epsilons();
        let orig_nfa_states = self.nfa.len() as u64;
        self.nfa.drop_useless_transitions(start);
        trace!(
            "parser::finish patterns={} orig_nfa_states={} useful_nfa_states={}",
            self.patterns_added,
            orig_nfa_states,
            self.nfa.len()
        );
        Ok((self.nfa, start, orig_nfa_states))
    }

    /// The shared start state id, valid after at least one `add*` call or `finish`.
    pub(crate) fn initial(&self) -> NfaId {
        self.shared_start.expect("no pattern added yet")
    }

    // --- regex grammar -------------------------------------------------

    fn parse_expr(
        &mut self,
        sc: &mut Scanner,
        tok: &mut Token,
        goal: u32,
        flags: &mut Flags,
    ) -> Result<(NfaId, NfaId)> {
        let mut frag = self.parse_part(sc, tok, goal, flags)?;
        while tok.kind == TokEnum::Union {
            *tok = self.next_token(sc, flags)?;
            let rhs = self.parse_part(sc, tok, goal, flags)?;
            frag = self.nfa.union(frag, rhs);
        }
        Ok(frag)
    }

    fn parse_part(
        &mut self,
        sc: &mut Scanner,
        tok: &mut Token,
        goal: u32,
        flags: &mut Flags,
    ) -> Result<(NfaId, NfaId)> {
        let mut frag = self.parse_multi(sc, tok, goal, flags)?;
        while matches!(
            tok.kind,
            TokEnum::Chars | TokEnum::Left
        ) {
            let rhs = self.parse_multi(sc, tok, goal, flags)?;
            frag = self.nfa.concat(frag, rhs);
        }
        Ok(frag)
    }

    fn parse_multi(
        &mut self,
        sc: &mut Scanner,
        tok: &mut Token,
        goal: u32,
        flags: &mut Flags,
    ) -> Result<(NfaId, NfaId)> {
        let mut frag = self.parse_unit(sc, tok, goal, flags)?;
        if tok.kind == TokEnum::Closure {
            let (min, max) = (tok.min, tok.max);
            *tok = self.next_token(sc, flags)?;
            frag = self.apply_closure(frag, min, max);
        }
        Ok(frag)
    }

    fn apply_closure(&mut self, frag: (NfaId, NfaId), min: u32, max: u32) -> (NfaId, NfaId) {
        match (min, max) {
            (0, m) if m == INFINITE => self.nfa.kleene_star(frag),
            (1, m) if m == INFINITE => self.nfa.closure_one_or_more(frag),
            (0, 1) => self.nfa.optional(frag),
            (min, max) => {
                let template = frag;
                let mut build_copy = |nfa: &mut Nfa| Self::deep_copy_fragment(nfa, template);
                self.nfa.closure(&mut build_copy, min, max)
            }
        }
    }

    /// Deep-copy a fragment (used to materialise independent repeats for bounded
    /// closures), preserving internal cycles via an id -> id map.
    fn deep_copy_fragment(nfa: &mut Nfa, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        use std::collections::HashMap;
        let (start, end) = frag;
        let order: Vec<NfaId> = nfa.bfs_from(start).collect();
        let mut mapping: HashMap<u32, NfaId> = HashMap::new();
        for &id in &order {
            mapping.insert(id.id(), nfa.new_state());
        }
        for &id in &order {
            let dst = mapping[&id.id()];
            let result = nfa.state(id).result;
            nfa.state_mut(dst).result = result;
            let transitions = nfa.state(id).transitions.clone();
            for tr in transitions {
                let dst_next = mapping[&tr.next.id()];
                nfa.state_mut(dst)
                    .transitions
                    .push(super::nfa::NfaTransition {
                        next: dst_next,
                        chars: tr.chars,
                    });
            }
            let epsilons = nfa.state(id).epsilons.clone();
            for eps in epsilons {
                let dst_eps = mapping[&eps.id()];
                nfa.add_epsilon(dst, dst_eps);
            }
        }
        (mapping[&start.id()], mapping[&end.id()])
    }

    fn parse_unit(
        &mut self,
        sc: &mut Scanner,
        tok: &mut Token,
        goal: u32,
        flags: &mut Flags,
    ) -> Result<(NfaId, NfaId)> {
        match tok.kind {
            TokEnum::Left => {
                self.take_paren()?;
                *tok = self.next_token(sc, flags)?;
                let frag = if matches!(tok.kind, TokEnum::Right) {
                    let empty = self.nfa.new_state();
                    (empty, empty)
                } else {
                    self.parse_expr(sc, tok, goal, flags)?
                };
                if tok.kind != TokEnum::Right {
                    return Err(RedError::parse(tok.pos, "expected ')'"));
                }
                self.give_paren();
                *tok = self.next_token(sc, flags)?;
                Ok(frag)
            }
            TokEnum::Chars => {
                let chars = tok.chars.clone();
                *tok = self.next_token(sc, flags)?;
                Ok(self.nfa.build_chars(chars))
            }
            TokEnum::Error => Err(RedError::parse(tok.pos, tok.msg.clone())),
            _ => {
                // empty unit: matches the empty string
                let empty = self.nfa.new_state();
                Ok((empty, empty))
            }
        }
    }

    // --- glob / exact pattern languages ---------------------------------

    /// Shell-glob pattern: `*` wildcard, `?` any byte, `[...]`/`[^...]`/`[!...]` classes.
    fn add_glob(&mut self, pattern: &str, result: u32, flags: Flags) -> Result<()> {
        Self::validate_result(result)?;
        trace!("parser::add_glob result={} pattern={:?}", result, pattern);
        let bytes = pattern.as_bytes();
        let mut i = 0usize;
        let mut frag: Option<(NfaId, NfaId)> = None;
        while i < bytes.len() {
            let piece = match bytes[i] {
                b'*' => {
                    i += 1;
                    let wild = self.nfa.build_chars(multichar::any_byte());
                    self.nfa.kleene_star(wild)
                }
                b'?' => {
                    i += 1;
                    self.nfa.build_chars(multichar::any_byte())
                }
                b'[' => {
                    let (mc, next_i) = Self::scan_glob_class(bytes, i)?;
                    i = next_i;
                    self.nfa.build_chars(mc)
                }
                b => {
                    i += 1;
                    self.nfa.build_chars(multichar::single_byte(b))
                }
            };
            frag = Some(match frag {
                None => piece,
                Some(acc) => self.nfa.concat(acc, piece),
            });
        }
        let frag = frag.unwrap_or_else(|| {
            let empty = self.nfa.new_state();
            (empty, empty)
        });
        self.finish_fragment(frag, result, flags)?;
        self.patterns_added += 1;
        Ok(())
    }

    fn scan_glob_class(bytes: &[u8], start: usize) -> Result<(MultiChar, usize)> {
        let class_pos = start;
        let mut i = start + 1; // skip '['
        let invert = matches!(bytes.get(i), Some(b'^') | Some(b'!'));
        if invert {
            i += 1;
        }
        let mut mc = MultiChar::new();
        let mut first = true;
        loop {
            match bytes.get(i) {
                None => return Err(RedError::parse(class_pos, "unterminated glob class")),
                Some(b']') if !first => {
                    i += 1;
                    break;
                }
                _ => {}
            }
            first = false;
            let lo = bytes[i];
            i += 1;
            if bytes.get(i) == Some(&b'-') && bytes.get(i + 1).is_some() && bytes[i + 1] != b']' {
                i += 1;
                let hi = bytes[i];
                i += 1;
                if hi < lo {
                    return Err(RedError::parse(class_pos, "glob range is backwards"));
                }
                mc.set_span(lo as u32, hi as u32);
            } else {
                mc.set(lo as u32);
            }
        }
        if invert {
            let mut full = multichar::any_byte();
            full.subtract(&mc);
            mc = full;
        }
        Ok((mc, i))
    }

    /// Literal text, matched byte for byte with no metacharacter interpretation.
    fn add_exact(&mut self, text: &str, result: u32, flags: Flags) -> Result<()> {
        Self::validate_result(result)?;
        trace!("parser::add_exact result={} text={:?}", result, text);
        let mut frag: Option<(NfaId, NfaId)> = None;
        for &b in text.as_bytes() {
            let piece = self.nfa.build_chars(multichar::single_byte(b));
            frag = Some(match frag {
                None => piece,
                Some(acc) => self.nfa.concat(acc, piece),
            });
        }
        let frag = frag.unwrap_or_else(|| {
            let empty = self.nfa.new_state();
            (empty, empty)
        });
        self.finish_fragment(frag, result, flags)?;
        self.patterns_added += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pattern: &str, result: u32) -> Nfa {
        let mut p = Parser::new(None);
        p.add(pattern, result, Flags::empty()).unwrap();
        p.finish().unwrap().0
    }

    #[test]
    fn literal_pattern_builds_chain() {
        let nfa = build("ab", 1);
        assert!(nfa.len() > 1);
    }

    #[test]
    fn alternation_builds_two_branches() {
        let nfa = build("a|b", 1);
        assert!(nfa.len() > 2);
    }

    #[test]
    fn unbalanced_parens_is_error() {
        let mut p = Parser::new(None);
        assert!(p.add("(ab", 1, Flags::empty()).is_err());
    }

    #[test]
    fn zero_result_is_rejected() {
        let mut p = Parser::new(None);
        assert!(p.add("a", 0, Flags::empty()).is_err());
    }

    #[test]
    fn finish_with_no_patterns_matches_empty_string() {
        let p = Parser::new(None);
        let (nfa, _initial, _orig_nfa_states) = p.finish().unwrap();
        assert!(nfa.len() >= 2);
    }

    #[test]
    fn add_auto_strips_anchors() {
        let mut p = Parser::new(None);
        p.add_auto("^abc$", 1).unwrap();
        p.finish().unwrap();
    }

    #[test]
    fn add_glob_handles_wildcard_and_class() {
        let mut p = Parser::new(None);
        p.add_glob("a*[0-9]", 1, Flags::empty()).unwrap();
        p.finish().unwrap();
    }

    #[test]
    fn add_exact_matches_literal_bytes() {
        let mut p = Parser::new(None);
        p.add_exact("a.b*", 1, Flags::empty()).unwrap();
        p.finish().unwrap();
    }

    #[test]
    fn budget_limits_paren_depth() {
        let budget = Budget {
            max_states: None,
            max_paren_depth: Some(1),
        };
        let mut p = Parser::new(Some(budget));
        assert!(p.add("((a))", 1, Flags::empty()).is_err());
    }

    #[test]
    fn mid_pattern_flags_marker_folds_case() {
        use crate::internal::powerset::powerset_convert;
        let mut p = Parser::new(None);
        p.add(r"(meyer\i)+", 2, Flags::empty()).unwrap();
        let (nfa, initial, _orig_nfa_states) = p.finish().unwrap();
        let dfa = powerset_convert(&nfa, initial, None).unwrap();
        assert_eq!(dfa.match_full(b"meyer"), 2);
        assert_eq!(dfa.match_full(b"MEYER"), 2);
        assert_eq!(dfa.match_full(b"MeyerMEYER"), 2);
    }

    #[test]
    fn tokens_scanned_counts_every_token_including_flags() {
        let mut p = Parser::new(None);
        p.add(r"a\ib", 1, Flags::empty()).unwrap();
        // 'a', Flags, 'b', End
        assert_eq!(p.tokens_scanned(), 4);
    }
}
