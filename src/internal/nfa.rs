//! The NFA arena, built with ordinary Thompson-construction epsilon edges and then
//! reduced to an epsilon-free form via [`Nfa::eliminate_epsilons`].
//!
//! Building with epsilons first keeps every combinator (`union`, `concat`,
//! `optional`, `kleene_star`, ...) a small, obviously-correct local edit instead of
//! a whole-arena rewrite. [`Parser::finish`](super::parser::Parser::finish) runs
//! the elimination pass once, after every pattern has been folded into the shared
//! start state, so the NFA handed to the powerset converter never contains an
//! epsilon edge.

use super::ids::NfaId;
use super::multichar::MultiChar;

/// One outgoing edge: fire on any byte/end-mark in `chars`, land on `next`.
#[derive(Debug, Clone)]
pub(crate) struct NfaTransition {
    pub(crate) next: NfaId,
    pub(crate) chars: MultiChar,
}

/// One NFA state: an optional accepting result, its outgoing transitions, and
/// (until [`Nfa::eliminate_epsilons`] runs) its epsilon edges.
#[derive(Debug, Clone, Default)]
pub(crate) struct NfaState {
    /// Nonzero if this state accepts (the pattern's 1-based result id).
    pub(crate) result: u32,
    pub(crate) transitions: Vec<NfaTransition>,
    pub(crate) epsilons: Vec<NfaId>,
}

impl NfaState {
    fn contains_transition(&self, next: NfaId, chars: &MultiChar) -> bool {
        self.transitions
            .iter()
            .any(|t| t.next == next && &t.chars == chars)
    }

    fn add_transition(&mut self, next: NfaId, chars: MultiChar) {
        if chars.is_empty() {
            return;
        }
        if let Some(existing) = self.transitions.iter_mut().find(|t| t.next == next) {
            existing.chars.union_with(&chars);
        } else if !self.contains_transition(next, &chars) {
            self.transitions.push(NfaTransition { next, chars });
        }
    }
}

/// Arena of [`NfaState`]s. Id 0 is reserved and never allocated, matching the
/// convention used by the DFA arena (id 0 there is the error state).
#[derive(Debug, Default)]
pub(crate) struct Nfa {
    states: Vec<NfaState>,
}

impl Nfa {
    /// An empty arena, with the reserved id-0 slot pre-filled.
    pub(crate) fn new() -> Self {
        Nfa {
            states: vec![NfaState::default()],
        }
    }

    /// Allocate a fresh, empty state and return its id.
    pub(crate) fn new_state(&mut self) -> NfaId {
        let id = NfaId::new(self.states.len() as u32);
        self.states.push(NfaState::default());
        id
    }

    pub(crate) fn state(&self, id: NfaId) -> &NfaState {
        &self.states[id]
    }

    pub(crate) fn state_mut(&mut self, id: NfaId) -> &mut NfaState {
        &mut self.states[id]
    }

    /// Number of allocated states, including the reserved id 0.
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    /// Ids of every allocated state (including id 0).
    pub(crate) fn all_state_ids(&self) -> impl Iterator<Item = NfaId> + '_ {
        (0..self.states.len() as u32).map(NfaId::new)
    }

    fn add_transition(&mut self, from: NfaId, next: NfaId, chars: MultiChar) {
        self.states[from].add_transition(next, chars);
    }

    pub(crate) fn add_epsilon(&mut self, from: NfaId, to: NfaId) {
        if from != to && !self.states[from].epsilons.contains(&to) {
            self.states[from].epsilons.push(to);
        }
    }

    /// Build a two-state fragment matching exactly the bytes in `chars`.
    /// Returns `(start, end)`.
    pub(crate) fn build_chars(&mut self, chars: MultiChar) -> (NfaId, NfaId) {
        let start = self.new_state();
        let end = self.new_state();
        self.add_transition(start, end, chars);
        (start, end)
    }

    /// `a|b`: a fresh start epsilon-branches into both fragments, which
    /// epsilon-converge on a fresh end.
    pub(crate) fn union(&mut self, a: (NfaId, NfaId), b: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let (a_start, a_end) = a;
        let (b_start, b_end) = b;
        let start = self.new_state();
        let end = self.new_state();
        self.add_epsilon(start, a_start);
        self.add_epsilon(start, b_start);
        self.add_epsilon(a_end, end);
        self.add_epsilon(b_end, end);
        (start, end)
    }

    /// `ab`: `a`'s end epsilon-transitions straight into `b`'s start.
    pub(crate) fn concat(&mut self, a: (NfaId, NfaId), b: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let (a_start, a_end) = a;
        let (b_start, b_end) = b;
        self.add_epsilon(a_end, b_start);
        (a_start, b_end)
    }

    /// `a?`
    pub(crate) fn optional(&mut self, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let (start, end) = frag;
        let s = self.new_state();
        let e = self.new_state();
        self.add_epsilon(s, start);
        self.add_epsilon(s, e);
        self.add_epsilon(end, e);
        (s, e)
    }

    /// `a*`
    pub(crate) fn kleene_star(&mut self, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let (start, end) = frag;
        let s = self.new_state();
        let e = self.new_state();
        self.add_epsilon(s, start);
        self.add_epsilon(s, e);
        self.add_epsilon(end, start);
        self.add_epsilon(end, e);
        (s, e)
    }

    /// `a+`: one-or-more repeats, by looping `end` back to `start` and adding a
    /// fresh exit.
    pub(crate) fn closure_one_or_more(&mut self, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let (start, end) = frag;
        let e = self.new_state();
        self.add_epsilon(end, start);
        self.add_epsilon(end, e);
        (start, e)
    }

    /// `a{min,max}`: bounded repetition, built by concatenating `min` copies and
    /// then `max - min` optional copies (or a trailing `*` when `max` is unbounded).
    pub(crate) fn closure(
        &mut self,
        build_copy: &mut dyn FnMut(&mut Nfa) -> (NfaId, NfaId),
        min: u32,
        max: u32,
    ) -> (NfaId, NfaId) {
        const INFINITE: u32 = u32::MAX;
        if min == 0 && max == INFINITE {
            let frag = build_copy(self);
            return self.kleene_star(frag);
        }
        let mut result: Option<(NfaId, NfaId)> = None;
        for _ in 0..min {
            let copy = build_copy(self);
            result = Some(match result {
                None => copy,
                Some(acc) => self.concat(acc, copy),
            });
        }
        if max == INFINITE {
            let tail = build_copy(self);
            let tail = self.kleene_star(tail);
            result = Some(match result {
                None => tail,
                Some(acc) => self.concat(acc, tail),
            });
        } else {
            for _ in min..max {
                let copy = build_copy(self);
                let copy = self.optional(copy);
                result = Some(match result {
                    None => copy,
                    Some(acc) => self.concat(acc, copy),
                });
            }
        }
        result.unwrap_or_else(|| {
            let start = self.new_state();
            (start, start)
        })
    }

    /// Prefix the pattern's fragment with `.*`, allowing a match to start anywhere.
    pub(crate) fn apply_start_wild(&mut self, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let wild = self.build_chars(super::multichar::any_byte());
        let wild = self.kleene_star(wild);
        self.concat(wild, frag)
    }

    /// Suffix the pattern's fragment with `.*`, allowing trailing garbage after a match.
    pub(crate) fn apply_end_wild(&mut self, frag: (NfaId, NfaId)) -> (NfaId, NfaId) {
        let wild = self.build_chars(super::multichar::any_byte());
        let wild = self.kleene_star(wild);
        self.concat(frag, wild)
    }

    /// Append a synthetic end-mark transition for `result`, so the powerset step can
    /// later tell which pattern accepted at a given DFA state.
    pub(crate) fn apply_end_mark(&mut self, frag: (NfaId, NfaId), result: u32) -> (NfaId, NfaId) {
        let (start, end) = frag;
        let marker = self.new_state();
        self.states[marker].result = result;
        let mut mc = MultiChar::new();
        mc.set(super::multichar::end_mark_for(result));
        self.add_transition(end, marker, mc);
        (start, marker)
    }

    /// Fold a new pattern fragment into the arena's single shared start state via
    /// an epsilon edge. Used to add one pattern at a time into a growing
    /// multi-pattern NFA; the shared start itself never needs an "end".
    pub(crate) fn self_union(
        &mut self,
        shared_start: Option<NfaId>,
        frag: (NfaId, NfaId),
    ) -> NfaId {
        match shared_start {
            None => frag.0,
            Some(existing) => {
                self.add_epsilon(existing, frag.0);
                existing
            }
        }
    }

    /// Replace every epsilon edge in the arena with the union of its source's
    /// epsilon-closure's real transitions and results, leaving a fully
    /// epsilon-free NFA behind. Idempotent: running it twice is a no-op.
    pub(crate) fn eliminate_epsilons(&mut self) {
        let n = self.states.len();
        let mut closures: Vec<Vec<NfaId>> = Vec::with_capacity(n);
        for i in 0..n {
            let id = NfaId::new(i as u32);
            let mut seen = std::collections::HashSet::new();
            let mut stack = vec![id];
            seen.insert(id.id());
            while let Some(cur) = stack.pop() {
                for &eps in &self.states[cur].epsilons {
                    if seen.insert(eps.id()) {
                        stack.push(eps);
                    }
                }
            }
            closures.push(seen.into_iter().map(NfaId::new).collect());
        }

        let mut new_states: Vec<NfaState> = (0..n).map(|_| NfaState::default()).collect();
        for i in 0..n {
            let mut result = 0u32;
            for &r in &closures[i] {
                result = result.max(self.states[r].result);
            }
            new_states[i].result = result;
            for &r in &closures[i] {
                for tr in &self.states[r].transitions {
                    new_states[i].add_transition(tr.next, tr.chars.clone());
                }
            }
        }
        self.states = new_states;
    }

    /// Remove transitions whose target state can never reach an accepting state.
    /// Shrinks the NFA before it's handed to the powerset converter. Must run
    /// after [`Nfa::eliminate_epsilons`].
    pub(crate) fn drop_useless_transitions(&mut self, start: NfaId) {
        let useful = self.compute_useful_states(start);
        for state in self.states.iter_mut() {
            state.transitions.retain(|tr| useful.contains(&tr.next.id()));
        }
    }

    fn compute_useful_states(&self, start: NfaId) -> std::collections::HashSet<u32> {
        // A state is useful if it's accepting, or can reach an accepting state.
        let reachable = self.reachable_from(start);
        let mut useful: std::collections::HashSet<u32> = self
            .states
            .iter()
            .enumerate()
            .filter(|(id, s)| s.result != 0 && reachable.contains(&(*id as u32)))
            .map(|(id, _)| id as u32)
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for (id, state) in self.states.iter().enumerate() {
                if useful.contains(&(id as u32)) || !reachable.contains(&(id as u32)) {
                    continue;
                }
                if state
                    .transitions
                    .iter()
                    .any(|tr| useful.contains(&tr.next.id()))
                {
                    useful.insert(id as u32);
                    changed = true;
                }
            }
        }
        useful
    }

    fn reachable_from(&self, start: NfaId) -> std::collections::HashSet<u32> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![start];
        seen.insert(start.id());
        while let Some(cur) = stack.pop() {
            for tr in &self.states[cur].transitions {
                if seen.insert(tr.next.id()) {
                    stack.push(tr.next);
                }
            }
            for &eps in &self.states[cur].epsilons {
                if seen.insert(eps.id()) {
                    stack.push(eps);
                }
            }
        }
        seen
    }

    /// Breadth-first iterator over the states reachable from `start`, following
    /// both real transitions and (pre-elimination) epsilon edges.
    pub(crate) fn bfs_from(&self, start: NfaId) -> NfaBfsIter<'_> {
        NfaBfsIter {
            nfa: self,
            queue: std::collections::VecDeque::from([start]),
            seen: std::collections::HashSet::from([start.id()]),
        }
    }
}

/// Breadth-first traversal over an [`Nfa`]'s reachable states.
pub(crate) struct NfaBfsIter<'a> {
    nfa: &'a Nfa,
    queue: std::collections::VecDeque<NfaId>,
    seen: std::collections::HashSet<u32>,
}

impl<'a> Iterator for NfaBfsIter<'a> {
    type Item = NfaId;

    fn next(&mut self) -> Option<NfaId> {
        let cur = self.queue.pop_front()?;
        let state = &self.nfa.state(cur);
        for tr in &state.transitions {
            if self.seen.insert(tr.next.id()) {
                self.queue.push_back(tr.next);
            }
        }
        for &eps in &state.epsilons {
            if self.seen.insert(eps.id()) {
                self.queue.push_back(eps);
            }
        }
        Some(cur)
    }
}
