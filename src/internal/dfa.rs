//! The DFA arena: a sparse per-state transition map plus a dead-end flag and result.
//!
//! State id `0` is always the error state (every byte self-loops, result 0,
//! dead-end). State id `1` is conventionally the initial state once [`Dfa::set_initial`]
//! has run, though the id is also tracked explicitly via `initial`.

use rustc_hash::FxHashMap as HashMap;

use log::trace;

use super::ids::DfaId;
use super::multichar::is_end_mark;

/// One DFA state: a sparse `char -> state` map, a dead-end flag, and a result.
#[derive(Debug, Clone, Default)]
pub(crate) struct DfaState {
    pub(crate) result: u32,
    pub(crate) dead_end: bool,
    pub(crate) transitions: HashMap<u32, DfaId>,
}

/// Arena of [`DfaState`]s.
#[derive(Debug)]
pub(crate) struct Dfa {
    states: Vec<DfaState>,
    initial: DfaId,
    /// 256-entry equivalence-class table, populated by `install_equivalence_map`.
    pub(crate) equiv_map: Option<[u8; 256]>,
}

impl Dfa {
    /// A fresh arena with the error state (id 0) pre-allocated.
    pub(crate) fn new() -> Self {
        let mut error_state = DfaState::default();
        error_state.dead_end = true;
        Dfa {
            states: vec![error_state],
            initial: DfaId::new(0),
            equiv_map: None,
        }
    }

    pub(crate) fn new_state(&mut self) -> DfaId {
        let id = DfaId::new(self.states.len() as u32);
        self.states.push(DfaState::default());
        id
    }

    pub(crate) fn state(&self, id: DfaId) -> &DfaState {
        &self.states[id]
    }

    pub(crate) fn state_mut(&mut self, id: DfaId) -> &mut DfaState {
        &mut self.states[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn initial(&self) -> DfaId {
        self.initial
    }

    pub(crate) fn set_initial(&mut self, id: DfaId) {
        self.initial = id;
    }

    pub(crate) fn set_result(&mut self, id: DfaId, result: u32) {
        self.states[id].result = result;
    }

    pub(crate) fn add_transition(&mut self, from: DfaId, ch: u32, to: DfaId) {
        self.states[from].transitions.insert(ch, to);
    }

    /// Look up the transition for byte/end-mark `ch`, defaulting to the error state.
    pub(crate) fn next(&self, id: DfaId, ch: u32) -> DfaId {
        self.states[id]
            .transitions
            .get(&ch)
            .copied()
            .unwrap_or(DfaId::new(0))
    }

    /// All state ids reachable from the initial state (including the error state
    /// only if actually reachable, which it never is once minimised -- callers
    /// that want "all allocated ids regardless of reachability" use `len()`).
    pub(crate) fn all_state_ids(&self) -> Vec<DfaId> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = vec![self.initial];
        seen.insert(self.initial.id());
        let mut order = vec![self.initial];
        while let Some(cur) = stack.pop() {
            for (_c, &next) in self.states[cur].transitions.iter() {
                if seen.insert(next.id()) {
                    stack.push(next);
                    order.push(next);
                }
            }
        }
        order
    }

    /// Largest character index with any non-default (explicit) edge, across
    /// every reachable state.
    pub(crate) fn find_max_char(&self) -> u32 {
        let mut max = 0u32;
        for id in self.all_state_ids() {
            for &ch in self.states[id].transitions.keys() {
                if ch > max {
                    max = ch;
                }
            }
        }
        max
    }

    /// Largest result value present anywhere in the reachable DFA.
    pub(crate) fn find_max_result(&self) -> u32 {
        self.all_state_ids()
            .into_iter()
            .map(|id| self.states[id].result)
            .max()
            .unwrap_or(0)
    }

    /// After powerset construction, pull any remaining end-mark edges (`char >= 256`)
    /// back onto the predecessor's result and delete them. When more than one
    /// end-mark edge leaves the same state -- two patterns with different results
    /// both accepting at this position -- the one with the lowest result wins and
    /// the rest are simply discarded, matching the "first one wins" rule.
    pub(crate) fn chop_end_marks(&mut self) {
        for i in 0..self.states.len() {
            let mut marks: Vec<u32> = self.states[i]
                .transitions
                .keys()
                .copied()
                .filter(|&c| is_end_mark(c))
                .collect();
            marks.sort_unstable();
            for (rank, ch) in marks.into_iter().enumerate() {
                self.states[i].transitions.remove(&ch);
                if rank == 0 {
                    self.states[i].result = super::multichar::result_of_end_mark(ch);
                }
            }
        }
    }

    /// Build the 256-entry byte-equivalence table: two bytes share a class iff,
    /// for every reachable state, their transitions agree (both land on the same
    /// target, or both are absent). Remaps every transition to class indices.
    pub(crate) fn install_equivalence_map(&mut self) {
        trace!("dfa::install_equivalence_map over {} states", self.len());
        let ids = self.all_state_ids();
        let signature = |byte: u32, dfa: &Dfa| -> Vec<Option<DfaId>> {
            ids.iter().map(|&id| dfa.states[id].transitions.get(&byte).copied()).collect()
        };
        let mut map = [0u8; 256];
        let mut classes: Vec<Vec<Option<DfaId>>> = Vec::new();
        for byte in 0u32..256 {
            let sig = signature(byte, self);
            let class = match classes.iter().position(|s| s == &sig) {
                Some(idx) => idx,
                None => {
                    classes.push(sig);
                    classes.len() - 1
                }
            };
            map[byte as usize] = class as u8;
        }

        for id in &ids {
            let old = self.states[*id].transitions.clone();
            let mut remapped: HashMap<u32, DfaId> = HashMap::default();
            for (ch, target) in old {
                if is_end_mark(ch) {
                    remapped.insert(ch, target);
                } else {
                    remapped.insert(map[ch as usize] as u32, target);
                }
            }
            self.states[*id].transitions = remapped;
        }
        self.equiv_map = Some(map);
    }

    /// Mark every state whose reachable transitions (explicit only -- there is no
    /// separate "default" edge beyond the implicit error state) all loop back to
    /// itself as a dead end.
    pub(crate) fn flag_dead_ends(&mut self) {
        let max_char = self.find_max_char();
        let ids: Vec<DfaId> = (0..self.states.len() as u32).map(DfaId::new).collect();
        for id in ids {
            let mut dead = true;
            for ch in 0..=max_char {
                let target = self.next(id, ch);
                if target != id {
                    dead = false;
                    break;
                }
            }
            self.states[id].dead_end = dead;
        }
    }

    /// Compute the longest fixed prefix (in equivalence-class space) that every
    /// accepting input must begin with: walk forward from the initial state while
    /// exactly one class leads anywhere but the error/dead-end state and the
    /// current state is not itself accepting. Used by the matcher's leader
    /// fast-reject (`install_equivalence_map` must already have run).
    pub(crate) fn compute_leader(&self) -> Vec<u8> {
        let max_char = self.find_max_char();
        let mut leader = Vec::new();
        let mut cur = self.initial;
        loop {
            if self.states[cur].result != 0 {
                break;
            }
            let mut only: Option<(u32, DfaId)> = None;
            let mut more_than_one = false;
            for c in 0..=max_char {
                let target = self.next(cur, c);
                if target.id() != 0 && !self.states[target].dead_end {
                    if only.is_some() {
                        more_than_one = true;
                        break;
                    }
                    only = Some((c, target));
                }
            }
            if more_than_one {
                break;
            }
            match only {
                Some((c, target)) if leader.len() < u8::MAX as usize => {
                    leader.push(c as u8);
                    cur = target;
                }
                _ => break,
            }
        }
        leader
    }

    /// Test-only interpreter: walk `bytes` from the initial state (through the
    /// equivalence map, if installed) and return the final state's result.
    pub(crate) fn match_full(&self, bytes: &[u8]) -> u32 {
        let mut cur = self.initial;
        for &b in bytes {
            if self.states[cur].dead_end {
                return 0;
            }
            let ch = match &self.equiv_map {
                Some(map) => map[b as usize] as u32,
                None => b as u32,
            };
            cur = self.next(cur, ch);
        }
        self.states[cur].result
    }

    /// Rebuild a compact arena containing only reachable states, with the error
    /// state pinned at id 0 and the (possibly new) initial state at id 1.
    pub(crate) fn transcribe(&self) -> Dfa {
        let reachable = self.all_state_ids();
        let mut mapping: HashMap<u32, DfaId> = HashMap::default();
        mapping.insert(0, DfaId::new(0)); // error state always id 0
        let mut next_id = 1u32;
        // Ensure initial gets id 1 when it isn't the error state itself.
        if self.initial.id() != 0 {
            mapping.insert(self.initial.id(), DfaId::new(1));
            next_id = 2;
        }
        for id in &reachable {
            mapping.entry(id.id()).or_insert_with(|| {
                let assigned = DfaId::new(next_id);
                next_id += 1;
                assigned
            });
        }

        let total = next_id as usize;
        let mut out = Dfa {
            states: vec![DfaState::default(); total],
            initial: *mapping.get(&self.initial.id()).unwrap_or(&DfaId::new(0)),
            equiv_map: self.equiv_map,
        };
        out.states[0].dead_end = true;

        for id in std::iter::once(DfaId::new(0)).chain(reachable.iter().copied()) {
            let dst = mapping[&id.id()];
            out.states[dst].result = self.states[id].result;
            out.states[dst].dead_end = self.states[id].dead_end;
            for (&ch, &target) in self.states[id].transitions.iter() {
                if let Some(&dst_target) = mapping.get(&target.id()) {
                    out.states[dst].transitions.insert(ch, dst_target);
                }
            }
        }
        trace!(
            "dfa::transcribe {} states -> {} states",
            self.states.len(),
            out.states.len()
        );
        out
    }
}

impl Default for Dfa {
    fn default() -> Self {
        Dfa::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_dfa() -> Dfa {
        // error(0) -> a -> s1 -> b -> s2(accepting, result=1)
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let s2 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.add_transition(s1, b'b' as u32, s2);
        dfa.set_result(s2, 1);
        dfa
    }

    #[test]
    fn match_full_follows_transitions() {
        let dfa = linear_dfa();
        assert_eq!(dfa.match_full(b"b"), 1);
        assert_eq!(dfa.match_full(b"a"), 0);
    }

    #[test]
    fn flag_dead_ends_marks_error_state() {
        let mut dfa = linear_dfa();
        dfa.flag_dead_ends();
        assert!(dfa.state(DfaId::new(0)).dead_end);
    }

    #[test]
    fn chop_end_marks_promotes_result() {
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let marker = dfa.new_state();
        dfa.set_result(marker, 3);
        dfa.add_transition(s1, super::super::multichar::end_mark_for(3), marker);
        dfa.set_initial(s1);
        dfa.chop_end_marks();
        assert_eq!(dfa.state(s1).result, 3);
        assert!(dfa.state(s1).transitions.is_empty());
    }

    #[test]
    fn chop_end_marks_lowest_result_wins_when_ambiguous() {
        // Two patterns (results 1 and 2) both accept at the same position; the
        // lowest result wins regardless of which end-mark edge was added last.
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let m2 = dfa.new_state();
        let m1 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.add_transition(s1, super::super::multichar::end_mark_for(2), m2);
        dfa.add_transition(s1, super::super::multichar::end_mark_for(1), m1);
        dfa.chop_end_marks();
        assert_eq!(dfa.state(s1).result, 1);
        assert!(dfa.state(s1).transitions.is_empty());
    }

    #[test]
    fn transcribe_compacts_and_pins_ids() {
        let dfa = linear_dfa();
        let compact = dfa.transcribe();
        assert_eq!(compact.initial().id(), 1);
        assert_eq!(compact.match_full(b"b"), 1);
    }

    #[test]
    fn leader_follows_the_only_forced_path() {
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let s2 = dfa.new_state();
        let s3 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.add_transition(s1, b'a' as u32, s2);
        dfa.add_transition(s2, b'b' as u32, s3);
        dfa.set_result(s3, 1);
        dfa.flag_dead_ends();
        assert_eq!(dfa.compute_leader(), vec![b'a', b'b']);
    }

    #[test]
    fn leader_is_empty_when_initial_state_already_accepts() {
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.set_result(s1, 1);
        assert!(dfa.compute_leader().is_empty());
    }

    #[test]
    fn leader_is_empty_when_multiple_branches_diverge() {
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let s2 = dfa.new_state();
        let s3 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.add_transition(s1, b'a' as u32, s2);
        dfa.add_transition(s1, b'b' as u32, s3);
        dfa.set_result(s2, 1);
        dfa.set_result(s3, 1);
        dfa.flag_dead_ends();
        assert!(dfa.compute_leader().is_empty());
    }

    #[test]
    fn equivalence_map_groups_identical_behaviour() {
        let mut dfa = Dfa::new();
        let s1 = dfa.new_state();
        let s2 = dfa.new_state();
        dfa.set_initial(s1);
        dfa.set_result(s2, 1);
        // both 'x' and 'y' lead to the same accepting state; everything else
        // (implicitly) goes to the error state.
        dfa.add_transition(s1, b'x' as u32, s2);
        dfa.add_transition(s1, b'y' as u32, s2);
        dfa.install_equivalence_map();
        let map = dfa.equiv_map.unwrap();
        assert_eq!(map[b'x' as usize], map[b'y' as usize]);
        assert_ne!(map[b'x' as usize], map[b'z' as usize]);
    }
}
