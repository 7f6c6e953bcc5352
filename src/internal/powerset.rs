//! Rabin-Scott subset construction, specialised to this crate's ε-free NFA and a
//! precomputed disjoint character basis.

use rustc_hash::FxHashMap as HashMap;

use log::trace;

use super::dfa::Dfa;
use super::ids::{DfaId, NfaId};
use super::multichar::{self, MultiChar};
use super::nfa::Nfa;
use crate::errors::Result;
use crate::stats::CompileStats;

/// Tag distinguishing a set of NFA ids from other bitsets.
struct NfaIdTag;
type NfaIdSet = super::bitset::BitSet<u32, NfaIdTag>;

fn nfa_id_set_of(ids: impl IntoIterator<Item = NfaId>) -> NfaIdSet {
    let mut set = NfaIdSet::new();
    for id in ids {
        set.set(id.id());
    }
    set
}

/// Converts an NFA into a DFA via subset construction over a disjoint basis.
pub(crate) struct PowersetConverter<'a> {
    nfa: &'a Nfa,
}

impl<'a> PowersetConverter<'a> {
    pub(crate) fn new(nfa: &'a Nfa) -> Self {
        PowersetConverter { nfa }
    }

    /// Run the conversion, starting the subset construction from `initial`.
    ///
    /// Two passes over the subset table: the first (`enumerate_subsets`) discovers
    /// every reachable subset-state without assigning results, so the rarity
    /// tie-breaker (§4.5) can count, for each accepting NFA state, how many rows of
    /// the *whole* table it appears in before any result is picked. The second pass
    /// reuses that table to allocate DFA states and assign results.
    pub(crate) fn convert(
        &self,
        initial: NfaId,
        stats: Option<&mut CompileStats>,
    ) -> Result<Dfa> {
        trace!("powerset::convert starting from nfa id {}", initial);
        let basis = self.basis_multi_chars();
        let start_set = nfa_id_set_of([initial]);

        let mut subsets: Vec<NfaIdSet> = Vec::new();
        let mut subset_index: HashMap<NfaIdSet, usize> = HashMap::default();
        self.enumerate_subsets(&start_set, &basis, &mut subsets, &mut subset_index);

        let rarity = self.rarity_across_table(&subsets);

        let mut dfa = Dfa::new();
        let mut memo: HashMap<NfaIdSet, DfaId> = HashMap::default();
        let root = self.dfa_from_nfa_recurse(&start_set, &basis, &rarity, &mut dfa, &mut memo)?;
        dfa.set_initial(root);
        dfa.chop_end_marks();
        if let Some(s) = stats {
            s.orig_dfa_states = dfa.len() as u64;
            s.transition_table_rows = subsets.len() as u64;
        }
        trace!("powerset::convert produced {} dfa states", dfa.len());
        Ok(dfa)
    }

    /// BFS over the subset table, collecting every distinct reachable subset-state
    /// (the rows of the whole transition table) without assigning any DFA ids yet.
    fn enumerate_subsets(
        &self,
        start: &NfaIdSet,
        basis: &[MultiChar],
        subsets: &mut Vec<NfaIdSet>,
        subset_index: &mut HashMap<NfaIdSet, usize>,
    ) {
        let mut queue: std::collections::VecDeque<NfaIdSet> = std::collections::VecDeque::new();
        subset_index.insert(start.clone(), 0);
        subsets.push(start.clone());
        queue.push_back(start.clone());
        while let Some(subset) = queue.pop_front() {
            for b in basis {
                let succ = self.successor_subset(&subset, b);
                if succ.is_empty() {
                    continue;
                }
                if let std::collections::hash_map::Entry::Vacant(e) = subset_index.entry(succ.clone()) {
                    e.insert(subsets.len());
                    subsets.push(succ.clone());
                    queue.push_back(succ);
                }
            }
        }
    }

    /// For each accepting NFA state, count the number of subset-table rows (out of
    /// `subsets`, the whole table) that contain it. This is the rarity the §4.5
    /// tie-breaker ranks on: an accepting state that shows up in fewer rows is
    /// "rarer" and wins over a more commonly co-occurring one.
    fn rarity_across_table(&self, subsets: &[NfaIdSet]) -> HashMap<u32, u32> {
        let mut counts: HashMap<u32, u32> = HashMap::default();
        for id in self.nfa.all_state_ids() {
            if self.nfa.state(id).result == 0 {
                continue;
            }
            let c = subsets.iter().filter(|s| s.get(id.id())).count() as u32;
            counts.insert(id.id(), c);
        }
        counts
    }

    /// Collect the set of all `MultiChar`s used as transition labels in the NFA,
    /// and split them into a pairwise-disjoint basis whose unions reproduce them.
    fn basis_multi_chars(&self) -> Vec<MultiChar> {
        let mut by_population: HashMap<u32, Vec<MultiChar>> = HashMap::default();
        for id in self.nfa.all_state_ids() {
            for tr in &self.nfa.state(id).transitions {
                let pop = tr.chars.population();
                let bucket = by_population.entry(pop).or_default();
                if !bucket.contains(&tr.chars) {
                    bucket.push(tr.chars.clone());
                }
            }
        }
        let mut populations: Vec<u32> = by_population.keys().copied().collect();
        populations.sort_unstable();

        let mut basis: Vec<MultiChar> = Vec::new();
        let mut lower_union = MultiChar::new();
        for pop in populations {
            let mut this_class_results = Vec::new();
            for m in &by_population[&pop] {
                let mut remainder = m.clone();
                remainder.subtract(&lower_union);
                if !remainder.is_empty() {
                    this_class_results.push(remainder);
                }
            }
            for r in &this_class_results {
                lower_union.union_with(r);
            }
            basis.extend(this_class_results);
        }
        basis
    }

    /// Second pass: allocate a DFA state per memoized subset and assign results via
    /// [`PowersetConverter::result_for_subset`]. The "subset not in table" branch
    /// (Open Question 3, §9) cannot arise here: `enumerate_subsets` already
    /// discovered every successor this recursion will ever compute.
    fn dfa_from_nfa_recurse(
        &self,
        subset: &NfaIdSet,
        basis: &[MultiChar],
        rarity: &HashMap<u32, u32>,
        dfa: &mut Dfa,
        memo: &mut HashMap<NfaIdSet, DfaId>,
    ) -> Result<DfaId> {
        if let Some(&id) = memo.get(subset) {
            return Ok(id);
        }
        let id = dfa.new_state();
        memo.insert(subset.clone(), id);

        let result = self.result_for_subset(subset, rarity);
        dfa.set_result(id, result);

        for b in basis {
            let succ = self.successor_subset(subset, b);
            if succ.is_empty() {
                continue;
            }
            let target = self.dfa_from_nfa_recurse(&succ, basis, rarity, dfa, memo)?;
            // expand the basis element back to its member characters (0..256, and
            // end-marks) when recording the edge.
            for ch in b.iter() {
                dfa.add_transition(id, ch, target);
            }
        }
        Ok(id)
    }

    fn successor_subset(&self, subset: &NfaIdSet, basis_elem: &MultiChar) -> NfaIdSet {
        let mut out = NfaIdSet::new();
        for nfa_id in subset.iter().map(NfaId::new) {
            for tr in &self.nfa.state(nfa_id).transitions {
                if tr.chars.has_intersection(basis_elem) {
                    out.set(tr.next.id());
                }
            }
        }
        out
    }

    /// Rarity tie-break: among accepting NFA states in `subset`, pick the one that
    /// appears in the fewest rows of the whole subset table; break remaining ties
    /// by ascending NFA id (the natural ascending order `BitSet` iteration already
    /// provides), never by hash-map order.
    fn result_for_subset(&self, subset: &NfaIdSet, rarity: &HashMap<u32, u32>) -> u32 {
        let mut best: Option<(u32, u32)> = None; // (rarity_count, nfa_id) -> picked later
        for nfa_id in subset.iter().map(NfaId::new) {
            let state = self.nfa.state(nfa_id);
            if state.result == 0 {
                continue;
            }
            let count = rarity.get(&nfa_id.id()).copied().unwrap_or(u32::MAX);
            match best {
                None => best = Some((count, nfa_id.id())),
                Some((best_count, _)) if count < best_count => best = Some((count, nfa_id.id())),
                _ => {}
            }
        }
        match best {
            Some((_, id)) => self.nfa.state(NfaId::new(id)).result,
            None => 0,
        }
    }
}

/// Compute the subset-construction basis and full DFA for `nfa` rooted at `initial`.
///
/// The "subset not found in table" branch described in the minimizer's internal
/// invariants cannot happen here: every subset is memoized before its successors
/// are explored, so lookups in `dfa_from_nfa_recurse` always hit.
pub(crate) fn powerset_convert(
    nfa: &Nfa,
    initial: NfaId,
    stats: Option<&mut CompileStats>,
) -> Result<Dfa> {
    PowersetConverter::new(nfa).convert(initial, stats)
}
