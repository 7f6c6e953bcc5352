//! Gries/Hopcroft-style partition refinement, reducing a powerset-constructed DFA
//! to the minimal automaton accepting the same (input -> result) language.

use std::collections::VecDeque;

use log::trace;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use super::dfa::Dfa;
use super::ids::{BlockId, DfaId};
use crate::errors::{RedError, Result};
use crate::stats::CompileStats;

/// Minimise `dfa` in place (conceptually; the arena is rebuilt) and return the
/// minimal equivalent automaton, with the error state pinned at id 0 and the
/// initial state at id 1.
pub(crate) fn minimize(mut dfa: Dfa, stats: Option<&mut CompileStats>) -> Result<Dfa> {
    trace!("minimizer::minimize starting with {} states", dfa.len());
    // Any end-marks the powerset stage left behind are pulled back here too.
    dfa.chop_end_marks();
    dfa.install_equivalence_map();

    let num_classes = dfa
        .equiv_map
        .map(|m| m.iter().copied().max().unwrap_or(0) as u32 + 1)
        .unwrap_or(256);

    let live: Vec<u32> = std::iter::once(0u32)
        .chain(dfa.all_state_ids().into_iter().map(|id| id.id()))
        .collect::<HashSet<u32>>()
        .into_iter()
        .collect();

    // inverse[(target, char)] = sources that transition to target on char.
    let mut inverse: HashMap<(u32, u32), Vec<u32>> = HashMap::default();
    for &s in &live {
        for c in 0..num_classes {
            let t = dfa.next(DfaId::new(s), c).id();
            inverse.entry((t, c)).or_default().push(s);
        }
    }

    // Initial partition: one block per distinct result value.
    let mut by_result: HashMap<u32, HashSet<u32>> = HashMap::default();
    for &s in &live {
        by_result
            .entry(dfa.state(DfaId::new(s)).result)
            .or_default()
            .insert(s);
    }
    let mut blocks: Vec<HashSet<u32>> = by_result.into_values().collect();
    let mut block_of: HashMap<u32, BlockId> = HashMap::default();
    for (idx, block) in blocks.iter().enumerate() {
        for &s in block {
            block_of.insert(s, BlockId::new(idx as i64));
        }
    }

    let zero_block = block_of[&0];
    let mut worklist: VecDeque<(BlockId, u32)> = VecDeque::new();
    let other_count: usize = blocks
        .iter()
        .enumerate()
        .filter(|(i, _)| BlockId::new(*i as i64) != zero_block)
        .map(|(_, b)| b.len())
        .sum();
    if blocks[zero_block].len() <= other_count {
        for c in 0..num_classes {
            worklist.push_back((zero_block, c));
        }
    } else {
        for (idx, _) in blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| BlockId::new(*i as i64) != zero_block)
        {
            let idx = BlockId::new(idx as i64);
            for c in 0..num_classes {
                worklist.push_back((idx, c));
            }
        }
    }

    while let Some((b, c)) = worklist.pop_front() {
        if b.as_usize() >= blocks.len() {
            continue;
        }
        let mut preimage: HashSet<u32> = HashSet::default();
        for &t in &blocks[b] {
            if let Some(sources) = inverse.get(&(t, c)) {
                preimage.extend(sources.iter().copied());
            }
        }
        if preimage.is_empty() {
            continue;
        }
        let block_count_before = blocks.len();
        for y_idx in 0..block_count_before {
            let y = BlockId::new(y_idx as i64);
            let intersection: HashSet<u32> =
                blocks[y].intersection(&preimage).copied().collect();
            if intersection.is_empty() || intersection.len() == blocks[y].len() {
                continue;
            }
            let diff: HashSet<u32> = blocks[y].difference(&preimage).copied().collect();
            blocks[y] = diff;
            let new_idx = BlockId::new(blocks.len() as i64);
            for &s in &intersection {
                block_of.insert(s, new_idx);
            }
            blocks.push(intersection);
            for ch in 0..num_classes {
                worklist.push_back((y, ch));
                worklist.push_back((new_idx, ch));
            }
        }
    }

    let err_block = block_of[&0];
    let init_block = block_of[&dfa.initial().id()];
    if err_block == init_block {
        return Err(RedError::minimize(
            "initial state is indistinguishable from the error state",
        ));
    }

    let mut order: Vec<BlockId> = (0..blocks.len())
        .map(|i| BlockId::new(i as i64))
        .filter(|&i| i != err_block && i != init_block)
        .collect();
    order.sort_by_key(|&i| *blocks[i].iter().min().expect("block is nonempty"));

    let mut new_id_of: HashMap<BlockId, u32> = HashMap::default();
    new_id_of.insert(err_block, 0);
    new_id_of.insert(init_block, 1);
    let mut next_id = 2u32;
    for i in order {
        new_id_of.insert(i, next_id);
        next_id += 1;
    }

    let mut out = Dfa::new();
    while (out.len() as u32) < next_id {
        out.new_state();
    }
    out.set_initial(DfaId::new(1));
    out.equiv_map = dfa.equiv_map;

    for (&block_idx, &new_id) in &new_id_of {
        let rep = *blocks[block_idx].iter().min().expect("block is nonempty");
        let rep_id = DfaId::new(rep);
        out.set_result(DfaId::new(new_id), dfa.state(rep_id).result);
        for c in 0..num_classes {
            let target = dfa.next(rep_id, c).id();
            let target_block = block_of[&target];
            let target_new = new_id_of[&target_block];
            if target_new != 0 {
                out.add_transition(DfaId::new(new_id), c, DfaId::new(target_new));
            }
        }
    }

    out.flag_dead_ends();
    let out = out.transcribe();

    if let Some(s) = stats {
        s.minimized_dfa_states = out.len() as u64;
        s.num_distinguished_symbols = num_classes as u64;
    }
    trace!("minimizer::minimize produced {} states", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::multichar::{end_mark_for, single_byte};
    use crate::internal::nfa::Nfa;
    use crate::internal::powerset::powerset_convert;

    fn build_dfa(pattern_build: impl FnOnce(&mut Nfa) -> (super::super::ids::NfaId, super::super::ids::NfaId)) -> Dfa {
        let mut nfa = Nfa::new();
        let frag = pattern_build(&mut nfa);
        let (start, _end) = frag;
        nfa.eliminate_epsilons();
        nfa.drop_useless_transitions(start);
        powerset_convert(&nfa, start, None).unwrap()
    }

    #[test]
    fn minimize_preserves_language() {
        let dfa = build_dfa(|nfa| {
            let a = nfa.build_chars(single_byte(b'a'));
            let b = nfa.build_chars(single_byte(b'b'));
            let ab = nfa.concat(a, b);
            nfa.apply_end_mark(ab, 1)
        });
        let minimized = minimize(dfa, None).unwrap();
        assert_eq!(minimized.match_full(b"ab"), 1);
        assert_eq!(minimized.match_full(b"a"), 0);
        assert_eq!(minimized.match_full(b"abc"), 0);
    }

    #[test]
    fn minimize_merges_equivalent_suffixes() {
        // (a|b)c: from two branches the suffix behavior is identical, so the
        // minimal DFA should be smaller than the un-minimized one.
        let dfa = build_dfa(|nfa| {
            let a = nfa.build_chars(single_byte(b'a'));
            let b = nfa.build_chars(single_byte(b'b'));
            let u = nfa.union(a, b);
            let c = nfa.build_chars(single_byte(b'c'));
            let frag = nfa.concat(u, c);
            nfa.apply_end_mark(frag, 1)
        });
        let before = dfa.len();
        let minimized = minimize(dfa, None).unwrap();
        assert!(minimized.len() <= before);
        assert_eq!(minimized.match_full(b"ac"), 1);
        assert_eq!(minimized.match_full(b"bc"), 1);
    }

    #[test]
    fn end_mark_value_is_reachable_via_helper() {
        assert!(end_mark_for(1) >= 256);
    }
}
