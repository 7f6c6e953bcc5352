//! Optional, caller-owned compilation instrumentation.
//!
//! Populating a [`CompileStats`] changes nothing about the compiled program; it is
//! pure observability, separate from the `log`-crate tracing the pipeline also emits.

/// Size and timing counters collected during one compilation run.
///
/// Pass `&mut CompileStats` into [`crate::compiler::CompilerBuilder::compile`] to have
/// each pipeline stage fill in its fields as it runs. Every field starts at its
/// default (zero, or `None` for the timestamps) and stages only ever add information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Wall-clock timestamp (as `Some(nanos since an arbitrary epoch)`) before NFA
    /// construction begins. Left as `None` by default: this crate does not call
    /// `Instant::now()` itself. Callers that want timings stamp this field
    /// themselves around the relevant call.
    pub pre_nfa: Option<u64>,
    /// Timestamp after NFA construction, before basis computation.
    pub post_nfa: Option<u64>,
    /// Timestamp before the powerset transition-table basis is computed.
    pub pre_basis: Option<u64>,
    /// Timestamp after basis computation.
    pub post_basis: Option<u64>,
    /// Timestamp before powerset/DFA construction.
    pub pre_dfa: Option<u64>,
    /// Timestamp after powerset/DFA construction.
    pub post_dfa: Option<u64>,
    /// Timestamp before minimization.
    pub pre_minimize: Option<u64>,
    /// Timestamp after minimization.
    pub post_minimize: Option<u64>,
    /// Timestamp before serialization.
    pub pre_serialize: Option<u64>,
    /// Timestamp after serialization.
    pub post_serialize: Option<u64>,

    /// Total tokens scanned across all patterns added.
    pub num_tokens: u64,
    /// Number of patterns added (across `add`/`add_auto`/`add_glob`/`add_exact`).
    pub num_patterns: u64,
    /// NFA state count immediately after parsing, before `drop_useless_transitions`.
    pub orig_nfa_states: u64,
    /// NFA state count after `drop_useless_transitions`.
    pub useful_nfa_states: u64,
    /// DFA state count immediately after powerset conversion, before minimization.
    pub orig_dfa_states: u64,
    /// DFA state count after minimization.
    pub minimized_dfa_states: u64,
    /// Size in bytes of the serialized program.
    pub serialized_bytes: u64,
    /// Alphabet size after equivalence-map installation (`maxClass + 1`).
    pub num_distinguished_symbols: u64,
    /// Number of rows (subset-states) built during powerset conversion.
    pub transition_table_rows: u64,
}
