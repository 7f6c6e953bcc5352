//! Match styles: which accepting state a walk over the DFA returns.

/// Controls which accepting state (and thus which result) a matcher walk reports,
/// when the walk passes through more than one accepting state.
///
/// See the matcher's style table for the precise semantics of each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    /// Return the first accepting result immediately.
    Instant,
    /// Continue while subsequent accepts share the first result; stop on change.
    #[default]
    First,
    /// Continue while the walk stays in an accepting state; stop on the first
    /// non-accepting step, returning the last accepting result seen.
    Tangent,
    /// Continue to the end of input (or a dead-end); return the last accepting
    /// result seen anywhere along the walk.
    Last,
    /// The entire input must end in an accepting state, or the result is `0`.
    Full,
}
