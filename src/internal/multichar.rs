//! `MultiChar`: the set of input symbols a single NFA transition can fire on.
//!
//! Symbols `0..256` are ordinary bytes. Symbols `256..256+K` are synthetic "end marks",
//! one per pattern, injected at the end of a pattern's NFA fragment so the powerset
//! construction can tell which pattern(s) accepted without needing epsilon edges.

use super::bitset::BitSet;

/// Tag type distinguishing a [`MultiChar`] bitset from others at the type level.
pub(crate) struct CharTag;

/// A set of symbols (bytes 0..256, plus synthetic end-marks 256..256+K).
pub(crate) type MultiChar = BitSet<u32, CharTag>;

/// The first index past the ordinary byte range; end-marks start here.
pub(crate) const END_MARK_BASE: u32 = 256;

/// Build the synthetic end-mark symbol for pattern `result`.
pub(crate) fn end_mark_for(result: u32) -> u32 {
    END_MARK_BASE + result
}

/// Whether `sym` is a synthetic end-mark rather than an ordinary byte.
pub(crate) fn is_end_mark(sym: u32) -> bool {
    sym >= END_MARK_BASE
}

/// Recover the pattern result encoded by an end-mark symbol.
pub(crate) fn result_of_end_mark(sym: u32) -> u32 {
    debug_assert!(is_end_mark(sym));
    sym - END_MARK_BASE
}

/// Build a `MultiChar` containing exactly the single byte `b`.
pub(crate) fn single_byte(b: u8) -> MultiChar {
    let mut mc = MultiChar::new();
    mc.set(b as u32);
    mc
}

/// Build a `MultiChar` containing every byte in `[lo, hi]` inclusive.
pub(crate) fn byte_range(lo: u8, hi: u8) -> MultiChar {
    let mut mc = MultiChar::new();
    mc.set_span(lo as u32, hi as u32);
    mc
}

/// Build a `MultiChar` containing every byte (the wildcard `.`, minus nothing --
/// callers exclude `\n` themselves when the dot-matches-newline flag is off).
pub(crate) fn any_byte() -> MultiChar {
    byte_range(0, 255)
}

/// `\d`: ASCII digits.
pub(crate) fn digit_class() -> MultiChar {
    byte_range(b'0', b'9')
}

/// `\D`: complement of `\d` within the byte range.
pub(crate) fn non_digit_class() -> MultiChar {
    let mut mc = any_byte();
    mc.subtract(&digit_class());
    mc
}

/// `\s`: ASCII whitespace (space, tab, newline, CR, FF, VT).
pub(crate) fn space_class() -> MultiChar {
    let mut mc = MultiChar::new();
    for b in [b' ', b'\t', b'\n', b'\r', 0x0c, 0x0b] {
        mc.set(b as u32);
    }
    mc
}

/// `\S`: complement of `\s`.
pub(crate) fn non_space_class() -> MultiChar {
    let mut mc = any_byte();
    mc.subtract(&space_class());
    mc
}

/// `\w`: word characters, `[0-9A-Za-z_]`.
pub(crate) fn word_class() -> MultiChar {
    let mut mc = MultiChar::new();
    mc.set_span(b'0' as u32, b'9' as u32);
    mc.set_span(b'A' as u32, b'Z' as u32);
    mc.set_span(b'a' as u32, b'z' as u32);
    mc.set(b'_' as u32);
    mc
}

/// `\W`: complement of `\w`.
pub(crate) fn non_word_class() -> MultiChar {
    let mut mc = any_byte();
    mc.subtract(&word_class());
    mc
}

/// Expand a class escape letter (one of `dDsSwW`) into its `MultiChar`.
///
/// Returns `None` if `c` is not a recognised class escape letter.
pub(crate) fn char_to_class(c: char) -> Option<MultiChar> {
    match c {
        'd' => Some(digit_class()),
        'D' => Some(non_digit_class()),
        's' => Some(space_class()),
        'S' => Some(non_space_class()),
        'w' => Some(word_class()),
        'W' => Some(non_word_class()),
        _ => None,
    }
}

/// Fold case on a `MultiChar` restricted to ordinary bytes: for every set ASCII
/// letter, also set its opposite-case counterpart. End-mark bits are left untouched.
pub(crate) fn fold_ascii_case(mc: &MultiChar) -> MultiChar {
    let mut out = mc.clone();
    for b in b'a'..=b'z' {
        if mc.get(b as u32) {
            out.set((b - 32) as u32);
        }
    }
    for b in b'A'..=b'Z' {
        if mc.get(b as u32) {
            out.set((b + 32) as u32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_mark_roundtrip() {
        let sym = end_mark_for(7);
        assert!(is_end_mark(sym));
        assert_eq!(result_of_end_mark(sym), 7);
        assert!(!is_end_mark(255));
    }

    #[test]
    fn digit_and_non_digit_partition_bytes() {
        let d = digit_class();
        let nd = non_digit_class();
        assert!(!d.has_intersection(&nd));
        let mut u = d.clone();
        u.union_with(&nd);
        assert_eq!(u.population(), 256);
    }

    #[test]
    fn word_class_contents() {
        let w = word_class();
        assert!(w.get(b'_' as u32));
        assert!(w.get(b'a' as u32));
        assert!(w.get(b'9' as u32));
        assert!(!w.get(b' ' as u32));
    }

    #[test]
    fn fold_case_adds_counterpart() {
        let mc = single_byte(b'a');
        let folded = fold_ascii_case(&mc);
        assert!(folded.get(b'a' as u32));
        assert!(folded.get(b'A' as u32));
    }

    #[test]
    fn char_to_class_rejects_unknown_letter() {
        assert!(char_to_class('x').is_none());
        assert!(char_to_class('d').is_some());
    }
}
