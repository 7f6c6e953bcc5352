//! Per-pattern flags and the supported pattern languages.

use std::ops::{BitOr, BitOrAssign, Sub, SubAssign};

/// Per-pattern compile flags, set explicitly via [`Flags`] or inferred by `add_auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u8);

impl Flags {
    /// Fold ASCII case: wherever a transition accepts a letter, also accept its
    /// opposite-case counterpart.
    pub const IGNORE_CASE: Flags = Flags(1 << 0);
    /// Prepend an implicit `.*`, allowing the match to start anywhere in the input.
    pub const LOOSE_START: Flags = Flags(1 << 1);
    /// Append an implicit `.*`, allowing trailing bytes after the match.
    pub const LOOSE_END: Flags = Flags(1 << 2);

    /// No flags set.
    pub const fn empty() -> Self {
        Flags(0)
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl Sub for Flags {
    type Output = Flags;
    fn sub(self, rhs: Flags) -> Flags {
        Flags(self.0 & !rhs.0)
    }
}

impl SubAssign for Flags {
    fn sub_assign(&mut self, rhs: Flags) {
        self.0 &= !rhs.0;
    }
}

/// The surface syntax a pattern is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternLanguage {
    /// Full regex syntax, flags taken literally from the caller.
    Regex,
    /// Full regex syntax, with loose-start/loose-end/ignore-case inferred from
    /// leading/trailing anchors (see `Parser::add_auto`).
    RegexAuto,
    /// Shell-glob syntax (`*`, `?`, `[...]`).
    Glob,
    /// Literal text, matched byte for byte.
    Exact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_compose_and_subtract() {
        let mut f = Flags::empty();
        f |= Flags::LOOSE_START;
        f |= Flags::LOOSE_END;
        assert!(f.contains(Flags::LOOSE_START));
        assert!(f.contains(Flags::LOOSE_END));
        f -= Flags::LOOSE_START;
        assert!(!f.contains(Flags::LOOSE_START));
        assert!(f.contains(Flags::LOOSE_END));
    }
}
