use std::fmt;

/// Boolean tags attached to a target vertex, packed into a small bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TargetTags(u16);

impl TargetTags {
    pub const EXECUTABLE: TargetTags = TargetTags(1 << 0);
    pub const TEST: TargetTags = TargetTags(1 << 1);
    pub const NO_BUILD: TargetTags = TargetTags(1 << 2);
    pub const MANUAL: TargetTags = TargetTags(1 << 3);
    pub const LIBRARY: TargetTags = TargetTags(1 << 4);

    #[inline]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: TargetTags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, other: TargetTags) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    #[must_use]
    pub const fn without(self, other: TargetTags) -> Self {
        Self(self.0 & !other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TargetTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (mask, name) in [
            (Self::EXECUTABLE, "EXECUTABLE"),
            (Self::TEST, "TEST"),
            (Self::NO_BUILD, "NO_BUILD"),
            (Self::MANUAL, "MANUAL"),
            (Self::LIBRARY, "LIBRARY"),
        ] {
            if self.contains(mask) {
                set.entry(&name);
            }
        }
        set.finish()
    }
}

/// Display flag of a target-tree entry, derived from [`TargetTags`] with a
/// first-match-wins rule: TEST beats EXECUTABLE beats NO_BUILD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeFlag {
    Testable,
    Runnable,
    NoBuild,
}

impl TreeFlag {
    pub fn derive(tags: TargetTags) -> Option<TreeFlag> {
        if tags.contains(TargetTags::TEST) {
            Some(TreeFlag::Testable)
        } else if tags.contains(TargetTags::EXECUTABLE) {
            Some(TreeFlag::Runnable)
        } else if tags.contains(TargetTags::NO_BUILD) {
            Some(TreeFlag::NoBuild)
        } else {
            None
        }
    }
}
