//! Identifiers for source units.

use std::fmt;

/// An interned identifier for a source unit.
///
/// `UnitId` is a lightweight handle (just a u32) that uniquely identifies
/// one compiled file for the lifetime of a [`UnitSet`](crate::unit::UnitSet).
/// The path is stored in the set; every accumulator, queue and engine call
/// refers to units by this id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitId(pub u32);

impl UnitId {
    /// Create a new UnitId from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

impl From<u32> for UnitId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<UnitId> for u32 {
    #[inline]
    fn from(id: UnitId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_unit_id_ordering() {
        let mut ids = vec![UnitId::new(3), UnitId::new(1), UnitId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![UnitId::new(1), UnitId::new(2), UnitId::new(3)]);
    }

    #[test]
    fn test_unit_id_dedup_in_set() {
        let mut set = FxHashSet::default();
        set.insert(UnitId::new(7));
        set.insert(UnitId::new(7));
        set.insert(UnitId::from(8));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId::new(4).to_string(), "unit#4");
        assert_eq!(format!("{:?}", UnitId::new(4)), "UnitId(4)");
    }
}
