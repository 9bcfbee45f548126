use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use ordered_float::OrderedFloat;

/// Sorted set: member to score map plus a `(score, member)` index.
///
/// The index orders equal scores by member bytes, which gives range reads
/// their tie-break.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    by_member: BTreeMap<Bytes, f64>,
    by_score: BTreeSet<(OrderedFloat<f64>, Bytes)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }

    /// Inserts or updates a member. Returns `true` if the member is new.
    pub fn insert(
        &mut self,
        member: Bytes,
        score: f64,
    ) -> bool {
        match self.by_member.insert(member.clone(), score) {
            Some(old) => {
                self.by_score.remove(&(OrderedFloat(old), member.clone()));
                self.by_score.insert((OrderedFloat(score), member));
                false
            }
            None => {
                self.by_score.insert((OrderedFloat(score), member));
                true
            }
        }
    }

    pub fn remove(
        &mut self,
        member: &Bytes,
    ) -> bool {
        match self.by_member.remove(member) {
            Some(score) => {
                self.by_score.remove(&(OrderedFloat(score), member.clone()));
                true
            }
            None => false,
        }
    }

    pub fn score(
        &self,
        member: &[u8],
    ) -> Option<f64> {
        self.by_member.get(member).copied()
    }

    /// Zero-based position in ascending score order.
    pub fn rank(
        &self,
        member: &[u8],
    ) -> Option<usize> {
        let score = self.score(member)?;
        let key = (OrderedFloat(score), Bytes::copy_from_slice(member));
        Some(self.by_score.range(..key).count())
    }

    /// Members in ascending `(score, member)` order.
    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = (&Bytes, f64)> + '_ {
        self.by_score.iter().map(|(s, m)| (m, s.0))
    }

    /// Member to score map, in member order.
    pub fn members(&self) -> &BTreeMap<Bytes, f64> {
        &self.by_member
    }
}

impl From<BTreeMap<Bytes, f64>> for SortedSet {
    fn from(by_member: BTreeMap<Bytes, f64>) -> Self {
        let by_score = by_member
            .iter()
            .map(|(m, s)| (OrderedFloat(*s), m.clone()))
            .collect();
        Self {
            by_member,
            by_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_update_moves_index_entry() {
        let mut z = SortedSet::new();
        assert!(z.insert(b("a"), 1.0));
        assert!(z.insert(b("b"), 2.0));
        assert!(!z.insert(b("a"), 3.0));
        let order: Vec<_> = z.ascending().map(|(m, _)| m.clone()).collect();
        assert_eq!(order, vec![b("b"), b("a")]);
        assert_eq!(z.len(), 2);
    }

    #[test]
    fn test_ties_break_by_member() {
        let mut z = SortedSet::new();
        z.insert(b("c"), 1.0);
        z.insert(b("a"), 1.0);
        z.insert(b("b"), 1.0);
        assert_eq!(z.rank(b"a"), Some(0));
        assert_eq!(z.rank(b"c"), Some(2));
        assert_eq!(z.rank(b"zz"), None);
    }

    #[test]
    fn test_remove_and_infinities() {
        let mut z = SortedSet::new();
        z.insert(b("lo"), f64::NEG_INFINITY);
        z.insert(b("hi"), f64::INFINITY);
        assert_eq!(z.rank(b"hi"), Some(1));
        assert!(z.remove(&b("lo")));
        assert!(!z.remove(&b("lo")));
        assert_eq!(z.score(b"hi"), Some(f64::INFINITY));
    }
}
