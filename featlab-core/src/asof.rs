//! Vintage Index and As-Of Join Engine.
//!
//! A fact stream for one entity is held as a [`Timeline`], sorted once by
//! `(knowledge_date, tie_key)`. An as-of lookup is a binary search for the
//! last fact whose knowledge date is on or before the query date.
//!
//! Selection rule, for every stream:
//! - facts with `knowledge_date > as_of` are invisible;
//! - `knowledge_date == as_of` is visible;
//! - among visible facts the maximum knowledge date wins, then the maximum
//!   tie key, then the fact that came last in the input snapshot.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;

/// A fact with a public knowledge date.
pub trait Vintage {
    /// Secondary ordering among facts sharing a knowledge date. Larger wins.
    type TieKey: Ord;

    fn knowledge_date(&self) -> NaiveDate;

    fn tie_key(&self) -> Self::TieKey;
}

/// One entity's facts, sorted by `(knowledge_date, tie_key)`.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    facts: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { facts: Vec::new() }
    }
}

impl<T: Vintage> Timeline<T> {
    /// Build from facts in snapshot order. The sort is stable so exact
    /// duplicates of `(knowledge_date, tie_key)` keep snapshot order.
    pub fn new(mut facts: Vec<T>) -> Self {
        facts.sort_by(|a, b| {
            a.knowledge_date()
                .cmp(&b.knowledge_date())
                .then_with(|| a.tie_key().cmp(&b.tie_key()))
        });
        Self { facts }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn facts(&self) -> &[T] {
        &self.facts
    }

    /// Number of facts visible on `as_of`.
    fn visible_count(&self, as_of: NaiveDate) -> usize {
        self.facts.partition_point(|f| f.knowledge_date() <= as_of)
    }

    /// The most recent fact known on `as_of`, or `None`.
    pub fn as_of(&self, as_of: NaiveDate) -> Option<&T> {
        let n = self.visible_count(as_of);
        n.checked_sub(1).map(|i| &self.facts[i])
    }

    /// As-of lookups for a batch of ascending dates in one pass.
    ///
    /// Returns one result per input date. `dates` must be sorted ascending;
    /// the result for each date equals `self.as_of(date)`.
    pub fn sweep(&self, dates: &[NaiveDate]) -> Vec<Option<&T>> {
        debug_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        let mut out = Vec::with_capacity(dates.len());
        let mut cursor = 0usize;
        for &date in dates {
            while cursor < self.facts.len() && self.facts[cursor].knowledge_date() <= date {
                cursor += 1;
            }
            out.push(cursor.checked_sub(1).map(|i| &self.facts[i]));
        }
        out
    }
}

/// Fact streams keyed by entity (symbol or series id).
#[derive(Debug, Clone)]
pub struct VintageIndex<K, T> {
    timelines: HashMap<K, Timeline<T>>,
}

impl<K, T> Default for VintageIndex<K, T> {
    fn default() -> Self {
        Self {
            timelines: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, T: Vintage> VintageIndex<K, T> {
    /// Group facts by key and sort each group once.
    pub fn build<I, F>(facts: I, key_of: F) -> Self
    where
        I: IntoIterator<Item = T>,
        F: Fn(&T) -> K,
    {
        let mut groups: HashMap<K, Vec<T>> = HashMap::new();
        for fact in facts {
            groups.entry(key_of(&fact)).or_default().push(fact);
        }
        let timelines = groups
            .into_iter()
            .map(|(k, v)| (k, Timeline::new(v)))
            .collect();
        Self { timelines }
    }

    pub fn timeline<Q>(&self, key: &Q) -> Option<&Timeline<T>>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.timelines.get(key)
    }

    /// `asOf(entityKey, asOfDate)`. An unknown key is absence, not an error.
    pub fn as_of<Q>(&self, key: &Q, as_of: NaiveDate) -> Option<&T>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.timelines.get(key).and_then(|t| t.as_of(as_of))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.timelines.keys()
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Total facts across all keys.
    pub fn fact_count(&self) -> usize {
        self.timelines.values().map(Timeline::len).sum()
    }
}

/// Reference as-of over an unsorted stream: linear scan, same selection rule.
///
/// O(n) per query. Kept for tests and benchmarks as the oracle the indexed
/// engine is checked against.
pub fn as_of_unsorted<T: Vintage>(facts: &[T], as_of: NaiveDate) -> Option<&T> {
    let mut best: Option<&T> = None;
    for fact in facts {
        if fact.knowledge_date() > as_of {
            continue;
        }
        best = match best {
            None => Some(fact),
            Some(b) => {
                let newer = (fact.knowledge_date(), fact.tie_key()) >= (b.knowledge_date(), b.tie_key());
                if newer {
                    Some(fact)
                } else {
                    Some(b)
                }
            }
        };
    }
    best
}
