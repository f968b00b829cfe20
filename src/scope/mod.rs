//! Scope algebra (C1).
//!
//! A [`Scope`] represents the subset of usage conditions under which a
//! license clause or compatibility verdict holds. It is a map from
//! *protect-scope* tokens (either [`UNIVERSE`] or a specific usage
//! condition, e.g. `STATIC_LINKING`) to a set of *escape-scope* tokens:
//! semantically, a scope is the set of usage conditions named by its keys,
//! minus the escapes listed against each key.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{BitAnd, BitOr, Not};

use serde::{Deserialize, Serialize};

/// The protect-scope token meaning "every usage condition".
pub const UNIVERSE: &str = "UNIVERSAL";

/// The four usage conditions a front-end may tag a project-graph node with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageCondition {
    Compile,
    StaticLinking,
    DynamicLinking,
    Executable,
}

impl UsageCondition {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Compile => "COMPILE",
            Self::StaticLinking => "STATIC_LINKING",
            Self::DynamicLinking => "DYNAMIC_LINKING",
            Self::Executable => "EXECUTABLE",
        }
    }

    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Compile,
            Self::StaticLinking,
            Self::DynamicLinking,
            Self::Executable,
        ]
    }
}

/// A set of usage conditions, represented as protect-scope tokens minus escapes.
///
/// Uses `BTreeMap`/`BTreeSet` rather than hash collections so that
/// serialisation (and therefore inference-determinism snapshots, see
/// `SPEC_FULL.md` §8) does not depend on hash iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(BTreeMap<String, BTreeSet<String>>);

impl Scope {
    /// The empty scope — no usage condition is covered.
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// The universal scope — every usage condition is covered.
    #[must_use]
    pub fn universe() -> Self {
        Self(BTreeMap::from([(UNIVERSE.to_string(), BTreeSet::new())]))
    }

    /// Build a scope from a single protect-scope token with no escapes.
    #[must_use]
    pub fn single(token: impl Into<String>) -> Self {
        Self(BTreeMap::from([(token.into(), BTreeSet::new())]))
    }

    /// Build a scope from protect-scope tokens, each escaping the same set.
    #[must_use]
    pub fn from_protect_escape<I, J>(protect: I, escape: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        let escapes: BTreeSet<String> = escape.into_iter().map(Into::into).collect();
        let map = protect
            .into_iter()
            .map(|k| (k.into(), escapes.clone()))
            .collect();
        Self(map).simplify()
    }

    /// Parse a scope from its JSON object serialisation (`{token: [escapes…]}`).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialise this scope to its canonical JSON object form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Scope serialisation is infallible")
    }

    #[must_use]
    pub fn protect_scope(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// True iff this scope, once simplified, covers every usage condition.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        let simplified = self.simplify();
        simplified
            .0
            .get(UNIVERSE)
            .is_some_and(BTreeSet::is_empty)
    }

    /// True iff this scope, once simplified, covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.simplify().0.is_empty()
    }

    /// Idempotent normalisation: drop redundant entries once `UNIVERSE` with
    /// no escapes is present, and drop any key that escapes itself.
    #[must_use]
    pub fn simplify(&self) -> Self {
        if self.0.get(UNIVERSE).is_some_and(BTreeSet::is_empty) {
            return Self(BTreeMap::from([(UNIVERSE.to_string(), BTreeSet::new())]));
        }

        let map = self
            .0
            .iter()
            .filter(|(k, escapes)| !escapes.contains(*k))
            .map(|(k, escapes)| (k.clone(), escapes.clone()))
            .collect();
        Self(map)
    }

    /// Set-theoretic intersection.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let a = self.simplify();
        let b = other.simplify();

        let mut new: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        if let Some(universe_escapes) = a.0.get(UNIVERSE) {
            for (k, escapes) in &b.0 {
                new.entry(k.clone())
                    .or_default()
                    .extend(escapes.iter().cloned());
                new.get_mut(k)
                    .unwrap()
                    .extend(universe_escapes.iter().cloned());
            }
        }

        if let Some(universe_escapes) = b.0.get(UNIVERSE) {
            for (k, escapes) in &a.0 {
                new.entry(k.clone())
                    .or_default()
                    .extend(escapes.iter().cloned());
                new.get_mut(k)
                    .unwrap()
                    .extend(universe_escapes.iter().cloned());
            }
        }

        for (k, escapes_a) in &a.0 {
            if let Some(escapes_b) = b.0.get(k) {
                let entry = new.entry(k.clone()).or_default();
                entry.extend(escapes_a.iter().cloned());
                entry.extend(escapes_b.iter().cloned());
            }
        }

        Self(new).simplify()
    }

    /// Set-theoretic union.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let a = self.simplify();
        let b = other.simplify();

        let mut new: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (k, escapes_a) in &a.0 {
            match b.0.get(k) {
                Some(escapes_b) => {
                    let intersection: BTreeSet<String> =
                        escapes_a.intersection(escapes_b).cloned().collect();
                    new.insert(k.clone(), intersection);
                }
                None => {
                    new.insert(k.clone(), escapes_a.clone());
                }
            }
        }

        for (k, escapes_b) in &b.0 {
            new.entry(k.clone()).or_insert_with(|| escapes_b.clone());
        }

        Self(new).simplify()
    }

    /// `self ⊇ other`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let a = self.simplify();
        let b = other.simplify();

        let mut uncovered: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (k, escapes_b) in &b.0 {
            match a.0.get(k) {
                Some(escapes_a) => {
                    let remaining: BTreeSet<String> =
                        escapes_a.difference(escapes_b).cloned().collect();
                    if !remaining.is_empty() {
                        uncovered.insert(k.clone(), remaining);
                    }
                }
                None => {
                    uncovered.insert(k.clone(), escapes_b.clone());
                }
            }
        }

        if uncovered.is_empty() {
            return true;
        }

        let Some(universe_escapes) = a.0.get(UNIVERSE) else {
            return false;
        };

        uncovered.keys().all(|k| !universe_escapes.contains(k))
    }

    /// Negation: flip the role of keys and escapes.
    #[must_use]
    pub fn negate(&self) -> Self {
        let simplified = self.simplify();
        if simplified.0.is_empty() {
            return Self::universe();
        }

        let mut new: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (k, escapes) in &simplified.0 {
            for escape in escapes {
                let entry = new.entry(escape.clone()).or_default();
                if k == UNIVERSE {
                    // Negating a universal-with-escapes entry: the escape
                    // becomes unconditionally covered.
                    continue;
                }
                entry.insert(k.clone());
            }
        }
        Self(new).simplify()
    }
}

impl BitAnd for &Scope {
    type Output = Scope;
    fn bitand(self, rhs: Self) -> Scope {
        self.intersect(rhs)
    }
}

impl BitOr for &Scope {
    type Output = Scope;
    fn bitor(self, rhs: Self) -> Scope {
        self.union(rhs)
    }
}

impl Not for &Scope {
    type Output = Scope;
    fn not(self) -> Scope {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("COMPILE".to_string()),
            Just("STATIC_LINKING".to_string()),
            Just("DYNAMIC_LINKING".to_string()),
            Just("EXECUTABLE".to_string()),
        ]
    }

    fn scope_strategy() -> impl Strategy<Value = Scope> {
        prop_oneof![
            Just(Scope::empty()),
            Just(Scope::universe()),
            proptest::collection::vec(token_strategy(), 0..4).prop_map(|tokens| {
                let mut s = Scope::empty();
                for t in tokens {
                    s = s.union(&Scope::single(t));
                }
                s
            }),
        ]
    }

    #[test]
    fn universe_is_universal() {
        assert!(Scope::universe().is_universal());
        assert!(!Scope::empty().is_universal());
    }

    #[test]
    fn empty_scope_is_falsy() {
        assert!(Scope::empty().is_empty());
        assert!(!Scope::universe().is_empty());
    }

    #[test]
    fn single_key_escaping_itself_is_dropped() {
        let s = Scope::from_protect_escape(["COMPILE"], ["COMPILE"]);
        assert!(s.is_empty());
    }

    #[test]
    fn negate_empty_is_universe() {
        assert_eq!(Scope::empty().negate(), Scope::universe());
    }

    #[test]
    fn json_round_trip() {
        let s = Scope::from_protect_escape(["STATIC_LINKING"], ["COMPILE"]);
        let json = s.to_json();
        let back = Scope::from_json(&json).unwrap();
        assert_eq!(s.simplify(), back.simplify());
    }

    proptest! {
        #[test]
        fn idempotence_and(x in scope_strategy()) {
            prop_assert_eq!(x.intersect(&x), x.simplify());
        }

        #[test]
        fn idempotence_or(x in scope_strategy()) {
            prop_assert_eq!(x.union(&x), x.simplify());
        }

        #[test]
        fn commutative_and(x in scope_strategy(), y in scope_strategy()) {
            prop_assert_eq!(x.intersect(&y), y.intersect(&x));
        }

        #[test]
        fn commutative_or(x in scope_strategy(), y in scope_strategy()) {
            prop_assert_eq!(x.union(&y), y.union(&x));
        }

        #[test]
        fn and_universe_absorbs(x in scope_strategy()) {
            prop_assert_eq!(x.intersect(&Scope::universe()), x.simplify());
        }

        #[test]
        fn or_empty_absorbs(x in scope_strategy()) {
            prop_assert_eq!(x.union(&Scope::empty()), x.simplify());
        }

        #[test]
        fn and_empty_is_empty(x in scope_strategy()) {
            prop_assert!(x.intersect(&Scope::empty()).is_empty());
        }

        #[test]
        fn contains_iff_union_is_self(x in scope_strategy(), y in scope_strategy()) {
            let contains = x.contains(&y);
            let union_is_x = x.union(&y) == x.simplify();
            prop_assert_eq!(contains, union_is_x);
        }

        #[test]
        fn containment_compatible_with_intersection(
            x in scope_strategy(), y in scope_strategy(), z in scope_strategy()
        ) {
            if x.contains(&y) {
                prop_assert!(x.intersect(&z).contains(&y.intersect(&z)));
            }
        }
    }
}
