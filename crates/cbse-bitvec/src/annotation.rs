// SPDX-License-Identifier: AGPL-3.0

//! Annotation propagation for symbolic expressions.
//!
//! Detection modules need to attach metadata to specific symbolic values as
//! they flow through execution (for example: "this value came from an
//! addition that could have overflowed"). Z3 ASTs have no spare field to
//! carry such metadata, so annotations are tracked in a side table keyed by
//! the expression's textual identity, the same reverse-lookup-by-string
//! approach `KeccakRegistry` uses in cbse-sevm.
//!
//! Every binary operator unions its operands' annotation entries into the
//! result's entry (`union_binary`); unary operators carry the operand's
//! entry forward unchanged (`union_unary`); `ite` unions all three branches
//! (`union_ternary`). Callers key these by `annotation_key()` right after
//! computing the result, so ordinary arithmetic propagates annotations
//! without every detection module having to re-derive them by hand.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A piece of metadata attached to a symbolic expression.
///
/// Implementors are plain data; `as_any` lets detection modules recover
/// their concrete type from the type-erased store.
pub trait Annotation: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug> Annotation for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Side table mapping an expression's identity (its string form) to the
/// annotations attached to it. Stored as `Rc` rather than `Box` so that
/// unioning two operands' entries into a result's entry is a cheap pointer
/// clone, not a deep copy, and so the whole store can be cloned across a
/// branch without losing what it carries.
#[derive(Debug, Default, Clone)]
pub struct AnnotationStore {
    entries: HashMap<String, Vec<Rc<dyn Annotation>>>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Attach an annotation to the expression identified by `key`.
    pub fn annotate(&mut self, key: impl Into<String>, annotation: impl Annotation + 'static) {
        self.entries
            .entry(key.into())
            .or_default()
            .push(Rc::new(annotation));
    }

    /// Fetch all annotations of type `T` attached to `key`.
    pub fn get<T: 'static>(&self, key: &str) -> Vec<&T> {
        self.entries
            .get(key)
            .map(|v| v.iter().filter_map(|a| a.as_any().downcast_ref::<T>()).collect())
            .unwrap_or_default()
    }

    /// True if `key` carries at least one annotation of type `T`.
    pub fn has<T: 'static>(&self, key: &str) -> bool {
        !self.get::<T>(key).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union `left`'s and `right`'s annotation entries into `result`'s entry.
    ///
    /// This is the binary-operator propagation rule (spec invariant: the
    /// result's annotation multiset equals the multiset sum of the
    /// operands'). If `left` and `right` are the same key (e.g. `a + a`),
    /// that key's entries are counted twice, which is the correct multiset
    /// sum. A no-op when neither operand carries any annotation.
    pub fn union_binary(&mut self, result: &str, left: &str, right: &str) {
        let mut merged: Vec<Rc<dyn Annotation>> = Vec::new();
        if let Some(v) = self.entries.get(left) {
            merged.extend(v.iter().cloned());
        }
        if let Some(v) = self.entries.get(right) {
            merged.extend(v.iter().cloned());
        }
        if merged.is_empty() {
            return;
        }
        self.entries.entry(result.to_string()).or_default().extend(merged);
    }

    /// Carry `operand`'s annotation entry forward to `result` unchanged
    /// (the unary-operator propagation rule).
    pub fn union_unary(&mut self, result: &str, operand: &str) {
        if let Some(v) = self.entries.get(operand).cloned() {
            if !v.is_empty() {
                self.entries.entry(result.to_string()).or_default().extend(v);
            }
        }
    }

    /// Union all three operands of an `ite(cond, a, b)` into `result`.
    pub fn union_ternary(&mut self, result: &str, cond: &str, a: &str, b: &str) {
        let mut merged: Vec<Rc<dyn Annotation>> = Vec::new();
        for key in [cond, a, b] {
            if let Some(v) = self.entries.get(key) {
                merged.extend(v.iter().cloned());
            }
        }
        if merged.is_empty() {
            return;
        }
        self.entries.entry(result.to_string()).or_default().extend(merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Flag(u8);

    #[test]
    fn annotate_and_fetch() {
        let mut store = AnnotationStore::new();
        store.annotate("x+y", Flag(7));
        let found = store.get::<Flag>("x+y");
        assert_eq!(found, vec![&Flag(7)]);
    }

    #[test]
    fn missing_key_returns_empty() {
        let store = AnnotationStore::new();
        assert!(store.get::<Flag>("nope").is_empty());
        assert!(!store.has::<Flag>("nope"));
    }

    #[test]
    fn clone_preserves_entries() {
        let mut store = AnnotationStore::new();
        store.annotate("a", Flag(1));
        let cloned = store.clone();
        assert!(!cloned.is_empty());
        assert_eq!(cloned.get::<Flag>("a"), vec![&Flag(1)]);
    }

    #[test]
    fn union_binary_sums_both_operands() {
        let mut store = AnnotationStore::new();
        store.annotate("a", Flag(1));
        store.annotate("b", Flag(2));
        store.union_binary("a+b", "a", "b");
        let mut found: Vec<u8> = store.get::<Flag>("a+b").into_iter().map(|f| f.0).collect();
        found.sort();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn union_binary_doubles_when_operands_share_a_key() {
        let mut store = AnnotationStore::new();
        store.annotate("a", Flag(1));
        store.union_binary("a+a", "a", "a");
        assert_eq!(store.get::<Flag>("a+a").len(), 2);
    }

    #[test]
    fn union_binary_is_noop_when_neither_operand_annotated() {
        let mut store = AnnotationStore::new();
        store.union_binary("a+b", "a", "b");
        assert!(store.is_empty());
    }

    #[test]
    fn union_unary_carries_entry_forward() {
        let mut store = AnnotationStore::new();
        store.annotate("a", Flag(9));
        store.union_unary("!a", "a");
        assert_eq!(store.get::<Flag>("!a"), vec![&Flag(9)]);
    }

    #[test]
    fn union_ternary_sums_all_three() {
        let mut store = AnnotationStore::new();
        store.annotate("c", Flag(1));
        store.annotate("a", Flag(2));
        store.annotate("b", Flag(3));
        store.union_ternary("ite", "c", "a", "b");
        let mut found: Vec<u8> = store.get::<Flag>("ite").into_iter().map(|f| f.0).collect();
        found.sort();
        assert_eq!(found, vec![1, 2, 3]);
    }
}
