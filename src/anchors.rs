//! Anchor bookkeeping for both directions.
//!
//! - [`AnchorRegistry`]: read path, one per document. Anchor name → materialized value
//!   and value identity → anchor name. Bindings are immutable once made.
//! - [`AnchorAssigner`]: write path pre-pass that finds every container reachable from
//!   more than one position and names it.

use std::collections::{HashMap, HashSet};

use ahash::AHashMap;
use log::trace;
use nohash_hasher::BuildNoHashHasher;

use crate::error::{DecodeError, EncodeError};
use crate::location::Location;
use crate::value::Value;

type IdentityMap<V> = HashMap<usize, V, BuildNoHashHasher<usize>>;
type IdentitySet = HashSet<usize, BuildNoHashHasher<usize>>;

/// Read-path registry. Holds clones of value handles only; the document owns the data.
#[derive(Default)]
pub struct AnchorRegistry {
    by_name: AHashMap<String, Value>,
    by_identity: IdentityMap<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`. Rebinding an existing anchor is `DuplicateAnchor`.
    pub fn register(&mut self, name: &str, value: &Value) -> Result<(), DecodeError> {
        if self.by_name.contains_key(name) {
            return Err(DecodeError::DuplicateAnchor {
                anchor: name.to_owned(),
                location: Location::UNKNOWN,
            });
        }
        trace!("anchor &{name} registered");
        self.by_name.insert(name.to_owned(), value.clone());
        if let Some(id) = value.identity() {
            self.by_identity.insert(id, name.to_owned());
        }
        Ok(())
    }

    /// Value bound to `name`. Only anchors defined earlier in the document resolve.
    pub fn resolve(&self, name: &str) -> Result<Value, DecodeError> {
        self.by_name
            .get(name)
            .cloned()
            .ok_or_else(|| DecodeError::AnchorNotFound {
                anchor: name.to_owned(),
                location: Location::UNKNOWN,
            })
    }

    /// Anchor a container value was registered under.
    pub fn name_of(&self, value: &Value) -> Option<&str> {
        value
            .identity()
            .and_then(|id| self.by_identity.get(&id))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Anchor names chosen for one serialization, plus which ones were already emitted.
#[derive(Debug, Default)]
pub struct WriteAnchors {
    names: IdentityMap<String>,
    emitted: IdentitySet,
}

impl WriteAnchors {
    pub fn name_for(&self, value: &Value) -> Option<&str> {
        value
            .identity()
            .and_then(|id| self.names.get(&id))
            .map(String::as_str)
    }

    /// True once the anchored node was written; later occurrences become aliases.
    pub fn is_emitted(&self, value: &Value) -> bool {
        value.identity().is_some_and(|id| self.emitted.contains(&id))
    }

    pub fn mark_emitted(&mut self, value: &Value) {
        if let Some(id) = value.identity() {
            self.emitted.insert(id);
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Names shared containers `a1`, `a2`, ... in first-sight order, or with a caller
/// supplied generator (called with the 1-based anchor number).
pub struct AnchorAssigner {
    generator: Option<fn(usize) -> String>,
}

impl AnchorAssigner {
    pub fn new(generator: Option<fn(usize) -> String>) -> Self {
        AnchorAssigner { generator }
    }

    /// Walk the graph from `root` in emission order. `expand` pushes the children of a
    /// value in the order they will be emitted.
    pub fn assign<F>(&self, root: &Value, mut expand: F) -> Result<WriteAnchors, EncodeError>
    where
        F: FnMut(&Value, &mut Vec<Value>) -> Result<(), EncodeError>,
    {
        let mut counts: IdentityMap<usize> = IdentityMap::default();
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];
        let mut children = Vec::new();

        while let Some(value) = stack.pop() {
            if let Some(id) = value.identity() {
                let seen = counts.entry(id).or_insert(0);
                *seen += 1;
                if *seen > 1 {
                    continue;
                }
                order.push(id);
            }
            expand(&value, &mut children)?;
            stack.extend(children.drain(..).rev());
        }

        let mut anchors = WriteAnchors::default();
        let mut number = 0usize;
        for id in order {
            if counts.get(&id).is_some_and(|count| *count > 1) {
                number += 1;
                let name = match self.generator {
                    Some(generator) => generator(number),
                    None => format!("a{number}"),
                };
                anchors.names.insert(id, name);
            }
        }
        trace!("anchor pre-pass named {number} shared nodes");
        Ok(anchors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_seq(value: &Value, out: &mut Vec<Value>) -> Result<(), EncodeError> {
        if let Some(seq) = value.as_seq() {
            out.extend(seq.borrow().iter().cloned());
        }
        Ok(())
    }

    #[test]
    fn duplicate_anchor_is_rejected() {
        let mut registry = AnchorRegistry::new();
        registry.register("a", &Value::Int(1)).unwrap();
        let err = registry.register("a", &Value::Int(2)).unwrap_err();
        assert!(matches!(err, DecodeError::DuplicateAnchor { ref anchor, .. } if anchor == "a"));
        assert_eq!(registry.resolve("a").unwrap(), Value::Int(1));
    }

    #[test]
    fn unknown_anchor_is_not_found() {
        let registry = AnchorRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(DecodeError::AnchorNotFound { .. })
        ));
    }

    #[test]
    fn only_shared_nodes_get_names() {
        let shared = Value::seq(vec![Value::Int(1)]);
        let lonely = Value::seq(vec![]);
        let root = Value::seq(vec![shared.clone(), lonely.clone(), shared.clone()]);
        let anchors = AnchorAssigner::new(None).assign(&root, expand_seq).unwrap();
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors.name_for(&shared), Some("a1"));
        assert_eq!(anchors.name_for(&lonely), None);
    }

    #[test]
    fn self_reference_is_named_once() {
        let root = Value::seq(vec![]);
        if let Some(seq) = root.as_seq() {
            seq.borrow_mut().push(root.clone());
        }
        let anchors = AnchorAssigner::new(Some(|n| format!("node{n}")))
            .assign(&root, expand_seq)
            .unwrap();
        assert_eq!(anchors.name_for(&root), Some("node1"));
        // break the cycle so the test does not leak
        if let Some(seq) = root.as_seq() {
            seq.borrow_mut().clear();
        }
    }
}
