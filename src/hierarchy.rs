//! Pointer representation of a dendrogram
//!
//! A hierarchy over `N` objects is given as one parent pointer and one merge
//! distance per object: object `x` joins `parent(x)` at height
//! `merge_distance(x)`. The root points to itself and conventionally has an
//! infinite merge distance. Extraction only ever reads a hierarchy through the
//! [`PointerHierarchy`] trait, so producers can expose their own storage.

use crate::errors::{ExtractionError, Result};
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};

/// Read-only access to a dendrogram in pointer representation.
pub trait PointerHierarchy {
    /// Number of objects in the hierarchy
    fn len(&self) -> usize;

    /// Check if the hierarchy has no objects
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All objects, ordered such that merge distances are non-decreasing and
    /// every object comes before its successor. The root is last.
    fn order(&self) -> &[ObjectId];

    /// The object `x` merges into. The root is its own parent.
    fn parent(&self, x: ObjectId) -> ObjectId;

    /// Height at which `x` joins its parent.
    fn merge_distance(&self, x: ObjectId) -> f64;

    /// Core distance of `x`, if the producer is density based.
    fn core_distance(&self, _x: ObjectId) -> Option<f64> {
        None
    }

    /// Representative object for a member set, used for labeling only.
    fn prototype(&self, _members: &[ObjectId]) -> Option<ObjectId> {
        None
    }

    /// The root object (last in the topological order).
    fn root(&self) -> Option<ObjectId> {
        self.order().last().copied()
    }
}

impl<H: PointerHierarchy + ?Sized> PointerHierarchy for &H {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn order(&self) -> &[ObjectId] {
        (**self).order()
    }

    fn parent(&self, x: ObjectId) -> ObjectId {
        (**self).parent(x)
    }

    fn merge_distance(&self, x: ObjectId) -> f64 {
        (**self).merge_distance(x)
    }

    fn core_distance(&self, x: ObjectId) -> Option<f64> {
        (**self).core_distance(x)
    }

    fn prototype(&self, members: &[ObjectId]) -> Option<ObjectId> {
        (**self).prototype(members)
    }
}

// ============================================================================
// Owned pointer representation
// ============================================================================

/// Serialized shape of a [`PointerRepresentation`], validated on load.
#[derive(Debug, Clone, Deserialize)]
struct RawPointers {
    parent: Vec<ObjectId>,
    distance: Vec<f64>,
    #[serde(default)]
    core_distance: Option<Vec<f64>>,
}

impl TryFrom<RawPointers> for PointerRepresentation {
    type Error = ExtractionError;

    fn try_from(raw: RawPointers) -> Result<Self> {
        let rep = PointerRepresentation::new(raw.parent, raw.distance)?;
        match raw.core_distance {
            Some(core) => rep.with_core_distances(core),
            None => Ok(rep),
        }
    }
}

/// An owned, validated pointer hierarchy.
///
/// Construction checks that the parent pointers form a single tree and
/// precomputes the topological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawPointers")]
pub struct PointerRepresentation {
    parent: Vec<ObjectId>,
    distance: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    core_distance: Option<Vec<f64>>,
    #[serde(skip)]
    order: Vec<ObjectId>,
}

impl PointerRepresentation {
    /// Build a hierarchy from parent pointers and merge distances.
    ///
    /// Fails with [`ExtractionError::StructuralInconsistency`] unless exactly
    /// one object is its own parent and every pointer chain ends there.
    pub fn new(parent: Vec<ObjectId>, distance: Vec<f64>) -> Result<Self> {
        if parent.len() != distance.len() {
            return Err(ExtractionError::structural(format!(
                "{} parent pointers but {} merge distances",
                parent.len(),
                distance.len()
            )));
        }
        check_tree(&parent, &distance)?;
        let order = topological_sort(&parent, &distance);
        Ok(Self {
            parent,
            distance,
            core_distance: None,
            order,
        })
    }

    /// Attach per-object core distances (density-based hierarchies).
    pub fn with_core_distances(mut self, core_distance: Vec<f64>) -> Result<Self> {
        if core_distance.len() != self.parent.len() {
            return Err(ExtractionError::structural(format!(
                "{} core distances for {} objects",
                core_distance.len(),
                self.parent.len()
            )));
        }
        self.core_distance = Some(core_distance);
        Ok(self)
    }

    /// Parent pointers, indexed by object
    pub fn parents(&self) -> &[ObjectId] {
        &self.parent
    }

    /// Merge distances, indexed by object
    pub fn distances(&self) -> &[f64] {
        &self.distance
    }

    /// Core distances, if attached
    pub fn core_distances(&self) -> Option<&[f64]> {
        self.core_distance.as_deref()
    }
}

impl PointerHierarchy for PointerRepresentation {
    fn len(&self) -> usize {
        self.parent.len()
    }

    fn order(&self) -> &[ObjectId] {
        &self.order
    }

    fn parent(&self, x: ObjectId) -> ObjectId {
        self.parent[x]
    }

    fn merge_distance(&self, x: ObjectId) -> f64 {
        self.distance[x]
    }

    fn core_distance(&self, x: ObjectId) -> Option<f64> {
        self.core_distance.as_ref().map(|c| c[x])
    }
}

/// Verify that `parent` describes one tree with a self-referencing root.
fn check_tree(parent: &[ObjectId], distance: &[f64]) -> Result<()> {
    let n = parent.len();
    if n == 0 {
        return Ok(());
    }

    let mut root = None;
    for (x, &p) in parent.iter().enumerate() {
        if p >= n {
            return Err(ExtractionError::structural(format!(
                "object {x} points to {p}, outside of 0..{n}"
            )));
        }
        if p == x {
            if let Some(other) = root {
                return Err(ExtractionError::structural(format!(
                    "objects {other} and {x} are both roots"
                )));
            }
            root = Some(x);
        } else if distance[x].is_nan() {
            return Err(ExtractionError::structural(format!(
                "object {x} has an undefined merge distance"
            )));
        }
    }
    if root.is_none() {
        return Err(ExtractionError::structural(
            "no object is its own parent (missing root)",
        ));
    }

    // 0 = unvisited, 1 = on the current chain, 2 = known to reach the root
    let mut state = vec![0u8; n];
    let mut chain = Vec::new();
    for start in 0..n {
        let mut x = start;
        while state[x] == 0 {
            state[x] = 1;
            chain.push(x);
            if parent[x] == x {
                break;
            }
            x = parent[x];
        }
        if state[x] == 1 && parent[x] != x {
            return Err(ExtractionError::structural(format!(
                "pointer cycle through object {x} does not reach the root"
            )));
        }
        for y in chain.drain(..) {
            state[y] = 2;
        }
    }
    Ok(())
}

/// Order objects by merge distance such that, within ties, every object
/// precedes its parent. The root ends up last.
fn topological_sort(parent: &[ObjectId], distance: &[f64]) -> Vec<ObjectId> {
    let n = parent.len();
    let mut sorted: Vec<ObjectId> = (0..n).collect();
    sorted.sort_by(|&a, &b| {
        let da = if parent[a] == a { f64::INFINITY } else { distance[a] };
        let db = if parent[b] == b { f64::INFINITY } else { distance[b] };
        da.total_cmp(&db).then(a.cmp(&b))
    });

    let mut seen = vec![false; n];
    let mut order = Vec::with_capacity(n);
    // Walk from the top; unseen parents of an object are placed right after it.
    for &x in sorted.iter().rev() {
        if seen[x] {
            continue;
        }
        seen[x] = true;
        let begin = order.len();
        order.push(x);
        let mut prev = x;
        while parent[prev] != prev {
            let p = parent[prev];
            if seen[p] {
                break;
            }
            seen[p] = true;
            order.push(p);
            prev = p;
        }
        order[begin..].reverse();
    }
    order.reverse();
    order
}

// ============================================================================
// Prototype lookup
// ============================================================================

/// Wraps a hierarchy with a prototype lookup for cluster labeling.
///
/// Clusters built from a hierarchy with prototypes carry a
/// [`DendrogramModel::WithPrototype`](crate::clustering::DendrogramModel)
/// model whenever the lookup returns a representative.
pub struct WithPrototypes<H, F> {
    inner: H,
    finder: F,
}

impl<H, F> WithPrototypes<H, F>
where
    H: PointerHierarchy,
    F: Fn(&[ObjectId]) -> Option<ObjectId>,
{
    pub fn new(inner: H, finder: F) -> Self {
        Self { inner, finder }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H, F> PointerHierarchy for WithPrototypes<H, F>
where
    H: PointerHierarchy,
    F: Fn(&[ObjectId]) -> Option<ObjectId>,
{
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn order(&self) -> &[ObjectId] {
        self.inner.order()
    }

    fn parent(&self, x: ObjectId) -> ObjectId {
        self.inner.parent(x)
    }

    fn merge_distance(&self, x: ObjectId) -> f64 {
        self.inner.merge_distance(x)
    }

    fn core_distance(&self, x: ObjectId) -> Option<f64> {
        self.inner.core_distance(x)
    }

    fn prototype(&self, members: &[ObjectId]) -> Option<ObjectId> {
        (self.finder)(members)
    }
}
