//! # Schema Graph
//!
//! Resolves a root document (plus whatever other documents it references in
//! the [`SchemaStore`]) into an arena of [`SchemaNode`]s.
//!
//! ## Design
//!
//! A schema is a directed graph with two kinds of edges:
//!
//! - parent → child edges through structural keywords (`properties`,
//!   `oneOf`, `items`, …). The graph owns every child.
//! - `$ref` edges. A reference holds the [`NodeId`] of its target and owns
//!   nothing.
//!
//! Nodes are interned by canonical [`SchemaLocation`], so a fragment reached
//! both structurally and through a `$ref` is a single node, and recursive
//! schemas close into cycles instead of unrolling. Resolution is therefore
//! idempotent and cycle-tolerant by construction.
//!
//! Every `$ref` must resolve to an existing fragment; the first one that does
//! not aborts resolution with [`ResolutionError::DanglingReference`].
//!
//! ## Limitations
//!
//! Only a document's root `$id` affects resolution: relative references
//! resolve against it, and absolute references to it reach the document
//! whatever key it was registered under. Nested `$id`s do not rebase
//! references, and plain-name fragments (`#foo` anchors) are rejected as
//! malformed.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use discrim_core::{InstanceType, JsonPointer, ResolutionError, SchemaError, SchemaLocation};

use crate::keywords::{is_annotation, structure_of, Structure};
use crate::store::SchemaStore;

/// Index of a node in its [`SchemaGraph`]. Only meaningful for the graph
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The raw content of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaBody {
    /// `true` accepts everything, `false` nothing.
    Bool(bool),
    /// Keyword name → raw keyword value.
    Object(Map<String, Value>),
}

/// Child nodes owned through one structural keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    Single(NodeId),
    List(Vec<NodeId>),
    Map(Vec<(String, NodeId)>),
}

impl Children {
    /// All child ids, in declaration order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            Self::Single(id) => vec![*id],
            Self::List(ids) => ids.clone(),
            Self::Map(entries) => entries.iter().map(|(_, id)| *id).collect(),
        }
    }
}

/// One resolved schema fragment.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    location: SchemaLocation,
    body: SchemaBody,
    declared_types: Option<Vec<InstanceType>>,
    children: Vec<(String, Children)>,
    reference: Option<NodeId>,
}

impl SchemaNode {
    /// Canonical location (document + pointer).
    pub fn location(&self) -> &SchemaLocation {
        &self.location
    }

    pub fn body(&self) -> &SchemaBody {
        &self.body
    }

    /// `Some(b)` for a boolean schema.
    pub fn as_bool(&self) -> Option<bool> {
        match self.body {
            SchemaBody::Bool(b) => Some(b),
            SchemaBody::Object(_) => None,
        }
    }

    /// Raw value of keyword `name`.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        match &self.body {
            SchemaBody::Object(map) => map.get(name),
            SchemaBody::Bool(_) => None,
        }
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.keyword(name).is_some()
    }

    /// All keywords of an object schema; empty for boolean schemas.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Value)> {
        let map = match &self.body {
            SchemaBody::Object(map) => Some(map),
            SchemaBody::Bool(_) => None,
        };
        map.into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// The parsed `type` keyword, if declared.
    pub fn declared_types(&self) -> Option<&[InstanceType]> {
        self.declared_types.as_deref()
    }

    /// Children of every structural keyword, in declaration order.
    pub fn all_children(&self) -> &[(String, Children)] {
        &self.children
    }

    /// Children under structural keyword `name`.
    pub fn children(&self, name: &str) -> Option<&Children> {
        self.children
            .iter()
            .find(|(keyword, _)| keyword == name)
            .map(|(_, children)| children)
    }

    /// The single child under `name` (`not`, `additionalProperties`, …).
    pub fn child(&self, name: &str) -> Option<NodeId> {
        match self.children(name)? {
            Children::Single(id) => Some(*id),
            _ => None,
        }
    }

    /// The child list under `name` (`oneOf`, `allOf`, …).
    pub fn child_list(&self, name: &str) -> Option<&[NodeId]> {
        match self.children(name)? {
            Children::List(ids) => Some(ids),
            _ => None,
        }
    }

    /// The named children under `name` (`properties`, …).
    pub fn child_map(&self, name: &str) -> Option<&[(String, NodeId)]> {
        match self.children(name)? {
            Children::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The subschema at `properties/<name>`.
    pub fn property(&self, name: &str) -> Option<NodeId> {
        self.child_map("properties")?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, id)| *id)
    }

    /// Whether `required` lists `name`.
    pub fn requires(&self, name: &str) -> bool {
        self.keyword("required")
            .and_then(Value::as_array)
            .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(name)))
    }

    /// Target of this node's `$ref`.
    pub fn reference(&self) -> Option<NodeId> {
        self.reference
    }

    /// A `$ref` whose siblings are all annotations: the node is nothing but
    /// an alias for its target.
    pub fn is_pure_reference(&self) -> bool {
        match &self.body {
            SchemaBody::Object(map) => {
                map.contains_key("$ref")
                    && map.keys().all(|k| k == "$ref" || is_annotation(k))
            }
            SchemaBody::Bool(_) => false,
        }
    }

    /// Structural children plus the reference target.
    fn successors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children
            .iter()
            .flat_map(|(_, children)| children.ids())
            .chain(self.reference)
    }
}

/// Immutable, read-only graph of resolved schema nodes.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    index: HashMap<SchemaLocation, NodeId>,
    root: NodeId,
}

impl SchemaGraph {
    /// Resolve the document registered as `root_document` in `store`.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::UnknownDocument`] if `root_document` is not in the store.
    /// - [`ResolutionError::DanglingReference`] for the first unresolvable `$ref`.
    /// - [`ResolutionError::Malformed`] for structural keywords of the wrong
    ///   shape, non-string `$ref`s, unsupported fragments and bad `type` names.
    pub fn resolve(store: &SchemaStore, root_document: &str) -> Result<Self, ResolutionError> {
        let base = store
            .canonical_base(root_document)
            .ok_or_else(|| ResolutionError::UnknownDocument(root_document.to_string()))?
            .to_string();

        let mut builder = GraphBuilder {
            store,
            nodes: Vec::new(),
            index: HashMap::new(),
            pending: Vec::new(),
        };
        let root_location = SchemaLocation::document_root(base.clone());
        let root = builder
            .intern(root_location, "$ref")?
            .ok_or_else(|| ResolutionError::UnknownDocument(base.clone()))?;

        while let Some(id) = builder.pending.pop() {
            builder.expand(id)?;
        }

        let references = builder.nodes.iter().filter(|n| n.reference.is_some()).count();
        tracing::debug!(
            document = %base,
            nodes = builder.nodes.len(),
            references,
            "resolved schema graph"
        );

        Ok(Self {
            nodes: builder.nodes,
            index: builder.index,
            root,
        })
    }

    /// Resolve a standalone document registered under
    /// [`DEFAULT_BASE_URI`](crate::store::DEFAULT_BASE_URI).
    pub fn from_document(document: Value) -> Result<Self, ResolutionError> {
        let store = SchemaStore::single(document);
        Self::resolve(&store, crate::store::DEFAULT_BASE_URI)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node behind `id`.
    ///
    /// `id` must come from this graph; ids are never shared between graphs.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Look a node up by its canonical location.
    pub fn get(&self, location: &SchemaLocation) -> Option<NodeId> {
        self.index.get(location).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Every `$ref` edge as `(referencing node, target)`.
    pub fn reference_edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes()
            .filter_map(|(id, node)| node.reference.map(|target| (id, target)))
    }

    /// Follow pure references from `id` to the first node with content.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] of kind `CyclicReference` when the chain loops.
    pub fn deref(&self, id: NodeId) -> Result<NodeId, SchemaError> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            let node = self.node(current);
            if !node.is_pure_reference() {
                return Ok(current);
            }
            if !visited.insert(current) {
                return Err(SchemaError::cyclic_reference(self.node(id).location.clone()));
            }
            match node.reference {
                Some(target) => current = target,
                None => return Ok(current),
            }
        }
    }

    /// Find a loop that evaluation would follow without consuming any of the
    /// instance, starting from each of `starts`.
    ///
    /// Only `$ref` and `allOf` edges are followed: both are always taken at
    /// the current instance location. Returns the node whose edge closes the
    /// first such loop.
    pub fn in_place_cycle(&self, starts: impl IntoIterator<Item = NodeId>) -> Option<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unseen,
            Open,
            Done,
        }

        let in_place = |id: NodeId| {
            let node = self.node(id);
            node.child_list("allOf")
                .unwrap_or_default()
                .iter()
                .copied()
                .chain(node.reference)
                .collect::<Vec<_>>()
        };

        let mut marks = vec![Mark::Unseen; self.nodes.len()];
        for start in starts {
            if marks[start.0] != Mark::Unseen {
                continue;
            }
            marks[start.0] = Mark::Open;
            let mut stack = vec![(start, in_place(start), 0usize)];
            while let Some((id, edges, next)) = stack.last_mut() {
                let Some(&target) = edges.get(*next) else {
                    marks[id.0] = Mark::Done;
                    stack.pop();
                    continue;
                };
                *next += 1;
                match marks[target.0] {
                    Mark::Open => return Some(*id),
                    Mark::Done => {}
                    Mark::Unseen => {
                        marks[target.0] = Mark::Open;
                        stack.push((target, in_place(target), 0));
                    }
                }
            }
        }
        None
    }

    /// Whether `id` can reach itself through child or reference edges.
    pub fn is_recursive(&self, id: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = self.node(id).successors().collect();
        while let Some(next) = stack.pop() {
            if next == id {
                return true;
            }
            if visited.insert(next) {
                stack.extend(self.node(next).successors());
            }
        }
        false
    }
}

// ─── Construction ────────────────────────────────────────────────────

/// Which child locations a structural keyword produces.
enum ChildPlan {
    Single,
    List(usize),
    Map(Vec<String>),
}

struct GraphBuilder<'s> {
    store: &'s SchemaStore,
    nodes: Vec<SchemaNode>,
    index: HashMap<SchemaLocation, NodeId>,
    /// Interned nodes whose children and reference are not yet resolved.
    pending: Vec<NodeId>,
}

impl GraphBuilder<'_> {
    /// Return the node at `location`, allocating it on first sight.
    /// `Ok(None)` means nothing exists at `location`.
    fn intern(
        &mut self,
        location: SchemaLocation,
        keyword: &str,
    ) -> Result<Option<NodeId>, ResolutionError> {
        if let Some(&id) = self.index.get(&location) {
            return Ok(Some(id));
        }
        let Some(fragment) = self.store.lookup(&location) else {
            return Ok(None);
        };

        let body = match fragment {
            Value::Bool(b) => SchemaBody::Bool(*b),
            Value::Object(map) => SchemaBody::Object(map.clone()),
            _ => {
                return Err(ResolutionError::Malformed {
                    location,
                    keyword: keyword.to_string(),
                    reason: "expected a schema (object or boolean)".to_string(),
                })
            }
        };
        let declared_types = match fragment.get("type") {
            Some(raw) => Some(parse_types(raw).ok_or_else(|| ResolutionError::Malformed {
                location: location.clone(),
                keyword: "type".to_string(),
                reason: format!("expected a type name or an array of type names, found {raw}"),
            })?),
            None => None,
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            location: location.clone(),
            body,
            declared_types,
            children: Vec::new(),
            reference: None,
        });
        self.index.insert(location, id);
        self.pending.push(id);
        Ok(Some(id))
    }

    /// Resolve the structural children and `$ref` of a freshly interned node.
    fn expand(&mut self, id: NodeId) -> Result<(), ResolutionError> {
        let location = self.nodes[id.0].location.clone();
        let SchemaBody::Object(map) = &self.nodes[id.0].body else {
            return Ok(());
        };

        let mut plans = Vec::new();
        for (keyword, value) in map {
            let Some(structure) = structure_of(keyword) else {
                continue;
            };
            let plan = match (structure, value) {
                (Structure::Single | Structure::SingleOrList, Value::Object(_) | Value::Bool(_)) => {
                    ChildPlan::Single
                }
                (Structure::List | Structure::SingleOrList, Value::Array(items)) => {
                    ChildPlan::List(items.len())
                }
                (Structure::Map, Value::Object(entries)) => {
                    ChildPlan::Map(entries.keys().cloned().collect())
                }
                _ => {
                    return Err(ResolutionError::Malformed {
                        location: location.clone(),
                        keyword: keyword.clone(),
                        reason: format!("unexpected value {value}"),
                    })
                }
            };
            plans.push((keyword.clone(), plan));
        }
        let reference = match map.get("$ref") {
            None => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => {
                return Err(ResolutionError::Malformed {
                    location,
                    keyword: "$ref".to_string(),
                    reason: format!("expected a string, found {other}"),
                })
            }
        };

        let mut children = Vec::with_capacity(plans.len());
        for (keyword, plan) in plans {
            let base = location.join(keyword.clone());
            let resolved = match plan {
                ChildPlan::Single => Children::Single(self.intern_child(base, &keyword)?),
                ChildPlan::List(len) => Children::List(
                    (0..len)
                        .map(|i| self.intern_child(base.join(i.to_string()), &keyword))
                        .collect::<Result<_, _>>()?,
                ),
                ChildPlan::Map(keys) => Children::Map(
                    keys.into_iter()
                        .map(|key| {
                            let child = self.intern_child(base.join(key.clone()), &keyword)?;
                            Ok((key, child))
                        })
                        .collect::<Result<_, ResolutionError>>()?,
                ),
            };
            children.push((keyword, resolved));
        }

        let target = match reference {
            Some(text) => Some(self.resolve_reference(&location, &text)?),
            None => None,
        };

        let node = &mut self.nodes[id.0];
        node.children = children;
        node.reference = target;
        Ok(())
    }

    fn intern_child(
        &mut self,
        location: SchemaLocation,
        keyword: &str,
    ) -> Result<NodeId, ResolutionError> {
        // Children are located by walking the parent's own value, so they
        // always exist.
        self.intern(location.clone(), keyword)?
            .ok_or_else(|| ResolutionError::Malformed {
                location,
                keyword: keyword.to_string(),
                reason: "subschema vanished during resolution".to_string(),
            })
    }

    fn resolve_reference(
        &mut self,
        from: &SchemaLocation,
        reference: &str,
    ) -> Result<NodeId, ResolutionError> {
        let fragment = reference.split_once('#').map(|(_, f)| f).unwrap_or_default();
        let pointer = JsonPointer::parse(fragment).map_err(|e| ResolutionError::Malformed {
            location: from.clone(),
            keyword: "$ref".to_string(),
            reason: format!("unsupported fragment in \"{reference}\": {e}"),
        })?;

        let from_base = self.store.base_uri(&from.document).unwrap_or(&from.document);
        let document = self.store.resolve_uri(from_base, reference);
        let dangling = |target: SchemaLocation| ResolutionError::DanglingReference {
            from: from.clone(),
            reference: reference.to_string(),
            target,
        };
        let Some(base) = self.store.canonical_base(&document) else {
            return Err(dangling(SchemaLocation::new(document, pointer)));
        };
        let target = SchemaLocation::new(base, pointer);
        self.intern(target.clone(), "$ref")?
            .ok_or_else(|| dangling(target))
    }
}

fn parse_types(raw: &Value) -> Option<Vec<InstanceType>> {
    match raw {
        Value::String(name) => Some(vec![name.parse().ok()?]),
        Value::Array(names) => names
            .iter()
            .map(|n| n.as_str().and_then(|s| s.parse().ok()))
            .collect(),
        _ => None,
    }
}
