//! # Discriminator Analysis
//!
//! Statically verifies a `oneOf` + `discriminator` pair and builds the
//! dispatch table mapping each tag value to the index of its branch.
//!
//! ## Checks
//!
//! On the discriminator itself, in this order:
//!
//! 1. The keyword value is an object.
//! 2. `propertyName` is a string (`discriminator: requires propertyName`).
//! 3. No `mapping` (`discriminator: mapping is not supported`).
//! 4. A sibling `oneOf` exists (`discriminator: requires oneOf keyword`).
//! 5. A declared `type` admits objects.
//!
//! Then, for every branch in declaration order:
//!
//! 1. A branch that is a pure `$ref` is followed, transitively, to the
//!    schema it names. Reaching the owning node is a
//!    [`CyclicDiscriminator`](discrim_core::SchemaErrorKind::CyclicDiscriminator) error;
//!    any other loop is a `CyclicReference`.
//! 2. The branch has `properties/<propertyName>`.
//! 3. That property schema has `const` (which wins) or `enum`.
//! 4. Every tag value is a string, number or boolean.
//! 5. The property is `required` by the branch or by the owning node.
//! 6. No tag value is declared twice across the `oneOf`.
//!
//! Analysis runs once per discriminated `oneOf`, at compile time.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use discrim_core::{InstanceType, SchemaError, TagValue};

use crate::graph::{NodeId, SchemaGraph};

/// Tag value → branch index. Keys carry their runtime type, so `"1"` and
/// `1` never collide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    entries: HashMap<TagValue, usize>,
}

impl DispatchTable {
    /// Map `tag` to `branch`.
    ///
    /// # Errors
    ///
    /// Returns the rejected tag and the branch already holding it when
    /// `tag` is taken.
    pub fn insert(&mut self, tag: TagValue, branch: usize) -> Result<(), (TagValue, usize)> {
        if let Some(&existing) = self.entries.get(&tag) {
            return Err((tag, existing));
        }
        self.entries.insert(tag, branch);
        Ok(())
    }

    pub fn get(&self, tag: &TagValue) -> Option<usize> {
        self.entries.get(tag).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by branch index, then tag rendering.
    pub fn entries(&self) -> Vec<(&TagValue, usize)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(tag, &branch)| (tag, branch)).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        entries
    }
}

/// The verified result of analyzing one discriminated `oneOf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorSpec {
    property: String,
    table: DispatchTable,
    branch_count: usize,
}

impl DiscriminatorSpec {
    /// The tag property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Index of the branch selected by `tag`.
    pub fn branch_for(&self, tag: &TagValue) -> Option<usize> {
        self.table.get(tag)
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Number of `oneOf` branches.
    pub fn branch_count(&self) -> usize {
        self.branch_count
    }

    /// Tags selecting `branch`.
    pub fn tags_of(&self, branch: usize) -> Vec<&TagValue> {
        self.table
            .entries()
            .into_iter()
            .filter(|(_, b)| *b == branch)
            .map(|(tag, _)| tag)
            .collect()
    }
}

/// Analyzes discriminated `oneOf` nodes of one graph.
#[derive(Debug, Clone, Copy)]
pub struct DiscriminatorAnalyzer<'g> {
    graph: &'g SchemaGraph,
}

impl<'g> DiscriminatorAnalyzer<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self { graph }
    }

    /// Check the `discriminator` keyword of `owner` and analyze its `oneOf`.
    pub fn analyze_node(&self, owner: NodeId) -> Result<DiscriminatorSpec, SchemaError> {
        let node = self.graph.node(owner);
        let location = node.location().join("discriminator");
        let Some(Value::Object(discriminator)) = node.keyword("discriminator") else {
            return Err(SchemaError::invalid_discriminator(location, "must be an object"));
        };
        let Some(property) = discriminator.get("propertyName").and_then(Value::as_str) else {
            return Err(SchemaError::invalid_discriminator(location, "requires propertyName"));
        };
        if discriminator.contains_key("mapping") {
            return Err(SchemaError::invalid_discriminator(location, "mapping is not supported"));
        }
        if !node.has_keyword("oneOf") {
            return Err(SchemaError::missing_one_of(location));
        }
        if let Some(types) = node.declared_types() {
            if !types.contains(&InstanceType::Object) {
                return Err(SchemaError::invalid_discriminator(
                    node.location().join("type"),
                    "requires type object",
                ));
            }
        }
        self.analyze(owner, property)
    }

    /// Build the dispatch table for the `oneOf` of `owner`, keyed on
    /// `property`.
    pub fn analyze(&self, owner: NodeId, property: &str) -> Result<DiscriminatorSpec, SchemaError> {
        let owner_node = self.graph.node(owner);
        let branches = owner_node
            .child_list("oneOf")
            .ok_or_else(|| SchemaError::missing_one_of(owner_node.location().join("discriminator")))?;
        let owner_requires = owner_node.requires(property);

        let mut table = DispatchTable::default();
        for (index, &branch) in branches.iter().enumerate() {
            let concrete = self.deref_branch(owner, branch, property)?;
            let branch_node = self.graph.node(concrete);
            let branch_location = branch_node.location().clone();

            let tag_schema = branch_node
                .property(property)
                .ok_or_else(|| SchemaError::missing_tag_property(branch_location.clone(), property))?;
            let tag_node = self.graph.node(self.graph.deref(tag_schema)?);

            let raw_tags: Vec<&Value> = if let Some(constant) = tag_node.keyword("const") {
                vec![constant]
            } else if let Some(allowed) = tag_node.keyword("enum") {
                match allowed {
                    Value::Array(items) if !items.is_empty() => items.iter().collect(),
                    _ => {
                        return Err(SchemaError::invalid_keyword_value(
                            tag_node.location().join("enum"),
                            "enum",
                            "must be a non-empty array",
                        ))
                    }
                }
            } else {
                return Err(SchemaError::missing_tag_constraint(branch_location, property));
            };

            let tags = raw_tags
                .into_iter()
                .map(|raw| {
                    TagValue::from_json(raw)
                        .ok_or_else(|| SchemaError::invalid_tag_type(branch_location.clone(), property))
                })
                .collect::<Result<Vec<_>, _>>()?;

            if !owner_requires && !branch_node.requires(property) {
                return Err(SchemaError::tag_not_required(branch_location, property));
            }

            for tag in tags {
                table
                    .insert(tag, index)
                    .map_err(|(tag, _)| SchemaError::duplicate_tag_value(branch_location.clone(), property, &tag))?;
            }
        }

        tracing::debug!(
            location = %owner_node.location(),
            property,
            tags = table.len(),
            branches = branches.len(),
            "built discriminator dispatch table"
        );

        Ok(DiscriminatorSpec {
            property: property.to_string(),
            table,
            branch_count: branches.len(),
        })
    }

    /// Follow pure references from `branch` to a schema with content.
    fn deref_branch(&self, owner: NodeId, branch: NodeId, property: &str) -> Result<NodeId, SchemaError> {
        let mut visited = HashSet::from([owner, branch]);
        let mut current = branch;
        loop {
            let node = self.graph.node(current);
            if !node.is_pure_reference() {
                return Ok(current);
            }
            let Some(target) = node.reference() else {
                return Ok(current);
            };
            let branch_location = || self.graph.node(branch).location().clone();
            if target == owner {
                return Err(SchemaError::cyclic_discriminator(branch_location(), property));
            }
            if !visited.insert(target) {
                return Err(SchemaError::cyclic_reference(branch_location()));
            }
            current = target;
        }
    }
}
