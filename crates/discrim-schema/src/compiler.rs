//! # Validation Compiler
//!
//! Turns a [`SchemaGraph`] into a [`Validator`].
//!
//! Compilation walks the graph from the root with a worklist, compiling
//! each node once. Children of structural keywords are scheduled
//! regardless of whether a plugin evaluates them, except the contents of
//! `definitions`/`$defs`, which are compiled only when a `$ref` reaches
//! them. Nodes never reached stay inert. Among the reached nodes, a loop of
//! `$ref` and `allOf` edges would re-enter a schema at the same instance
//! location forever and is rejected.
//!
//! Keywords are handled in three tiers: the core set (see
//! [`CoreKeyword`]) is compiled here, annotations are skipped, and
//! everything else goes through the [`KeywordRegistry`]. A keyword with no
//! plugin is ignored, or rejected when `strictKeywords` is set.
//!
//! Any [`SchemaError`] aborts the compile call; no partial validator is
//! returned.

use std::sync::Arc;

use serde_json::Value;

use discrim_core::{InstanceType, SchemaError};

use crate::discriminator::{DiscriminatorAnalyzer, DiscriminatorSpec};
use crate::graph::{NodeId, SchemaBody, SchemaGraph};
use crate::keywords::{is_annotation, is_definitions, CoreKeyword};
use crate::options::CompileOptions;
use crate::registry::{KeywordContext, KeywordRegistry};
use crate::store::SchemaStore;
use crate::validator::{CompiledKeyword, CompiledNode, Program, Rule, Validator};

/// Compiles schema graphs into validators.
#[derive(Debug, Clone, Default)]
pub struct ValidationCompiler {
    registry: KeywordRegistry,
    options: CompileOptions,
}

impl ValidationCompiler {
    /// A compiler with the built-in plugins.
    pub fn new(options: CompileOptions) -> Self {
        Self {
            registry: KeywordRegistry::default(),
            options,
        }
    }

    /// A compiler with a caller-supplied registry.
    pub fn with_registry(registry: KeywordRegistry, options: CompileOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &KeywordRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut KeywordRegistry {
        &mut self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a standalone schema document.
    pub fn compile_document(&self, schema: &Value) -> Result<Validator, SchemaError> {
        let graph = SchemaGraph::from_document(schema.clone())?;
        self.compile(&graph, graph.root())
    }

    /// Compile the document registered as `root_document` in `store`.
    pub fn compile_store(&self, store: &SchemaStore, root_document: &str) -> Result<Validator, SchemaError> {
        let graph = SchemaGraph::resolve(store, root_document)?;
        self.compile(&graph, graph.root())
    }

    /// Compile the schema rooted at `root`.
    ///
    /// # Errors
    ///
    /// The first [`SchemaError`] met: a discriminator failing analysis, a
    /// plugin rejecting its keyword value, (strict mode) an unknown keyword,
    /// or a `$ref`/`allOf` loop that never descends into the instance.
    pub fn compile(&self, graph: &SchemaGraph, root: NodeId) -> Result<Validator, SchemaError> {
        let analyzer = DiscriminatorAnalyzer::new(graph);
        let mut compiled: Vec<Option<CompiledNode>> = (0..graph.len()).map(|_| None).collect();
        let mut worklist = vec![root];
        let mut discriminators = 0usize;

        while let Some(id) = worklist.pop() {
            if compiled[id.index()].is_some() {
                continue;
            }
            let node = graph.node(id);
            let (compiled_node, discriminated) = self.compile_node(graph, &analyzer, id)?;
            discriminators += usize::from(discriminated);
            compiled[id.index()] = Some(compiled_node);

            for (keyword, children) in node.all_children() {
                if !is_definitions(keyword) {
                    worklist.extend(children.ids());
                }
            }
            worklist.extend(node.reference());
        }

        let reached: Vec<NodeId> = graph
            .nodes()
            .filter(|(id, _)| compiled[id.index()].is_some())
            .map(|(id, _)| id)
            .collect();
        if let Some(closing) = graph.in_place_cycle(reached.iter().copied()) {
            return Err(SchemaError::unbounded_recursion(graph.node(closing).location().clone()));
        }
        let nodes: Vec<CompiledNode> = compiled
            .into_iter()
            .zip(graph.nodes())
            .map(|(slot, (_, node))| slot.unwrap_or_else(|| CompiledNode::inert(node.location().clone())))
            .collect();

        tracing::debug!(
            root = %graph.node(root).location(),
            nodes = reached.len(),
            discriminators,
            strict = self.options.strict_keywords,
            "compiled validator"
        );

        Ok(Validator::new(Program {
            nodes,
            root,
            fail_fast: self.options.fail_fast,
            max_depth: self.options.max_depth,
        }))
    }

    /// Compile one node. The flag reports whether it holds a discriminated
    /// `oneOf`.
    fn compile_node(
        &self,
        graph: &SchemaGraph,
        analyzer: &DiscriminatorAnalyzer<'_>,
        id: NodeId,
    ) -> Result<(CompiledNode, bool), SchemaError> {
        let node = graph.node(id);
        let location = node.location().clone();
        match node.body() {
            SchemaBody::Bool(true) => return Ok((CompiledNode::inert(location), false)),
            SchemaBody::Bool(false) => {
                let keywords = vec![CompiledKeyword {
                    name: "false".to_string(),
                    rule: Rule::Never,
                }];
                return Ok((CompiledNode { location, keywords }, false));
            }
            SchemaBody::Object(_) => {}
        }

        let discriminator = if self.options.discriminator && node.has_keyword("discriminator") {
            Some(Arc::new(analyzer.analyze_node(id)?))
        } else {
            None
        };

        let mut keywords = Vec::new();
        for (name, value) in node.keywords() {
            let rule = match CoreKeyword::from_name(name) {
                Some(core) => self.compile_core(graph, id, core, value, discriminator.as_ref())?,
                None if is_annotation(name) => None,
                None => self.compile_plugin(graph, id, name, value)?,
            };
            if let Some(rule) = rule {
                keywords.push(CompiledKeyword {
                    name: name.to_string(),
                    rule,
                });
            }
        }

        Ok((CompiledNode { location, keywords }, discriminator.is_some()))
    }

    fn compile_core(
        &self,
        graph: &SchemaGraph,
        id: NodeId,
        keyword: CoreKeyword,
        value: &Value,
        discriminator: Option<&Arc<DiscriminatorSpec>>,
    ) -> Result<Option<Rule>, SchemaError> {
        let node = graph.node(id);
        let invalid = |reason: &str| {
            SchemaError::invalid_keyword_value(node.location().join(keyword.name()), keyword.name(), reason)
        };
        let malformed = || {
            SchemaError::malformed(
                node.location().join(keyword.name()),
                format!("\"{}\" was not resolved", keyword.name()),
            )
        };

        let rule = match keyword {
            CoreKeyword::Type => Rule::Type(node.declared_types().ok_or_else(malformed)?.to_vec()),
            CoreKeyword::Const => Rule::Const(value.clone()),
            CoreKeyword::Enum => match value {
                Value::Array(items) => Rule::Enum(items.clone()),
                _ => return Err(invalid("must be an array")),
            },
            CoreKeyword::Required => {
                let names = value
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .map(|item| item.as_str().map(str::to_string))
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| invalid("must be an array of strings"))?;
                Rule::Required(names)
            }
            CoreKeyword::Properties => {
                Rule::Properties(node.child_map("properties").ok_or_else(malformed)?.to_vec())
            }
            CoreKeyword::Ref => Rule::Ref(node.reference().ok_or_else(malformed)?),
            CoreKeyword::AllOf => Rule::AllOf(node.child_list("allOf").ok_or_else(malformed)?.to_vec()),
            CoreKeyword::AnyOf => Rule::AnyOf(node.child_list("anyOf").ok_or_else(malformed)?.to_vec()),
            CoreKeyword::OneOf => {
                let branches = node.child_list("oneOf").ok_or_else(malformed)?.to_vec();
                match discriminator {
                    Some(spec) => Rule::Discriminated {
                        spec: Arc::clone(spec),
                        branches,
                        type_checked: node.declared_types() == Some(&[InstanceType::Object][..]),
                    },
                    None => Rule::OneOf(branches),
                }
            }
            // Folded into the discriminated `oneOf`, or an annotation when
            // the option is off.
            CoreKeyword::Discriminator => return Ok(None),
        };
        Ok(Some(rule))
    }

    fn compile_plugin(
        &self,
        graph: &SchemaGraph,
        id: NodeId,
        name: &str,
        value: &Value,
    ) -> Result<Option<Rule>, SchemaError> {
        let node = graph.node(id);
        match self.registry.compiler_for(name) {
            Some(compiler) => {
                let ctx = KeywordContext::new(name, value, id, graph);
                Ok(compiler.compile(&ctx)?.map(Rule::Plugin))
            }
            None if self.options.strict_keywords => {
                Err(SchemaError::unknown_keyword(node.location().join(name), name))
            }
            None => {
                tracing::trace!(keyword = name, location = %node.location(), "ignoring unknown keyword");
                Ok(None)
            }
        }
    }
}
