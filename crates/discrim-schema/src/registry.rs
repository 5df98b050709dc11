//! # Keyword Registry
//!
//! Maps keyword names to compiler plugins. The compiler consults the
//! registry for every keyword that is neither a core keyword nor an
//! annotation (see [`keywords`](crate::keywords)).
//!
//! A plugin is a [`KeywordCompiler`]. At compile time it receives a
//! [`KeywordContext`] (the keyword value, the owning node, and the ids of the
//! child nodes it owns) and returns either a [`KeywordValidator`] or `None`
//! for keywords that assert nothing on their own (`then`, `else`, `format`).
//! Child nodes are compiled by the compiler, not by plugins; a validator
//! reaches them at run time through [`Scope::validate`].
//!
//! Core keywords cannot be overridden. Registering one logs a warning and
//! the registration is never consulted.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use discrim_core::{SchemaError, SchemaLocation};

use crate::graph::{Children, NodeId, SchemaGraph, SchemaNode};
use crate::keywords::CoreKeyword;
use crate::plugins;
use crate::validator::Scope;

/// Run-time half of a keyword plugin.
pub trait KeywordValidator: Send + Sync + fmt::Debug {
    /// Check `instance`, reporting every violation through `scope`.
    fn validate(&self, instance: &Value, scope: &mut Scope<'_>);
}

/// Compile-time half of a keyword plugin.
pub trait KeywordCompiler: Send + Sync {
    /// Compile one occurrence of the keyword.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] (normally via [`KeywordContext::invalid`])
    /// when the keyword value is unusable.
    fn compile(
        &self,
        ctx: &KeywordContext<'_>,
    ) -> Result<Option<Box<dyn KeywordValidator>>, SchemaError>;
}

impl<F> KeywordCompiler for F
where
    F: Fn(&KeywordContext<'_>) -> Result<Option<Box<dyn KeywordValidator>>, SchemaError>
        + Send
        + Sync,
{
    fn compile(
        &self,
        ctx: &KeywordContext<'_>,
    ) -> Result<Option<Box<dyn KeywordValidator>>, SchemaError> {
        self(ctx)
    }
}

/// Everything a plugin may inspect while compiling its keyword.
pub struct KeywordContext<'a> {
    keyword: &'a str,
    value: &'a Value,
    node: NodeId,
    graph: &'a SchemaGraph,
}

impl<'a> KeywordContext<'a> {
    pub(crate) fn new(keyword: &'a str, value: &'a Value, node: NodeId, graph: &'a SchemaGraph) -> Self {
        Self {
            keyword,
            value,
            node,
            graph,
        }
    }

    pub fn keyword(&self) -> &'a str {
        self.keyword
    }

    /// Raw keyword value.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// The schema node holding the keyword.
    pub fn node(&self) -> &'a SchemaNode {
        self.graph.node(self.node)
    }

    pub fn graph(&self) -> &'a SchemaGraph {
        self.graph
    }

    /// Location of the keyword itself.
    pub fn location(&self) -> SchemaLocation {
        self.node().location().join(self.keyword)
    }

    /// Raw value of a sibling keyword.
    pub fn sibling(&self, name: &str) -> Option<&'a Value> {
        self.node().keyword(name)
    }

    /// The children this keyword owns, if it is structural.
    pub fn children(&self) -> Option<&'a Children> {
        self.node().children(self.keyword)
    }

    /// The single subschema of this keyword.
    pub fn subschema(&self) -> Result<NodeId, SchemaError> {
        self.node()
            .child(self.keyword)
            .ok_or_else(|| self.invalid("must be a schema"))
    }

    /// The subschema list of this keyword.
    pub fn subschemas(&self) -> Result<&'a [NodeId], SchemaError> {
        self.node()
            .child_list(self.keyword)
            .ok_or_else(|| self.invalid("must be an array of schemas"))
    }

    /// The named subschemas of this keyword.
    pub fn subschema_map(&self) -> Result<&'a [(String, NodeId)], SchemaError> {
        self.node()
            .child_map(self.keyword)
            .ok_or_else(|| self.invalid("must be an object of schemas"))
    }

    /// An `InvalidKeywordValue` error located at this keyword.
    pub fn invalid(&self, reason: &str) -> SchemaError {
        SchemaError::invalid_keyword_value(self.location(), self.keyword, reason)
    }
}

/// Keyword name → compiler plugin.
#[derive(Clone)]
pub struct KeywordRegistry {
    compilers: HashMap<String, Arc<dyn KeywordCompiler>>,
}

impl fmt::Debug for KeywordRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordRegistry")
            .field("keywords", &self.names())
            .finish()
    }
}

impl Default for KeywordRegistry {
    /// A registry holding every built-in plugin.
    fn default() -> Self {
        let mut registry = Self::empty();
        plugins::register_builtins(&mut registry);
        registry
    }
}

impl KeywordRegistry {
    /// A registry with no plugins: only core keywords and annotations are
    /// understood.
    pub fn empty() -> Self {
        Self {
            compilers: HashMap::new(),
        }
    }

    /// Register `compiler` for `name`, returning the plugin it replaces.
    pub fn register<C>(&mut self, name: &str, compiler: C) -> Option<Arc<dyn KeywordCompiler>>
    where
        C: KeywordCompiler + 'static,
    {
        if CoreKeyword::from_name(name).is_some() {
            tracing::warn!(keyword = name, "core keywords cannot be overridden; plugin ignored");
        }
        self.compilers.insert(name.to_string(), Arc::new(compiler))
    }

    /// Remove the plugin for `name`.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn KeywordCompiler>> {
        self.compilers.remove(name)
    }

    /// The plugin registered for `name`.
    pub fn compiler_for(&self, name: &str) -> Option<&dyn KeywordCompiler> {
        self.compilers.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.compilers.contains_key(name)
    }

    /// Registered keyword names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.compilers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
