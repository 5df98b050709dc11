//! # Schema Store
//!
//! Holds root schema documents keyed by base URI and answers pointer lookups
//! (`lookup(location) -> fragment | NotFound`). Lookup is deterministic: the
//! store is populated up front and never fetches anything.
//!
//! ## Document keys
//!
//! Each document is registered under its base URI and, when it declares a
//! root `$id`, under that `$id` too. URL bases are normalized (fragment
//! stripped) so `https://x/a.json` and `https://x/a.json#` are one key.
//! Non-URL bases (plain names such as `main.json`) are used verbatim.
//! Relative references inside a document with a root `$id` resolve against
//! that `$id` rather than the key it was registered under.
//!
//! ## Relative references
//!
//! [`SchemaStore::resolve_uri`] applies RFC 3986 reference resolution when the
//! base is a URL (`url` crate). For non-URL bases the reference replaces the
//! last path segment of the base.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use discrim_core::SchemaLocation;

/// Base URI given to a schema compiled without an explicit document name.
pub const DEFAULT_BASE_URI: &str = "json-schema:///root.json";

/// Error registering a document.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A document is already registered under this base URI.
    #[error("document already registered: {0}")]
    DuplicateDocument(String),

    /// YAML text could not be parsed into a JSON value.
    #[error("invalid YAML for document {base}: {reason}")]
    InvalidYaml {
        /// Base URI the document was being registered under.
        base: String,
        /// Parser message.
        reason: String,
    },
}

/// In-memory set of root schema documents.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    /// Canonical base URI → document.
    documents: HashMap<String, Value>,
    /// `$id` URI → canonical base URI.
    aliases: HashMap<String, String>,
    /// Canonical base URI → the document's own `$id`, where relative
    /// references resolve from.
    ids: HashMap<String, String>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only `document` under [`DEFAULT_BASE_URI`].
    pub fn single(document: Value) -> Self {
        let mut store = Self::new();
        store.register(normalize(DEFAULT_BASE_URI), document);
        store
    }

    /// Register `document` under `base`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateDocument`] if `base` is taken.
    pub fn insert(&mut self, base: &str, document: Value) -> Result<(), StoreError> {
        let key = normalize(base);
        if self.documents.contains_key(&key) {
            return Err(StoreError::DuplicateDocument(key));
        }
        self.register(key, document);
        Ok(())
    }

    fn register(&mut self, key: String, document: Value) {
        if let Some(id) = document.get("$id").and_then(Value::as_str) {
            let alias = self.resolve_uri(&key, id);
            if alias != key {
                match self.aliases.get(&alias).cloned() {
                    Some(existing) if existing != key => {
                        tracing::warn!(
                            alias = %alias,
                            existing = %existing,
                            document = %key,
                            "$id already registered for another document; keeping the first"
                        );
                    }
                    Some(_) => {}
                    None => {
                        self.aliases.insert(alias.clone(), key.clone());
                        self.ids.insert(key.clone(), alias);
                    }
                }
            }
        }

        tracing::debug!(document = %key, "registered schema document");
        self.documents.insert(key, document);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_document(mut self, base: &str, document: Value) -> Result<Self, StoreError> {
        self.insert(base, document)?;
        Ok(self)
    }

    /// Parse YAML `text` and register it under `base`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidYaml`] if the text does not parse, or
    /// [`StoreError::DuplicateDocument`] if `base` is taken.
    pub fn insert_yaml(&mut self, base: &str, text: &str) -> Result<(), StoreError> {
        let document: Value = serde_yaml::from_str(text).map_err(|e| StoreError::InvalidYaml {
            base: base.to_string(),
            reason: e.to_string(),
        })?;
        self.insert(base, document)
    }

    /// Number of registered documents (aliases not counted).
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Registered base URIs, sorted.
    pub fn bases(&self) -> Vec<&str> {
        let mut bases: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        bases.sort_unstable();
        bases
    }

    /// The canonical key for `uri`: itself if registered, the aliased base
    /// if `uri` is some document's `$id`, `None` otherwise.
    pub fn canonical_base(&self, uri: &str) -> Option<&str> {
        let key = normalize(uri);
        if let Some((stored, _)) = self.documents.get_key_value(&key) {
            return Some(stored.as_str());
        }
        self.aliases.get(&key).map(String::as_str)
    }

    /// The URI that references inside the document registered under `uri`
    /// resolve against: its root `$id` when it declares one, its canonical
    /// key otherwise.
    pub fn base_uri(&self, uri: &str) -> Option<&str> {
        let key = self.canonical_base(uri)?;
        Some(self.ids.get(key).map_or(key, String::as_str))
    }

    /// The whole document registered under `uri` (or its `$id`).
    pub fn document(&self, uri: &str) -> Option<&Value> {
        let base = self.canonical_base(uri)?;
        self.documents.get(base)
    }

    /// The fragment at `location`, or `None` if the document or pointer
    /// target does not exist.
    pub fn lookup(&self, location: &SchemaLocation) -> Option<&Value> {
        self.document(&location.document)
            .and_then(|doc| location.pointer.resolve(doc))
    }

    /// Resolve the document part of `reference` against `base`. The
    /// fragment of `reference`, if any, is dropped.
    pub fn resolve_uri(&self, base: &str, reference: &str) -> String {
        let document_part = reference.split('#').next().unwrap_or_default();
        if document_part.is_empty() {
            return normalize(base);
        }
        if let Ok(base_url) = Url::parse(base) {
            if let Ok(joined) = base_url.join(document_part) {
                return normalize(joined.as_str());
            }
        }
        if Url::parse(document_part).is_ok() {
            return normalize(document_part);
        }
        match base.rfind('/') {
            Some(idx) => format!("{}{}", &base[..=idx], document_part),
            None => document_part.to_string(),
        }
    }
}

/// Canonical form of a base URI: fragment removed, URL-normalized when it
/// parses as a URL.
fn normalize(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => uri.split('#').next().unwrap_or_default().to_string(),
    }
}
