//! Read-only lookup of renames and documentation.
//!
//! The key format is up to the producer; here the keys are the obfuscated
//! names, unique across all classes.

use std::collections::HashMap;

/// A rename target plus its optional documentation text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MappingWithDoc {
    mapping: String,
    documentation: Option<String>,
}

impl MappingWithDoc {
    pub fn new(mapping: String, documentation: Option<String>) -> Self {
        Self {
            mapping,
            documentation,
        }
    }

    pub fn mapping(&self) -> &str {
        &self.mapping
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }
}

/// Frozen mapping tables for fields, methods and parameters.
///
/// Built once after all loaders have finished. No mutating method exists,
/// so handing shared references to the rewrite workers is safe by
/// construction.
pub struct MappingStore {
    fields: HashMap<String, MappingWithDoc>,
    methods: HashMap<String, MappingWithDoc>,
    params: HashMap<String, String>,
}

impl MappingStore {
    pub fn new(
        fields: HashMap<String, MappingWithDoc>,
        methods: HashMap<String, MappingWithDoc>,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            fields,
            methods,
            params,
        }
    }

    pub fn field_mapping(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(MappingWithDoc::mapping)
    }

    pub fn field_doc(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(MappingWithDoc::documentation)
    }

    pub fn method_mapping(&self, name: &str) -> Option<&str> {
        self.methods.get(name).map(MappingWithDoc::mapping)
    }

    pub fn method_doc(&self, name: &str) -> Option<&str> {
        self.methods.get(name).and_then(MappingWithDoc::documentation)
    }

    pub fn param_mapping(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
