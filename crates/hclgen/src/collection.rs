//! ordered collections of resources sharing one schema
use crate::naming::SharedNames;
use crate::resource::{Kind, ProviderRef, Resource, ResourceError};
use crate::schema::Block;
use crate::value::{hash_sequence, Value};
use std::sync::Arc;

/// Ordered sequence of resources bound to the same schema and kind
///
/// Used for every resource of one type in a registry and for repeatable nested blocks. Indexing one past the end
/// appends a new empty resource, anything further is an error.
#[derive(Debug, Clone)]
pub struct ResourceCollection {
    type_name: String,
    kind: Kind,
    schema: Arc<Block>,
    /// only top-level collections name their elements
    names: Option<SharedNames>,
    provider: Option<ProviderRef>,
    resources: Vec<Resource>,
}

impl ResourceCollection {
    pub fn new(
        type_name: impl Into<String>,
        kind: Kind,
        schema: Arc<Block>,
        names: Option<SharedNames>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            schema,
            names,
            provider: None,
            resources: Vec::new(),
        }
    }

    /// Elements created from now on render a `provider` meta attribute
    pub fn with_provider(mut self, provider: Option<ProviderRef>) -> Self {
        self.provider = provider;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Resource> {
        self.resources.iter_mut()
    }

    /// Element at `index`; `index == len` appends a fresh element first
    pub fn index(&mut self, index: usize) -> Result<&mut Resource, ResourceError> {
        let len = self.resources.len();
        if index > len {
            return Err(ResourceError::IndexOutOfRange {
                type_name: self.type_name.clone(),
                index,
                len,
            });
        }

        if index == len {
            return Ok(self.push(None));
        }

        Ok(&mut self.resources[index])
    }

    /// Appends a new empty element
    ///
    /// Top-level elements declared without a name get one from the name generator.
    pub fn push(&mut self, name: Option<String>) -> &mut Resource {
        let name = match (name, &self.names) {
            (Some(name), _) => Some(name),
            (None, Some(names)) if self.kind.requires_name() => Some(names.next_name()),
            (None, _) => None,
        };

        tracing::debug!(type_name = %self.type_name, ?name, index = self.resources.len(), "resource appended");

        let resource = Resource::new(name, self.type_name.as_str(), self.kind, self.schema.clone())
            .with_provider(self.provider.clone());

        self.resources.push(resource);
        let last = self.resources.len() - 1;
        &mut self.resources[last]
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.name() == Some(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources
            .iter_mut()
            .find(|resource| resource.name() == Some(name))
    }

    /// Position dependent hash of the element hashes
    pub fn hash(&self) -> u32 {
        hash_sequence(self.resources.iter().map(Resource::hash))
    }

    pub fn to_plain_sequence(&self) -> Value {
        Value::Array(self.resources.iter().map(Resource::to_plain_mapping).collect())
    }
}

impl PartialEq for ResourceCollection {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.kind == other.kind
            && self.schema == other.schema
            && self.resources == other.resources
    }
}

impl<'c> IntoIterator for &'c ResourceCollection {
    type Item = &'c Resource;
    type IntoIter = std::slice::Iter<'c, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
