//! lazily bound resource collections per schema name
use crate::collection::ResourceCollection;
use crate::naming::SharedNames;
use crate::resource::{Kind, ProviderRef};
use crate::schema::Schema;
use crate::value::hash_entries;
use indexmap::IndexMap;

/// Binds short local names (`instance`) to schemas named `<prefix>_<name>` (`aws_instance`)
///
/// The collection for a name is created on first resolution and handed out again on every later one, so
/// resources accumulate across statements. Resolution takes `&mut self`, racing constructions are impossible; use
/// one registry per script run.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    prefix: String,
    kind: Kind,
    schemas: IndexMap<String, Schema>,
    names: SharedNames,
    provider: Option<ProviderRef>,
    /// bound collections in order of first resolution
    collections: IndexMap<String, ResourceCollection>,
}

impl SchemaRegistry {
    pub fn new(
        prefix: impl Into<String>,
        kind: Kind,
        schemas: IndexMap<String, Schema>,
        names: SharedNames,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
            schemas,
            names,
            provider: None,
            collections: Default::default(),
        }
    }

    /// Resources of collections bound from now on belong to this provider
    pub fn with_provider(mut self, provider: Option<ProviderRef>) -> Self {
        self.provider = provider;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// `instance` -> `aws_instance`
    pub fn qualify(&self, short_name: &str) -> String {
        format!("{}_{}", self.prefix, short_name)
    }

    /// Collection bound to `short_name`, `None` if the schema does not exist
    pub fn resolve(&mut self, short_name: &str) -> Option<&mut ResourceCollection> {
        let qualified = self.qualify(short_name);
        self.resolve_qualified(&qualified)
    }

    /// Like [SchemaRegistry::resolve] but by qualified name (`aws_instance`)
    pub fn resolve_qualified(&mut self, qualified: &str) -> Option<&mut ResourceCollection> {
        if !self.collections.contains_key(qualified) {
            let schema = self.schemas.get(qualified)?;

            tracing::debug!(prefix = %self.prefix, kind = %self.kind, qualified, "binding schema");
            let collection = ResourceCollection::new(
                qualified,
                self.kind,
                schema.block.clone(),
                Some(self.names.clone()),
            )
            .with_provider(self.provider.clone());

            self.collections.insert(qualified.to_string(), collection);
        }

        self.collections.get_mut(qualified)
    }

    /// Already bound collection, never binds
    pub fn bound(&self, qualified: &str) -> Option<&ResourceCollection> {
        self.collections.get(qualified)
    }

    pub fn bound_mut(&mut self, qualified: &str) -> Option<&mut ResourceCollection> {
        self.collections.get_mut(qualified)
    }

    /// Bound collections in order of first resolution
    pub fn collections(&self) -> impl Iterator<Item = &ResourceCollection> {
        self.collections.values()
    }

    /// Every schema name with the prefix stripped
    pub fn short_names(&self) -> Vec<&str> {
        let prefix = format!("{}_", self.prefix);
        self.schemas
            .keys()
            .map(|qualified| qualified.strip_prefix(&prefix).unwrap_or(qualified.as_str()))
            .collect()
    }

    pub fn hash(&self) -> u32 {
        hash_entries(
            self.collections
                .iter()
                .map(|(name, collection)| (name.as_str(), collection.hash())),
        )
    }
}
