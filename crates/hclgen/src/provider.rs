//! providers and the registries they expose
use crate::naming::SharedNames;
use crate::registry::SchemaRegistry;
use crate::resource::{Kind, Member, ProviderRef, Resource, ResourceError};
use crate::schema::{ProviderSchema, SchemaCatalog};
use crate::value::Value;
use indexmap::IndexMap;

/// One configured provider
///
/// Holds the provider's own configuration block and a registry each for its data sources (`data`) and resources
/// (`resource`), both prefixed with the provider type.
#[derive(Debug, Clone)]
pub struct Provider {
    type_name: String,
    alias: Option<String>,
    version: Option<String>,
    config: Resource,
    data: SchemaRegistry,
    resources: SchemaRegistry,
}

impl Provider {
    pub fn new(
        type_name: impl Into<String>,
        schema: &ProviderSchema,
        alias: Option<String>,
        version: Option<String>,
        names: SharedNames,
    ) -> Self {
        let type_name = type_name.into();
        let provider_ref = alias
            .as_deref()
            .map(|alias| ProviderRef::new(type_name.as_str(), alias));

        Self {
            config: Resource::new(
                alias.clone(),
                type_name.as_str(),
                Kind::Provider,
                schema.provider.block.clone(),
            ),
            data: SchemaRegistry::new(
                type_name.as_str(),
                Kind::Data,
                schema.data_source_schemas.clone(),
                names.clone(),
            )
            .with_provider(provider_ref.clone()),
            resources: SchemaRegistry::new(
                type_name.as_str(),
                Kind::Resource,
                schema.resource_schemas.clone(),
                names,
            )
            .with_provider(provider_ref),
            type_name,
            alias,
            version,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The provider's own configuration block
    pub fn config(&self) -> &Resource {
        &self.config
    }

    /// See [Resource::get]
    pub fn get(&mut self, name: &str) -> Option<Member<'_>> {
        self.config.get(name)
    }

    /// See [Resource::set]
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ResourceError> {
        self.config.set(name, value)
    }

    pub fn data(&self) -> &SchemaRegistry {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.data
    }

    pub fn resources(&self) -> &SchemaRegistry {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.resources
    }

    /// Registry holding top-level resources of `kind`
    pub fn registry_mut(&mut self, kind: Kind) -> Option<&mut SchemaRegistry> {
        match kind {
            Kind::Resource => Some(&mut self.resources),
            Kind::Data => Some(&mut self.data),
            Kind::Nested | Kind::Provider => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "provider({:?}, {alias:?})", self.type_name),
            None => write!(f, "provider({:?})", self.type_name),
        }
    }
}

/// All providers of a configuration keyed by type and alias
#[derive(Debug, Clone)]
pub struct ProviderCollection {
    names: SharedNames,
    providers: IndexMap<(String, Option<String>), Provider>,
}

impl ProviderCollection {
    pub fn new(names: SharedNames) -> Self {
        Self {
            names,
            providers: Default::default(),
        }
    }

    /// Adds a provider whose schema is taken from `catalog`
    pub fn add(
        &mut self,
        catalog: &SchemaCatalog,
        type_name: &str,
        alias: Option<String>,
        version: Option<String>,
    ) -> Result<&mut Provider, ProviderError> {
        let schema = catalog
            .provider(type_name)
            .ok_or_else(|| ProviderError::UnknownProvider(type_name.to_string()))?;

        let key = (type_name.to_string(), alias.clone());
        if self.providers.contains_key(&key) {
            return Err(ProviderError::Duplicate {
                type_name: type_name.to_string(),
                alias,
            });
        }

        tracing::debug!(type_name, ?alias, "provider added");
        let provider = Provider::new(type_name, schema, alias, version, self.names.clone());
        let entry = self.providers.entry(key).or_insert(provider);
        Ok(entry)
    }

    pub fn get(&self, type_name: &str, alias: Option<&str>) -> Option<&Provider> {
        self.providers
            .iter()
            .find(|((ty, a), _)| ty == type_name && a.as_deref() == alias)
            .map(|(_, provider)| provider)
    }

    pub fn get_mut(&mut self, type_name: &str, alias: Option<&str>) -> Option<&mut Provider> {
        self.providers
            .iter_mut()
            .find(|((ty, a), _)| ty == type_name && a.as_deref() == alias)
            .map(|(_, provider)| provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Already declared top-level resource, e.g. `(Kind::Data, "aws_ami", "ubuntu")`
    pub fn lookup(&mut self, kind: Kind, qualified: &str, name: &str) -> Option<&mut Resource> {
        self.providers.values_mut().find_map(|provider| {
            provider
                .registry_mut(kind)?
                .bound_mut(qualified)?
                .find_mut(name)
        })
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ProviderError {
    #[error("unknown provider {0:?}, no schema available")]
    UnknownProvider(String),
    #[error("provider {type_name:?} with alias {alias:?} declared twice")]
    Duplicate {
        type_name: String,
        alias: Option<String>,
    },
}
