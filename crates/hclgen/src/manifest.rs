//! declarative manifests driving the resource graph
//!
//! A manifest lists providers and, per provider, the data sources and resources to declare. It is applied top to
//! bottom through the same operations a script would use, so every schema check applies.
//!
//! ```yaml
//! providers:
//!   - type: aws
//!     config: { region: us-west-2 }
//!     data:
//!       ami: [ { $name: ubuntu, most_recent: true } ]
//!     resources:
//!       instance:
//!         - $name: web
//!           ami: { $ref: data.aws_ami.ubuntu.id }
//! ```
//!
//! `$name` is the resource label, every other key is an attribute or nested block of the resource's schema.
//! An object whose only key is `$ref` is replaced by reading the addressed attribute of a resource declared
//! earlier. Computed attributes turn into references, set attributes into their value.
use crate::naming::SharedNames;
use crate::provider::{ProviderCollection, ProviderError};
use crate::resource::{Kind, Member, ResourceError};
use crate::schema::SchemaCatalog;
use crate::value::{InvalidValue, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const REFERENCE_KEY: &str = "$ref";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub providers: Vec<ProviderDecl>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderDecl {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub config: IndexMap<String, serde_json::Value>,
    /// short data source name -> declarations
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, Vec<ResourceDecl>>,
    /// short resource name -> declarations
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Vec<ResourceDecl>>,
}

/// One resource, a missing label is generated
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResourceDecl {
    #[serde(rename = "$name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub values: IndexMap<String, serde_json::Value>,
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    /// YAML or JSON
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(text)?)
    }
}

impl Manifest {
    /// Applies every declaration in document order
    pub fn evaluate(
        &self,
        catalog: &SchemaCatalog,
        names: SharedNames,
    ) -> Result<ProviderCollection, ManifestError> {
        let mut providers = ProviderCollection::new(names);

        for (index, decl) in self.providers.iter().enumerate() {
            tracing::debug!(index, type_name = %decl.type_name, "applying provider");
            decl.apply(catalog, &mut providers)
                .map_err(|source| match source {
                    ApplyError::Provider(source) => ManifestError::Provider { index, source },
                    ApplyError::Manifest(error) => error,
                })?;
        }

        Ok(providers)
    }
}

enum ApplyError {
    Provider(ProviderError),
    Manifest(ManifestError),
}

impl From<ManifestError> for ApplyError {
    fn from(error: ManifestError) -> Self {
        ApplyError::Manifest(error)
    }
}

impl ProviderDecl {
    /// `aws` or `aws.west`
    fn label(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{}.{alias}", self.type_name),
            None => self.type_name.clone(),
        }
    }

    fn apply(
        &self,
        catalog: &SchemaCatalog,
        providers: &mut ProviderCollection,
    ) -> Result<(), ApplyError> {
        let label = self.label();

        let mut config = Vec::with_capacity(self.config.len());
        for (name, value) in &self.config {
            let location = format!("{label}.config.{name}");
            config.push((name, resolve(providers, value, &location)?, location));
        }

        let provider = providers
            .add(
                catalog,
                &self.type_name,
                self.alias.clone(),
                self.version.clone(),
            )
            .map_err(ApplyError::Provider)?;

        for (name, value, location) in config {
            provider
                .set(name, value)
                .map_err(|source| ManifestError::Resource { location, source })?;
        }

        for (kind, declarations) in [(Kind::Data, &self.data), (Kind::Resource, &self.resources)] {
            for (short_name, resources) in declarations {
                for (index, resource) in resources.iter().enumerate() {
                    let location = format!("{label}.{kind}.{short_name}[{index}]");
                    self.declare(providers, kind, short_name, resource, &location)?;
                }
            }
        }

        Ok(())
    }

    fn declare(
        &self,
        providers: &mut ProviderCollection,
        kind: Kind,
        short_name: &str,
        decl: &ResourceDecl,
        location: &str,
    ) -> Result<(), ManifestError> {
        let mut values = IndexMap::with_capacity(decl.values.len());
        for (name, value) in &decl.values {
            let location = format!("{location}.{name}");
            values.insert(name.as_str(), resolve(providers, value, &location)?);
        }

        let collection = providers
            .get_mut(&self.type_name, self.alias.as_deref())
            .and_then(|provider| provider.registry_mut(kind))
            .and_then(|registry| registry.resolve(short_name))
            .ok_or_else(|| ManifestError::UnknownType {
                provider: self.label(),
                kind,
                short_name: short_name.to_string(),
            })?;
        let resource = collection.push(decl.name.clone());

        for (name, value) in values {
            resource
                .set(name, value)
                .map_err(|source| ManifestError::Resource {
                    location: format!("{location}.{name}"),
                    source,
                })?;
        }

        Ok(())
    }
}

/// Converts a manifest value, replacing `{ $ref: <address> }` objects
fn resolve(
    providers: &mut ProviderCollection,
    value: &serde_json::Value,
    location: &str,
) -> Result<Value, ManifestError> {
    use serde_json::Value as Json;

    match value {
        Json::Object(entries) => {
            if let (1, Some(Json::String(reference))) = (entries.len(), entries.get(REFERENCE_KEY)) {
                return dereference(providers, reference).ok_or_else(|| {
                    ManifestError::UnresolvedReference {
                        location: location.to_string(),
                        reference: reference.clone(),
                    }
                });
            }

            let mut resolved = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                let location = format!("{location}.{key}");
                resolved.insert(key.clone(), resolve(providers, value, &location)?);
            }
            Ok(Value::Object(resolved))
        }
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| resolve(providers, item, &format!("{location}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => {
            Value::try_from(scalar.clone()).map_err(|source| ManifestError::InvalidValue {
                location: location.to_string(),
                source,
            })
        }
    }
}

/// `<type>.<name>.<attr>` or `data.<type>.<name>.<attr>`
fn dereference(providers: &mut ProviderCollection, reference: &str) -> Option<Value> {
    let segments: Vec<&str> = reference.split('.').collect();
    let (kind, type_name, name, attribute) = match segments.as_slice() {
        ["data", type_name, name, attribute] => (Kind::Data, *type_name, *name, *attribute),
        [type_name, name, attribute] => (Kind::Resource, *type_name, *name, *attribute),
        _ => return None,
    };

    let resource = providers.lookup(kind, type_name, name)?;
    let value = match resource.get(attribute)? {
        Member::Value(value) => value.clone(),
        Member::Block(block) => block.to_plain_mapping(),
        Member::Blocks(blocks) => blocks.to_plain_sequence(),
    };

    tracing::trace!(reference, "reference resolved");
    Some(value)
}

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("Unable to parse manifest")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid provider at providers[{index}]")]
    Provider {
        index: usize,
        #[source]
        source: ProviderError,
    },
    #[error("Provider {provider} has no {kind} type {short_name:?}")]
    UnknownType {
        provider: String,
        kind: Kind,
        short_name: String,
    },
    #[error("{location}: reference {reference:?} does not name a declared resource attribute")]
    UnresolvedReference { location: String, reference: String },
    #[error("Invalid value at {location}")]
    InvalidValue {
        location: String,
        #[source]
        source: InvalidValue,
    },
    #[error("Invalid assignment at {location}")]
    Resource {
        location: String,
        #[source]
        source: ResourceError,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hcl_render::to_hcl_string;
    use crate::naming::SequentialNames;
    use crate::schema::test::catalog;
    use pretty_assertions::assert_eq;

    fn evaluate(text: &str) -> Result<ProviderCollection, ManifestError> {
        let manifest: Manifest = text.parse()?;
        manifest.evaluate(&catalog(), SequentialNames::shared())
    }

    #[test]
    fn parses_declarations() {
        let manifest: Manifest = r#"
providers:
  - type: aws
    version: "~> 2.0"
    resources:
      instance:
        - $name: web
          ami: ami-123
        - ami: ami-456
"#
        .parse()
        .unwrap();

        let aws = &manifest.providers[0];
        assert_eq!(aws.version.as_deref(), Some("~> 2.0"));
        let instances = &aws.resources["instance"];
        assert_eq!(instances[0].name.as_deref(), Some("web"));
        assert_eq!(instances[1].name, None);
        assert_eq!(
            instances[1].values["ami"],
            serde_json::Value::from("ami-456")
        );
    }

    #[test]
    fn json_is_accepted() {
        let providers =
            evaluate(r#"{"providers": [{"type": "aws", "config": {"region": "eu-west-1"}}]}"#)
                .unwrap();
        assert_eq!(providers.len(), 1);
    }

    #[test]
    fn references_resolve_to_computed() {
        let mut providers = evaluate(
            r#"
providers:
  - type: aws
    data:
      ami: [ { $name: ubuntu, most_recent: true } ]
    resources:
      instance:
        - $name: web
          ami: { $ref: data.aws_ami.ubuntu.id }
"#,
        )
        .unwrap();

        let web = providers.lookup(Kind::Resource, "aws_instance", "web").unwrap();
        let ami = web.get("ami").and_then(Member::into_value).unwrap();
        assert_eq!(
            ami.as_computed().map(ToString::to_string).as_deref(),
            Some("data.aws_ami.ubuntu.id")
        );

        let rendered = to_hcl_string(&providers).unwrap();
        assert!(rendered.contains("ami = data.aws_ami.ubuntu.id"));
    }

    #[test]
    fn set_values_are_copied() {
        let mut providers = evaluate(
            r#"
providers:
  - type: aws
    resources:
      instance:
        - { $name: a, ami: ami-123 }
        - { $name: b, ami: { $ref: aws_instance.a.ami } }
"#,
        )
        .unwrap();

        let b = providers.lookup(Kind::Resource, "aws_instance", "b").unwrap();
        assert_eq!(
            b.get("ami").and_then(Member::into_value),
            Some(&Value::from("ami-123"))
        );
    }

    #[test]
    fn forward_references_fail() {
        let err = evaluate(
            r#"
providers:
  - type: aws
    resources:
      instance:
        - { $name: a, ami: { $ref: aws_instance.b.arn } }
        - { $name: b, ami: ami-123 }
"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ManifestError::UnresolvedReference { ref location, ref reference }
                if location == "aws.resource.instance[0].ami" && reference == "aws_instance.b.arn"
        ));
    }

    #[test]
    fn errors_name_their_location() {
        let err = evaluate(
            r#"
providers:
  - type: aws
    resources:
      instance:
        - { $name: web, ami: 42 }
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid assignment at aws.resource.instance[0].ami"
        );

        let err = evaluate("providers: [ { type: aws, resources: { lambda: [ {} ] } } ]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Provider aws has no resource type \"lambda\""
        );

        let err = evaluate("providers: [ { type: google } ]").unwrap_err();
        assert!(matches!(err, ManifestError::Provider { index: 0, .. }));

        let err = evaluate("providers: [ { type: aws, config: { region: null } } ]").unwrap_err();
        assert!(matches!(err, ManifestError::InvalidValue { .. }));

        assert!(matches!(
            evaluate("providers: {}").unwrap_err(),
            ManifestError::Parse(_)
        ));
    }

    #[test]
    fn nested_blocks_from_lists() {
        let mut providers = evaluate(
            r#"
providers:
  - type: aws
    resources:
      security_group:
        - $name: web
          ingress:
            - { from_port: 80 }
            - { from_port: 443 }
"#,
        )
        .unwrap();

        let group = providers
            .lookup(Kind::Resource, "aws_security_group", "web")
            .unwrap();
        let ingress = group.get("ingress").and_then(Member::into_blocks).unwrap();
        assert_eq!(ingress.len(), 2);
    }

    #[test]
    fn label_and_name_attribute_are_distinct() {
        let mut providers = evaluate(
            r#"
providers:
  - type: aws
    resources:
      security_group:
        - { $name: web, name: web-sg }
        - { name: db-sg }
"#,
        )
        .unwrap();

        let web = providers
            .lookup(Kind::Resource, "aws_security_group", "web")
            .unwrap();
        assert_eq!(
            web.get("name").and_then(Member::into_value),
            Some(&Value::from("web-sg"))
        );

        let generated = providers
            .lookup(Kind::Resource, "aws_security_group", "id_1")
            .unwrap();
        assert_eq!(
            generated.get("name").and_then(Member::into_value),
            Some(&Value::from("db-sg"))
        );
        assert!(providers
            .lookup(Kind::Resource, "aws_security_group", "db-sg")
            .is_none());
    }
}
