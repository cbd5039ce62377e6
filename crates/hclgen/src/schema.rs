//! provider schemas as reported by `terraform providers schema -json`
//!
//! The catalog is read-only once loaded. Blocks are shared behind [Arc] so that every resource bound to a
//! schema can keep a handle on it without copying.
//!
//! Attribute and block definition order is preserved, it is the order in which attributes are rendered.
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Declared type of an attribute (cty type)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum AttributeType {
    String,
    Number,
    Bool,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(IndexMap<String, AttributeType>),
    Tuple(Vec<AttributeType>),
    #[default]
    Dynamic,
}

impl TryFrom<serde_json::Value> for AttributeType {
    type Error = TypeSpecError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;

        match value {
            Json::String(primitive) => match primitive.as_str() {
                "string" => Ok(AttributeType::String),
                "number" => Ok(AttributeType::Number),
                "bool" => Ok(AttributeType::Bool),
                "dynamic" => Ok(AttributeType::Dynamic),
                _ => Err(TypeSpecError::UnknownPrimitive(primitive)),
            },
            Json::Array(mut parts) if parts.len() >= 2 => {
                let Json::String(constructor) = parts.remove(0) else {
                    return Err(TypeSpecError::Malformed(Json::Array(parts)));
                };
                let argument = parts.remove(0);

                match (constructor.as_str(), argument) {
                    ("list", element) => {
                        Ok(AttributeType::List(Box::new(AttributeType::try_from(element)?)))
                    }
                    ("set", element) => {
                        Ok(AttributeType::Set(Box::new(AttributeType::try_from(element)?)))
                    }
                    ("map", element) => {
                        Ok(AttributeType::Map(Box::new(AttributeType::try_from(element)?)))
                    }
                    // a third element lists optional attributes, every object attribute is optional to us
                    ("object", Json::Object(fields)) => Ok(AttributeType::Object(
                        fields
                            .into_iter()
                            .map(|(name, ty)| {
                                Ok::<_, TypeSpecError>((name, AttributeType::try_from(ty)?))
                            })
                            .collect::<Result<_, TypeSpecError>>()?,
                    )),
                    ("tuple", Json::Array(elements)) => Ok(AttributeType::Tuple(
                        elements
                            .into_iter()
                            .map(AttributeType::try_from)
                            .collect::<Result<_, _>>()?,
                    )),
                    (other, _) => Err(TypeSpecError::UnknownConstructor(other.to_owned())),
                }
            }
            other => Err(TypeSpecError::Malformed(other)),
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeType::String => f.write_str("string"),
            AttributeType::Number => f.write_str("number"),
            AttributeType::Bool => f.write_str("bool"),
            AttributeType::Dynamic => f.write_str("dynamic"),
            AttributeType::List(element) => write!(f, "list({element})"),
            AttributeType::Set(element) => write!(f, "set({element})"),
            AttributeType::Map(element) => write!(f, "map({element})"),
            AttributeType::Object(fields) => {
                f.write_str("object({")?;
                for (index, (name, ty)) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={ty}")?;
                }
                f.write_str("})")
            }
            AttributeType::Tuple(elements) => {
                f.write_str("tuple([")?;
                for (index, ty) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str("])")
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TypeSpecError {
    #[error("unknown primitive type {0:?}")]
    UnknownPrimitive(String),
    #[error("unknown type constructor {0:?}")]
    UnknownConstructor(String),
    #[error("malformed type specification {0}")]
    Malformed(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Attribute {
    /// Attributes with a `nested_type` carry no `type`, they accept anything
    #[serde(rename = "type", default)]
    pub ty: AttributeType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    /// Value is resolved by the provider, reads yield a reference
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub sensitive: bool,
}

impl Attribute {
    pub fn new(ty: AttributeType) -> Self {
        Self {
            ty,
            optional: true,
            ..Default::default()
        }
    }

    pub fn computed(ty: AttributeType) -> Self {
        Self {
            ty,
            computed: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    Single,
    Group,
    #[default]
    List,
    Set,
    Map,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NestedBlock {
    #[serde(default)]
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub block: Arc<Block>,
    #[serde(default)]
    pub min_items: u64,
    /// `0` means unbounded
    #[serde(default)]
    pub max_items: u64,
}

impl NestedBlock {
    pub fn new(block: Block, max_items: u64) -> Self {
        Self {
            nesting_mode: NestingMode::List,
            block: Arc::new(block),
            min_items: 0,
            max_items,
        }
    }

    /// A singleton block is embedded as one object, everything else is a collection
    pub fn is_singleton(&self) -> bool {
        self.max_items == 1 || matches!(self.nesting_mode, NestingMode::Single | NestingMode::Group)
    }
}

/// Shape of one block: its attributes and nested blocks
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
    #[serde(default)]
    pub block_types: IndexMap<String, NestedBlock>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Block {
    pub fn builder() -> BlockBuilder {
        BlockBuilder::default()
    }
}

/// Convenience for assembling schemas in code
#[derive(Debug, Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attribute);
        self
    }

    pub fn nested(mut self, name: impl Into<String>, nested: NestedBlock) -> Self {
        self.block.block_types.insert(name.into(), nested);
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

/// A versioned block schema
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub block: Arc<Block>,
}

impl From<Block> for Schema {
    fn from(block: Block) -> Self {
        Self {
            version: 0,
            block: Arc::new(block),
        }
    }
}

/// Everything a single provider reports
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Schema,
    #[serde(default)]
    pub resource_schemas: IndexMap<String, Schema>,
    #[serde(default)]
    pub data_source_schemas: IndexMap<String, Schema>,
}

/// All known provider schemas keyed by source address (`registry.terraform.io/hashicorp/aws`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    provider_schemas: IndexMap<String, ProviderSchema>,
}

impl SchemaCatalog {
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_file(path: &Path) -> Result<Self, SchemaError> {
        tracing::info!(path=%path.display(), "loading schema catalog");

        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&text)?;

        tracing::debug!(providers = catalog.provider_schemas.len(), "schema catalog loaded");
        Ok(catalog)
    }

    pub fn insert(&mut self, source: impl Into<String>, schema: ProviderSchema) {
        self.provider_schemas.insert(source.into(), schema);
    }

    /// Lookup by full source address or by provider type (last address segment)
    pub fn provider(&self, type_name: &str) -> Option<&ProviderSchema> {
        self.provider_schemas.get(type_name).or_else(|| {
            self.provider_schemas
                .iter()
                .find(|(source, _)| source.rsplit('/').next() == Some(type_name))
                .map(|(_, schema)| schema)
        })
    }

    pub fn providers(&self) -> impl Iterator<Item = (&str, &ProviderSchema)> {
        self.provider_schemas
            .iter()
            .map(|(source, schema)| (source.as_str(), schema))
    }

    /// Resource or data source schema by qualified type name (`aws_instance`)
    pub fn schema_for(&self, qualified: &str) -> Option<&Block> {
        self.provider_schemas.values().find_map(|provider| {
            provider
                .resource_schemas
                .get(qualified)
                .or_else(|| provider.data_source_schemas.get(qualified))
                .map(|schema| schema.block.as_ref())
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse schema catalog")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) const CATALOG: &str = r#"{
        "format_version": "1.0",
        "provider_schemas": {
            "registry.terraform.io/hashicorp/aws": {
                "provider": {
                    "version": 0,
                    "block": {
                        "attributes": {
                            "region": { "type": "string", "optional": true }
                        }
                    }
                },
                "resource_schemas": {
                    "aws_instance": {
                        "version": 1,
                        "block": {
                            "attributes": {
                                "ami": { "type": "string", "required": true },
                                "id": { "type": "string", "optional": true, "computed": true },
                                "tags": { "type": ["map", "string"], "optional": true },
                                "ports": { "type": ["list", "number"], "optional": true },
                                "arn": { "type": "string", "computed": true }
                            },
                            "block_types": {
                                "ebs_block_device": {
                                    "nesting_mode": "set",
                                    "block": {
                                        "attributes": {
                                            "device_name": { "type": "string", "required": true },
                                            "volume_size": { "type": "number", "optional": true }
                                        }
                                    }
                                },
                                "root_block_device": {
                                    "nesting_mode": "list",
                                    "max_items": 1,
                                    "block": {
                                        "attributes": {
                                            "volume_size": { "type": "number", "optional": true }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "aws_security_group": {
                        "version": 1,
                        "block": {
                            "attributes": {
                                "name": { "type": "string", "optional": true },
                                "vpc_id": { "type": "string", "optional": true },
                                "id": { "type": "string", "optional": true, "computed": true }
                            },
                            "block_types": {
                                "ingress": {
                                    "nesting_mode": "set",
                                    "block": {
                                        "attributes": {
                                            "from_port": { "type": "number", "required": true },
                                            "to_port": { "type": "number", "optional": true }
                                        }
                                    }
                                }
                            }
                        }
                    }
                },
                "data_source_schemas": {
                    "aws_ami": {
                        "version": 0,
                        "block": {
                            "attributes": {
                                "most_recent": { "type": "bool", "optional": true },
                                "owners": { "type": ["list", "string"], "optional": true },
                                "id": { "type": "string", "optional": true, "computed": true }
                            }
                        }
                    }
                }
            }
        }
    }"#;

    pub(crate) fn catalog() -> SchemaCatalog {
        SchemaCatalog::from_json(CATALOG).expect("test catalog must parse")
    }

    #[test]
    fn parses_terraform_json() {
        let catalog = catalog();
        assert_eq!(catalog.format_version.as_deref(), Some("1.0"));

        let instance = catalog.schema_for("aws_instance").expect("aws_instance");
        let names: Vec<_> = instance.attributes.keys().map(String::as_str).collect();
        assert_eq!(names, ["ami", "id", "tags", "ports", "arn"]);
        assert!(instance.attributes["arn"].computed);
        assert_eq!(
            instance.attributes["tags"].ty,
            AttributeType::Map(Box::new(AttributeType::String))
        );

        assert!(!instance.block_types["ebs_block_device"].is_singleton());
        assert!(instance.block_types["root_block_device"].is_singleton());
        assert!(catalog.schema_for("aws_ami").is_some());
        assert!(catalog.schema_for("aws_vpc").is_none());
    }

    #[test]
    fn provider_lookup_by_type() {
        let catalog = catalog();
        assert!(catalog.provider("aws").is_some());
        assert!(catalog.provider("registry.terraform.io/hashicorp/aws").is_some());
        assert!(catalog.provider("google").is_none());
    }

    #[test]
    fn cty_type_encoding() {
        let ty: AttributeType = serde_json::from_str(
            r#"["object", {"name": "string", "ports": ["tuple", ["number", "bool"]]}, ["ports"]]"#,
        )
        .unwrap();
        assert_eq!(
            ty.to_string(),
            "object({name=string, ports=tuple([number, bool])})"
        );

        let err = serde_json::from_str::<AttributeType>(r#"["queue", "string"]"#).unwrap_err();
        assert!(err.to_string().contains("queue"));
    }

    #[test]
    fn single_nesting_is_singleton() {
        let nested: NestedBlock =
            serde_json::from_str(r#"{"nesting_mode": "single", "block": {}}"#).unwrap();
        assert!(nested.is_singleton());
        assert!(!NestedBlock::new(Block::default(), 0).is_singleton());
        assert!(!NestedBlock::new(Block::default(), 3).is_singleton());
    }
}
