//! schema bound resources
//!
//! A [Resource] is one instance of a [Block] schema. It only stores what was touched: attributes that were set and
//! nested blocks that were materialized. Attribute names are resolved against the schema at runtime.
//!
//! Reading is not pure. [Resource::get] materializes nested blocks and memoizes computed references on first
//! access so that repeated reads hand out the same instance.
use crate::collection::ResourceCollection;
use crate::schema::{Block, NestedBlock};
use crate::value::{hash_entries, Computed, TypeMismatch, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Implicitly computed on every resource, declared in the schema or not
pub const ID_ATTRIBUTE: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `resource "<type>" "<name>"`
    Resource,
    /// `data "<type>" "<name>"`
    Data,
    /// `<type>`, a block inside another block
    Nested,
    /// `provider "<type>"`
    Provider,
}

impl Kind {
    /// Top-level resources and data sources are addressed by name
    pub fn requires_name(&self) -> bool {
        matches!(self, Kind::Resource | Kind::Data)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Resource => f.write_str("resource"),
            Kind::Data => f.write_str("data"),
            Kind::Nested => f.write_str("nested"),
            Kind::Provider => f.write_str("provider"),
        }
    }
}

/// Identity of a resource inside the generated configuration
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub kind: Kind,
    #[new(into)]
    pub type_name: String,
    pub name: Option<String>,
}

impl Address {
    /// Traversal segments: `[data, ]<type>[, <name>]`
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::with_capacity(3);
        if self.kind == Kind::Data {
            segments.push("data");
        }

        segments.push(self.type_name.as_str());
        if self.kind != Kind::Nested {
            segments.extend(self.name.as_deref());
        }

        segments
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments().join("."))
    }
}

/// Aliased provider a top-level resource is bound to
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq)]
pub struct ProviderRef {
    #[new(into)]
    pub type_name: String,
    #[new(into)]
    pub alias: String,
}

impl ProviderRef {
    /// `<type>.<alias>`
    pub fn traversal(&self) -> hcl::Traversal {
        hcl::Traversal::builder(hcl::Variable::unchecked(self.type_name.as_str()))
            .attr(self.alias.as_str())
            .build()
    }
}

/// Something stored in a resource
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Value(Value),
    /// singleton nested block
    Block(Resource),
    /// repeatable nested block
    Blocks(ResourceCollection),
}

/// Result of [Resource::get]
#[derive(Debug)]
pub enum Member<'r> {
    Value(&'r Value),
    Block(&'r mut Resource),
    Blocks(&'r mut ResourceCollection),
}

impl<'r> Member<'r> {
    pub fn into_value(self) -> Option<&'r Value> {
        match self {
            Member::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_block(self) -> Option<&'r mut Resource> {
        match self {
            Member::Block(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn into_blocks(self) -> Option<&'r mut ResourceCollection> {
        match self {
            Member::Blocks(collection) => Some(collection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    name: Option<String>,
    type_name: String,
    kind: Kind,
    schema: Arc<Block>,
    provider: Option<ProviderRef>,
    /// set attributes and materialized nested blocks
    values: IndexMap<String, Field>,
    /// memoized computed references, never rendered
    computed: IndexMap<String, Value>,
}

impl Resource {
    pub fn new(
        name: Option<String>,
        type_name: impl Into<String>,
        kind: Kind,
        schema: Arc<Block>,
    ) -> Self {
        Self {
            name,
            type_name: type_name.into(),
            kind,
            schema,
            provider: None,
            values: Default::default(),
            computed: Default::default(),
        }
    }

    pub fn with_provider(mut self, provider: Option<ProviderRef>) -> Self {
        self.provider = provider;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn schema(&self) -> &Block {
        &self.schema
    }

    pub fn provider(&self) -> Option<&ProviderRef> {
        self.provider.as_ref()
    }

    pub fn address(&self) -> Address {
        Address::new(self.kind, self.type_name.as_str(), self.name.clone())
    }

    /// Computed reference to `attribute` of this resource
    pub fn reference(&self, attribute: &str) -> Computed {
        Computed::new(self.address(), attribute)
    }

    /// Set attributes and materialized blocks in assignment order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.values.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.values.get(name)
    }

    /// Reads a member, materializing it where the schema says so
    ///
    /// - computed attributes (and `id`) yield a memoized [Computed] reference
    /// - nested blocks are created empty on first access and kept
    /// - set attributes yield their value
    /// - anything else yields `None`
    pub fn get(&mut self, name: &str) -> Option<Member<'_>> {
        let is_computed = self
            .schema
            .attributes
            .get(name)
            .is_some_and(|attribute| attribute.computed);

        if is_computed || name == ID_ATTRIBUTE {
            if !self.computed.contains_key(name) {
                let reference = Value::Computed(self.reference(name));
                self.computed.insert(name.to_string(), reference);
            }

            return self.computed.get(name).map(Member::Value);
        }

        if let Some(nested) = self.schema.block_types.get(name).cloned() {
            return self.materialize(name, &nested);
        }

        self.values.get_mut(name).map(|field| match field {
            Field::Value(value) => Member::Value(value),
            Field::Block(resource) => Member::Block(resource),
            Field::Blocks(collection) => Member::Blocks(collection),
        })
    }

    fn materialize(&mut self, name: &str, nested: &NestedBlock) -> Option<Member<'_>> {
        if !self.values.contains_key(name) {
            let field = if nested.is_singleton() {
                Field::Block(Resource::new(
                    None,
                    name,
                    Kind::Nested,
                    nested.block.clone(),
                ))
            } else {
                Field::Blocks(ResourceCollection::new(
                    name,
                    Kind::Nested,
                    nested.block.clone(),
                    None,
                ))
            };

            tracing::trace!(type_name = %self.type_name, name, "nested block materialized");
            self.values.insert(name.to_string(), field);
        }

        match self.values.get_mut(name)? {
            Field::Block(resource) => Some(Member::Block(resource)),
            Field::Blocks(collection) => Some(Member::Blocks(collection)),
            Field::Value(_) => None,
        }
    }

    /// Assigns a value to an attribute or the contents of a nested block
    ///
    /// Nested blocks take an object whose keys are assigned one by one. Repeatable blocks also take an array of
    /// objects, each one appended as a new element. Partial assignments are not rolled back on failure.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ResourceError> {
        let value = value.into();

        if let Some(nested) = self.schema.block_types.get(name).cloned() {
            return self.set_nested(name, &nested, value);
        }

        let Some(attribute) = self.schema.attributes.get(name) else {
            return Err(ResourceError::UnknownAttribute {
                type_name: self.type_name.clone(),
                name: name.to_string(),
            });
        };

        value
            .validate_against(&attribute.ty)
            .map_err(|source| ResourceError::TypeMismatch {
                type_name: self.type_name.clone(),
                name: format!("{name}{}", source.path),
                source,
            })?;

        tracing::trace!(type_name = %self.type_name, name, "attribute set");
        self.values.insert(name.to_string(), Field::Value(value));
        Ok(())
    }

    fn set_nested(
        &mut self,
        name: &str,
        nested: &NestedBlock,
        value: Value,
    ) -> Result<(), ResourceError> {
        let type_name = self.type_name.clone();
        let wrong_shape = |value: &Value| ResourceError::WrongShape {
            type_name: type_name.clone(),
            name: name.to_string(),
            actual: value.type_name(),
        };

        // checked before materializing
        let offending = match &value {
            Value::Object(_) => None,
            Value::Array(items) if !nested.is_singleton() => items
                .iter()
                .find(|item| !matches!(item, Value::Object(_))),
            other => Some(other),
        };
        if let Some(offending) = offending {
            return Err(wrong_shape(offending));
        }

        match (self.materialize(name, nested), value) {
            (Some(Member::Block(resource)), Value::Object(entries)) => resource.load(entries),
            (Some(Member::Blocks(collection)), Value::Object(entries)) => {
                collection.push(None).load(entries)
            }
            (Some(Member::Blocks(collection)), Value::Array(items)) => {
                for item in items {
                    if let Value::Object(entries) = item {
                        collection.push(None).load(entries)?;
                    }
                }
                Ok(())
            }
            (_, value) => Err(wrong_shape(&value)),
        }
    }

    /// Assigns every entry, stops at the first failure
    pub fn load(&mut self, entries: IndexMap<String, Value>) -> Result<(), ResourceError> {
        for (name, value) in entries {
            self.set(&name, value)?;
        }

        Ok(())
    }

    /// Union of declared attribute and nested block names
    pub fn attribute_names(&self) -> Vec<&str> {
        self.schema
            .attributes
            .keys()
            .chain(self.schema.block_types.keys())
            .map(String::as_str)
            .collect()
    }

    /// Deterministic hash over the set entries, independent of assignment order
    pub fn hash(&self) -> u32 {
        hash_entries(
            self.values
                .iter()
                .map(|(name, field)| (name.as_str(), field.hash())),
        )
    }

    /// Nested plain representation of everything that was set, for inspection
    pub fn to_plain_mapping(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, field)| {
                    let plain = match field {
                        Field::Value(value) => value.clone(),
                        Field::Block(resource) => resource.to_plain_mapping(),
                        Field::Blocks(collection) => collection.to_plain_sequence(),
                    };
                    (name.clone(), plain)
                })
                .collect(),
        )
    }
}

impl Field {
    pub fn hash(&self) -> u32 {
        match self {
            Field::Value(value) => value.hash(),
            Field::Block(resource) => resource.hash(),
            Field::Blocks(collection) => collection.hash(),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({name:?})", self.type_name),
            None => write!(f, "{}", self.type_name),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ResourceError {
    #[error("{type_name} has no attribute or block {name:?}")]
    UnknownAttribute { type_name: String, name: String },
    #[error("{type_name}.{name}: {source}")]
    TypeMismatch {
        type_name: String,
        name: String,
        source: TypeMismatch,
    },
    #[error("{type_name}.{name}: expected object or array of objects, got {actual}")]
    WrongShape {
        type_name: String,
        name: String,
        actual: &'static str,
    },
    #[error("{type_name}[{index}]: index out of range, collection has {len} elements")]
    IndexOutOfRange {
        type_name: String,
        index: usize,
        len: usize,
    },
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::schema::{Attribute, AttributeType};
    use pretty_assertions::assert_eq;

    pub(crate) fn instance_schema() -> Arc<Block> {
        let ingress = Block::builder()
            .attribute("from_port", Attribute::new(AttributeType::Number))
            .attribute("to_port", Attribute::new(AttributeType::Number))
            .build();
        let root_device = Block::builder()
            .attribute("volume_size", Attribute::new(AttributeType::Number))
            .build();

        Arc::new(
            Block::builder()
                .attribute("ami", Attribute::new(AttributeType::String))
                .attribute("count", Attribute::new(AttributeType::Number))
                .attribute("arn", Attribute::computed(AttributeType::String))
                .attribute(
                    "tags",
                    Attribute::new(AttributeType::Map(Box::new(AttributeType::String))),
                )
                .nested("ingress", NestedBlock::new(ingress, 0))
                .nested("root_block_device", NestedBlock::new(root_device, 1))
                .build(),
        )
    }

    fn web() -> Resource {
        Resource::new(
            Some("web".into()),
            "aws_instance",
            Kind::Resource,
            instance_schema(),
        )
    }

    #[test]
    fn set_then_get() {
        let mut resource = web();
        resource.set("ami", "ami-123").unwrap();

        let value = resource.get("ami").and_then(Member::into_value);
        assert_eq!(value, Some(&Value::from("ami-123")));

        resource.set("ami", "ami-456").unwrap();
        let value = resource.get("ami").and_then(Member::into_value);
        assert_eq!(value, Some(&Value::from("ami-456")));
    }

    #[test]
    fn unset_attribute_reads_none() {
        let mut resource = web();
        assert!(resource.get("count").is_none());
        assert!(resource.get("not_in_schema").is_none());
    }

    #[test]
    fn computed_is_memoized() {
        let mut resource = web();

        let first = resource.get("arn").and_then(Member::into_value).unwrap() as *const Value;
        let second = resource.get("arn").and_then(Member::into_value).unwrap() as *const Value;
        assert!(std::ptr::eq(first, second));

        let id = resource.get("id").and_then(Member::into_value).cloned();
        assert_eq!(id, Some(Value::Computed(resource.reference("id"))));

        // placeholders are not assignments
        assert_eq!(resource.fields().count(), 0);
    }

    #[test]
    fn unknown_attribute() {
        let mut resource = web();
        let err = resource.set("region", "us-east-1").unwrap_err();
        assert_eq!(
            err,
            ResourceError::UnknownAttribute {
                type_name: "aws_instance".into(),
                name: "region".into()
            }
        );
        assert_eq!(err.to_string(), "aws_instance has no attribute or block \"region\"");

        // id is only implicitly readable
        assert!(resource.set("id", "i-123").is_err());
    }

    #[test]
    fn type_mismatch() {
        let mut resource = web();
        let err = resource.set("ami", 42).unwrap_err();
        assert_eq!(
            err.to_string(),
            "aws_instance.ami: expected string, got integer"
        );

        let err = resource
            .set("tags", IndexMap::from([("Name", Value::from(true))]))
            .unwrap_err();
        assert!(matches!(err, ResourceError::TypeMismatch { name, .. } if name == "tags.Name"));
    }

    #[test]
    fn nested_singleton() {
        let mut resource = web();
        resource
            .set("root_block_device", IndexMap::from([("volume_size", 20)]))
            .unwrap();

        let device = resource
            .get("root_block_device")
            .and_then(Member::into_block)
            .unwrap();
        assert_eq!(device.kind(), Kind::Nested);
        assert_eq!(device.name(), None);
        assert_eq!(
            device.get("volume_size").and_then(Member::into_value),
            Some(&Value::from(20))
        );
    }

    #[test]
    fn nested_collection() {
        let mut resource = web();
        resource
            .set("ingress", IndexMap::from([("from_port", 80)]))
            .unwrap();
        resource
            .set(
                "ingress",
                vec![
                    Value::from(IndexMap::from([("from_port", 443)])),
                    Value::from(IndexMap::from([("from_port", 8443)])),
                ],
            )
            .unwrap();

        let ingress = resource
            .get("ingress")
            .and_then(Member::into_blocks)
            .unwrap();
        assert_eq!(ingress.len(), 3);
        assert_eq!(
            ingress.index(2).unwrap().get("from_port").and_then(Member::into_value),
            Some(&Value::from(8443))
        );
    }

    #[test]
    fn nested_wrong_shape() {
        let mut resource = web();
        let err = resource.set("root_block_device", "big").unwrap_err();
        assert_eq!(
            err,
            ResourceError::WrongShape {
                type_name: "aws_instance".into(),
                name: "root_block_device".into(),
                actual: "string"
            }
        );

        let err = resource.set("ingress", vec![1]).unwrap_err();
        assert!(matches!(err, ResourceError::WrongShape { actual: "integer", .. }));

        let device = Value::from(IndexMap::from([("volume_size", 8)]));
        let err = resource.set("root_block_device", vec![device]).unwrap_err();
        assert!(matches!(err, ResourceError::WrongShape { actual: "array", .. }));

        // rejected assignments leave no empty block behind
        assert_eq!(resource.fields().count(), 0);
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut resource = web();
        let err = resource.set("count", f64::NAN).unwrap_err();
        assert!(matches!(err, ResourceError::TypeMismatch { ref name, .. } if name == "count"));
        assert!(resource.field("count").is_none());
    }

    #[test]
    fn nested_assignment_errors_propagate() {
        let mut resource = web();
        let err = resource
            .set("root_block_device", IndexMap::from([("volume_size", "big")]))
            .unwrap_err();
        assert!(matches!(err, ResourceError::TypeMismatch { type_name, .. } if type_name == "root_block_device"));
    }

    #[test]
    fn attribute_names_cover_schema() {
        let resource = web();
        assert_eq!(
            resource.attribute_names(),
            ["ami", "count", "arn", "tags", "ingress", "root_block_device"]
        );
    }

    #[test]
    fn hash_ignores_assignment_order() {
        let mut a = web();
        a.set("ami", "ami-123").unwrap();
        a.set("count", 2).unwrap();

        let mut b = web();
        b.set("count", 2).unwrap();
        b.set("ami", "ami-123").unwrap();
        assert_eq!(a.hash(), b.hash());

        b.set("count", 3).unwrap();
        assert_ne!(a.hash(), b.hash());

        let mut c = web();
        c.set("ami", "ami-123").unwrap();
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn plain_mapping() {
        let mut resource = web();
        resource.set("ami", "ami-123").unwrap();
        resource
            .set("ingress", IndexMap::from([("from_port", 80)]))
            .unwrap();
        resource
            .set("root_block_device", IndexMap::from([("volume_size", 8)]))
            .unwrap();

        let expected = Value::from(IndexMap::from([
            ("ami", Value::from("ami-123")),
            (
                "ingress",
                Value::from(vec![Value::from(IndexMap::from([("from_port", 80)]))]),
            ),
            (
                "root_block_device",
                Value::from(IndexMap::from([("volume_size", 8)])),
            ),
        ]));
        assert_eq!(resource.to_plain_mapping(), expected);
    }

    #[test]
    fn addresses() {
        let resource = web();
        assert_eq!(resource.address().to_string(), "aws_instance.web");

        let data = Resource::new(Some("x".into()), "aws_ami", Kind::Data, Default::default());
        assert_eq!(data.reference("id").to_string(), "data.aws_ami.x.id");

        let nested = Resource::new(None, "ingress", Kind::Nested, Default::default());
        assert_eq!(nested.address().to_string(), "ingress");
    }
}
