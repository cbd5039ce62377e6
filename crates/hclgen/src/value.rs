//! value representation
//!
//! Values assigned to resource attributes are either a literal
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//!
//! or a [Computed] reference to an attribute of some resource that is only known once terraform applied the
//! configuration. Computed references may appear anywhere inside arrays and objects.
//!
//! Additionally:
//! - there is no `null`/`None` value, unset attributes are simply absent.
//! - every `integer` is also a `number`, as is every `decimal`.
//!
//! Validation against an [AttributeType] happens when a value is assigned, not when it is constructed.
use crate::resource::Address;
use crate::schema::AttributeType;
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serializer,
};

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Computed(Computed),
}

/// Reference to attribute `attribute` of the resource at `address`
///
/// The resource is referenced by address only, it is never owned.
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Computed {
    address: Address,
    #[new(into)]
    attribute: String,
}

impl Computed {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// `<address>.<attribute>` as hcl traversal, e.g. `aws_instance.web.id`
    pub fn traversal(&self) -> hcl::Traversal {
        let mut segments = self.address.segments().into_iter();
        let root = segments.next().unwrap_or(self.attribute.as_str());

        let mut traversal = hcl::Traversal::builder(hcl::Variable::unchecked(root));
        for segment in segments {
            traversal = traversal.attr(segment);
        }

        traversal.attr(self.attribute.as_str()).build()
    }
}

impl std::fmt::Display for Computed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.address, self.attribute)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Computed(_) => "computed",
        }
    }

    pub fn as_computed(&self) -> Option<&Computed> {
        match self {
            Value::Computed(computed) => Some(computed),
            _ => None,
        }
    }

    /// Checks that this value can be represented as `ty`
    ///
    /// Computed references always pass, their real value is unknown until terraform resolves them.
    pub fn validate_against(&self, ty: &AttributeType) -> Result<(), TypeMismatch> {
        match (ty, self) {
            (_, Value::Computed(_)) => Ok(()),
            (_, Value::Decimal(value)) if !value.is_finite() => {
                Err(TypeMismatch::new(ty.to_string(), format!("non-finite decimal {value}")))
            }
            (AttributeType::Dynamic, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    item.validate_against(ty)
                        .map_err(|e| e.within(format!("[{index}]")))?;
                }
                Ok(())
            }
            (AttributeType::Dynamic, Value::Object(entries)) => {
                for (key, item) in entries {
                    item.validate_against(ty)
                        .map_err(|e| e.within(format!(".{key}")))?;
                }
                Ok(())
            }
            (AttributeType::Dynamic, _) => Ok(()),
            (AttributeType::String, Value::String(_))
            | (AttributeType::Bool, Value::Boolean(_))
            | (AttributeType::Number, Value::Integer(_) | Value::Decimal(_)) => Ok(()),
            (AttributeType::List(element) | AttributeType::Set(element), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    item.validate_against(element)
                        .map_err(|e| e.within(format!("[{index}]")))?;
                }
                Ok(())
            }
            (AttributeType::Map(element), Value::Object(entries)) => {
                for (key, item) in entries {
                    item.validate_against(element)
                        .map_err(|e| e.within(format!(".{key}")))?;
                }
                Ok(())
            }
            (AttributeType::Object(fields), Value::Object(entries)) => {
                for (key, item) in entries {
                    let Some(field) = fields.get(key) else {
                        return Err(TypeMismatch::new(
                            ty.to_string(),
                            format!("object with undeclared key {key:?}"),
                        ));
                    };
                    item.validate_against(field)
                        .map_err(|e| e.within(format!(".{key}")))?;
                }
                Ok(())
            }
            (AttributeType::Tuple(elements), Value::Array(items))
                if elements.len() == items.len() =>
            {
                for (index, (element, item)) in elements.iter().zip(items).enumerate() {
                    item.validate_against(element)
                        .map_err(|e| e.within(format!("[{index}]")))?;
                }
                Ok(())
            }
            _ => Err(TypeMismatch::new(ty.to_string(), self.type_name())),
        }
    }

    /// Deterministic structural hash
    pub fn hash(&self) -> u32 {
        match self {
            Value::Boolean(value) => hash_bytes(b'b', &[*value as u8]),
            Value::Integer(value) => hash_bytes(b'i', &value.to_le_bytes()),
            Value::Decimal(value) => hash_bytes(b'd', &value.to_bits().to_le_bytes()),
            Value::String(value) => hash_str(value),
            Value::Array(items) => hash_sequence(items.iter().map(Value::hash)),
            Value::Object(entries) => {
                hash_entries(entries.iter().map(|(key, value)| (key.as_str(), value.hash())))
            }
            Value::Computed(computed) => hash_bytes(b'c', computed.to_string().as_bytes()),
        }
    }

    /// The hcl expression this value renders as
    ///
    /// Computed references become raw traversals, never quoted strings.
    pub fn to_expression(&self) -> hcl::Expression {
        use hcl::Expression;

        match self {
            Value::Boolean(value) => Expression::Bool(*value),
            Value::Integer(value) => Expression::Number((*value).into()),
            Value::Decimal(value) => hcl::Number::from_f64(*value)
                .map(Expression::Number)
                .unwrap_or(Expression::Null),
            Value::String(value) => Expression::String(value.clone()),
            Value::Array(items) => {
                Expression::Array(items.iter().map(Value::to_expression).collect())
            }
            Value::Object(entries) => Expression::Object(
                entries
                    .iter()
                    .map(|(key, value)| (object_key(key), value.to_expression()))
                    .collect(),
            ),
            Value::Computed(computed) => computed.traversal().into(),
        }
    }
}

/// Identifier keys stay bare, anything else gets quoted
fn object_key(key: &str) -> hcl::ObjectKey {
    match hcl::Identifier::new(key) {
        Ok(ident) => hcl::ObjectKey::Identifier(ident),
        Err(_) => hcl::ObjectKey::Expression(hcl::Expression::String(key.to_string())),
    }
}

/// A value did not match the declared attribute type
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, got {actual}")]
pub struct TypeMismatch {
    /// location inside the value, empty for the value itself
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl TypeMismatch {
    fn new(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    fn within(mut self, segment: String) -> Self {
        self.path.insert_str(0, &segment);
        self
    }
}

// Seed and multipliers for combining named entries. Both multipliers stay odd, the step is even.
const ENTRY_SEED: u32 = 8731;
const ENTRY_NAME_MULTIPLIER: u32 = 3;
const ENTRY_VALUE_MULTIPLIER: u32 = 9839;
const ENTRY_MULTIPLIER_STEP: u32 = 7350;

// Seed and multiplier for combining sequences, position matters.
const SEQUENCE_SEED: u32 = 0x345678;
const SEQUENCE_MULTIPLIER: u32 = 1000003;

fn hash_bytes(tag: u8, bytes: &[u8]) -> u32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[tag]);
    hasher.update(bytes);

    let digest = hasher.finalize();
    let digest = digest.as_bytes();
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub(crate) fn hash_str(value: &str) -> u32 {
    hash_bytes(b's', value.as_bytes())
}

/// Order independent: entries are combined sorted by name
pub(crate) fn hash_entries<'a>(entries: impl Iterator<Item = (&'a str, u32)>) -> u32 {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut x = ENTRY_SEED;
    let mut name_multiplier = ENTRY_NAME_MULTIPLIER;
    let mut value_multiplier = ENTRY_VALUE_MULTIPLIER;
    for (name, value) in entries {
        x ^= hash_str(name).wrapping_mul(name_multiplier);
        x ^= value.wrapping_mul(value_multiplier);
        name_multiplier = name_multiplier.wrapping_add(ENTRY_MULTIPLIER_STEP);
        value_multiplier = value_multiplier.wrapping_add(ENTRY_MULTIPLIER_STEP);
    }

    x
}

pub(crate) fn hash_sequence(items: impl ExactSizeIterator<Item = u32>) -> u32 {
    let len = items.len() as u32;

    let mut x = SEQUENCE_SEED;
    let mut multiplier = SEQUENCE_MULTIPLIER;
    for item in items {
        x = (x ^ item).wrapping_mul(multiplier);
        multiplier = multiplier.wrapping_add(82520u32.wrapping_add(len).wrapping_add(len));
    }

    x
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<Computed> for Value {
    fn from(value: Computed) -> Self {
        Self::Computed(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = InvalidValue;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value as Json;

        match value {
            Json::Null => Err(InvalidValue::Null),
            Json::Bool(value) => Ok(value.into()),
            Json::Number(number) => match (number.as_i64(), number.as_f64()) {
                (Some(int), _) => Ok(Value::Integer(int)),
                // u64 beyond i64::MAX and floats
                (None, Some(decimal)) if decimal.is_finite() => Ok(Value::Decimal(decimal)),
                _ => Err(InvalidValue::Number(number.to_string())),
            },
            Json::String(value) => Ok(value.into()),
            Json::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(TryInto::try_into)
                    .collect::<Result<_, _>>()?,
            )),
            Json::Object(entries) => Ok(Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| Ok::<_, InvalidValue>((key, Value::try_from(value)?)))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}

/// An external document value without a counterpart
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidValue {
    #[error("null is not a valid value")]
    Null,
    #[error("number {0} is not a finite decimal")]
    Number(String),
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Computed(computed) => serializer.serialize_str(&format!("${{{computed}}}")),
        }
    }
}
