//! rendering of resource graphs as terraform configuration
//!
//! Every renderable type appends [hcl::Structure]s to the body it is rendered into:
//! - a [ResourceCollection] renders its elements in index order
//! - a top-level [Resource] renders `resource "<type>" "<name>" { ... }` (or `data ...`), a nested one renders
//!   `<type> { ... }`
//! - a block body holds the set attributes in schema order followed by the materialized nested blocks in schema
//!   order. Unset attributes are never rendered.
//!
//! Separation follows the hcl formatter: a block that follows other content in the same body is preceded by an
//! empty line, consecutive attributes are not.
use crate::collection::ResourceCollection;
use crate::provider::{Provider, ProviderCollection};
use crate::registry::SchemaRegistry;
use crate::resource::{Field, Kind, Resource};
use hcl::{Attribute, Block, BlockLabel, Body, Identifier, Structure};

/// Something that renders into an hcl body
pub trait ToHcl {
    fn to_hcl(&self, body: &mut Vec<Structure>);
}

/// Renders `root` as configuration text
pub fn to_hcl_string<T: ToHcl + ?Sized>(root: &T) -> Result<String, hcl::Error> {
    let mut structures = Vec::new();
    root.to_hcl(&mut structures);

    let body: Body = structures.into_iter().collect();
    hcl::format::to_string(&body)
}

impl ToHcl for Resource {
    fn to_hcl(&self, body: &mut Vec<Structure>) {
        let mut structures = Vec::new();

        if let Some(provider) = self.provider().filter(|_| self.kind().requires_name()) {
            structures.push(attribute("provider", provider.traversal().into()));
        }

        body_of(self, &mut structures);
        body.push(Structure::Block(header(self, structures)));
    }
}

/// Set attributes then nested blocks, both in schema definition order
fn body_of(resource: &Resource, structures: &mut Vec<Structure>) {
    let schema = resource.schema();

    for name in schema.attributes.keys() {
        if let Some(Field::Value(value)) = resource.field(name) {
            structures.push(attribute(name, value.to_expression()));
        }
    }

    for name in schema.block_types.keys() {
        match resource.field(name) {
            Some(Field::Block(nested)) => nested.to_hcl(structures),
            Some(Field::Blocks(collection)) => collection.to_hcl(structures),
            _ => {}
        }
    }
}

fn header(resource: &Resource, structures: Vec<Structure>) -> Block {
    let type_label = || BlockLabel::String(resource.type_name().to_string());

    let (identifier, labels) = match resource.kind() {
        Kind::Nested => (resource.type_name(), vec![]),
        Kind::Provider => ("provider", vec![type_label()]),
        kind @ (Kind::Resource | Kind::Data) => {
            let keyword = if kind == Kind::Data { "data" } else { "resource" };
            let name = BlockLabel::String(resource.name().unwrap_or_default().to_string());
            (keyword, vec![type_label(), name])
        }
    };

    Block {
        identifier: Identifier::unchecked(identifier),
        labels,
        body: structures.into_iter().collect(),
    }
}

fn attribute(name: &str, expr: hcl::Expression) -> Structure {
    Structure::Attribute(Attribute::new(Identifier::unchecked(name), expr))
}

impl ToHcl for ResourceCollection {
    fn to_hcl(&self, body: &mut Vec<Structure>) {
        for resource in self {
            resource.to_hcl(body);
        }
    }
}

impl ToHcl for SchemaRegistry {
    fn to_hcl(&self, body: &mut Vec<Structure>) {
        for collection in self.collections() {
            collection.to_hcl(body);
        }
    }
}

/// The provider block, when there is anything to configure, then data sources, then resources
impl ToHcl for Provider {
    fn to_hcl(&self, body: &mut Vec<Structure>) {
        let mut structures = Vec::new();
        if let Some(alias) = self.alias() {
            structures.push(attribute("alias", hcl::Expression::String(alias.to_string())));
        }
        if let Some(version) = self.version() {
            structures.push(attribute("version", hcl::Expression::String(version.to_string())));
        }
        body_of(self.config(), &mut structures);

        if !structures.is_empty() {
            body.push(Structure::Block(header(self.config(), structures)));
        }

        self.data().to_hcl(body);
        self.resources().to_hcl(body);
    }
}

impl ToHcl for ProviderCollection {
    fn to_hcl(&self, body: &mut Vec<Structure>) {
        for provider in self.iter() {
            provider.to_hcl(body);
        }
    }
}
