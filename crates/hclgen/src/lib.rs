//! # hclgen - schema driven terraform configuration
//!
//! `hclgen` builds terraform configuration from provider schemas. Resources are declared and assigned through a
//! generic, schema checked interface and the resulting graph is rendered as HCL.
//!
//! ## Introduction for developers
//!
//! ### Schemas
//!
//! Schemas are not known when this crate is built, they are discovered. The [schema::SchemaCatalog] loads the output
//! of `terraform providers schema -json`: per provider a configuration block, resource schemas and data source
//! schemas. A [schema::Block] declares attributes (with a type and whether they are `computed`) and nested blocks.
//!
//! ### The object graph
//!
//! | type                                | renders as                                  |
//! |-------------------------------------|---------------------------------------------|
//! | [provider::ProviderCollection]      | every provider in declaration order         |
//! | [provider::Provider]                | `provider "aws" { ... }`, data, resources   |
//! | [registry::SchemaRegistry]          | every bound collection                      |
//! | [collection::ResourceCollection]    | its elements in index order                 |
//! | [resource::Resource]                | `resource "aws_instance" "web" { ... }`     |
//!
//! A [registry::SchemaRegistry] binds a short name (`instance`) to the collection of the schema `aws_instance`. The
//! binding happens once, later lookups return the same collection.
//!
//! A [resource::Resource] only stores what was touched. Assignments are validated against the schema:
//!
//! ```
//! # use hclgen::resource::{Kind, Resource};
//! # use hclgen::schema::{Attribute, AttributeType, Block};
//! # use std::sync::Arc;
//! let schema = Block::builder()
//!     .attribute("ami", Attribute::new(AttributeType::String))
//!     .attribute("arn", Attribute::computed(AttributeType::String))
//!     .build();
//!
//! let mut web = Resource::new(Some("web".into()), "aws_instance", Kind::Resource, Arc::new(schema));
//! web.set("ami", "ami-123").unwrap();
//! assert!(web.set("ami", 42).is_err());
//! assert!(web.set("region", "us-east-1").is_err());
//! ```
//!
//! ### Computed values
//!
//! Reading a computed attribute (or `id`) does not yield a literal but a [value::Computed] reference holding the
//! address of its origin. Assigned to another resource it renders as a traversal: `ami = data.aws_ami.ubuntu.id`.
//! References are plain addresses, they never keep their origin alive.
//!
//! ### Reads materialize
//!
//! [resource::Resource::get] is a memoizing constructor. Nested blocks are created empty on first access and stay
//! part of the resource, computed references are created once and handed out again.
//!
//! ### Output
//!
//! [hcl_render::ToHcl] turns the graph into [hcl::Structure]s which are formatted by [hcl::format].
//!
//! ### Manifests
//!
//! Without a scripting host the graph can be driven by a [manifest::Manifest], a YAML or JSON document applied in
//! order. See the `hclgen` binary.
//!
pub mod collection;
pub mod hcl_render;
pub mod manifest;
pub mod naming;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod value;
