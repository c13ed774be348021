//! Language-agnostic Intermediate Representation and the stages that build
//! and narrow it.
//!
//! ## Module Structure
//!
//! - `types`: schema-level IR (type nodes, fields, model definitions)
//! - `api`: operation-level IR (services, operations, parameters)
//! - `normalize`: OpenAPI schema -> IR conversion with hoisting
//! - `operations`: path/operation collection
//! - `filter`: include/exclude tag filtering
//! - `prune`: reachability pruning of the model registry
//! - `dedup`: model deduplication
//! - `project`: per-target type projection

mod api;
mod dedup;
mod filter;
mod normalize;
mod operations;
mod project;
mod prune;
mod types;

pub use api::{
    Ir, IrOperation, IrParam, IrRequestBody, IrResponse, IrSecurityScheme, IrService, MISC_TAG, ResponseBody,
};
pub use dedup::dedup_models;
pub use filter::TagFilter;
pub use normalize::{Diagnostic, SchemaConverter};
pub use operations::{OperationCollector, collect_security_schemes, template_params};
pub use project::{
    Approximation, Capabilities, Literal, RecordField, Scalar, Target, TypeExpr, TypeProjector,
};
pub use prune::{Reachability, prune, reachable_models};
pub use types::{Annotations, EnumBase, IrDiscriminator, IrField, IrModelDef, IrSchema, SchemaKind};
