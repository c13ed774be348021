//! Schema conversion from OpenAPI schemas to IR type nodes.
//!
//! A [`SchemaConverter`] is the builder context of one generation run. It owns
//! the model registry and the diagnostics, and is threaded by `&mut` through
//! the recursion. Nested anonymous objects and enums are hoisted into their own
//! [`IrModelDef`] under a synthetic name derived from their position:
//!
//! ```text
//! parent [ "_" Pascal(property) ] [ "_Item" ]
//! ```
//!
//! Models are registered in post-order, so a hoisted child always precedes the
//! model that references it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::naming::to_pascal_case;
use crate::openapi::{AdditionalProperties, EnumValue, OpenApiSpec, Schema, ref_name};

use super::types::{Annotations, EnumBase, IrDiscriminator, IrField, IrModelDef, IrSchema, SchemaKind};

/// A non-fatal problem found while building the IR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Schema position, e.g. `User.address[]`.
    pub location: String,
    /// What was degraded and how.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Where a schema sits relative to the model that owns it.
#[derive(Debug, Clone, Copy)]
struct Position<'a> {
    parent: &'a str,
    property: Option<&'a str>,
    array_item: bool,
    hoist: bool,
}

impl<'a> Position<'a> {
    fn root(parent: &'a str) -> Self {
        Self {
            parent,
            property: None,
            array_item: false,
            hoist: true,
        }
    }

    fn inline(location: &'a str) -> Self {
        Self {
            parent: location,
            property: None,
            array_item: false,
            hoist: false,
        }
    }

    fn field(self, parent: &'a str, property: &'a str) -> Self {
        Self {
            parent,
            property: Some(property),
            array_item: false,
            hoist: self.hoist,
        }
    }

    fn item(self) -> Self {
        Self {
            array_item: true,
            ..self
        }
    }

    fn is_top_level(&self) -> bool {
        self.property.is_none() && !self.array_item
    }

    fn should_hoist(&self) -> bool {
        self.hoist && !self.is_top_level()
    }

    fn synthetic_name(&self) -> String {
        let mut name = self.parent.to_string();
        if let Some(property) = self.property {
            let segment = to_pascal_case(property);
            if !segment.is_empty() {
                name.push('_');
                name.push_str(&segment);
            }
        }
        if self.array_item {
            name.push_str("_Item");
        }
        name
    }

    fn describe(&self) -> String {
        let mut out = self.parent.to_string();
        if let Some(property) = self.property {
            out.push('.');
            out.push_str(property);
        }
        if self.array_item {
            out.push_str("[]");
        }
        out
    }
}

/// Builder context for one conversion run.
#[derive(Debug, Default)]
pub struct SchemaConverter {
    models: Vec<IrModelDef>,
    registered: HashMap<String, usize>,
    reserved: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl SchemaConverter {
    /// `reserved` are names synthetic models must never take, normally the
    /// document's component names.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved: reserved.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A converter with every component name of `spec` reserved.
    pub fn for_spec(spec: &OpenApiSpec) -> Self {
        Self::new(spec.component_schemas().map(|(name, _)| name.clone()))
    }

    /// Convert every component schema, in name order.
    pub fn convert_components(&mut self, spec: &OpenApiSpec) {
        for (name, schema) in spec.component_schemas() {
            self.convert_component(name, schema);
        }
    }

    /// Convert one component and register it under its own name.
    pub fn convert_component(&mut self, name: &str, schema: &Schema) {
        let ir = self.convert(schema, Position::root(name));
        self.push_model(name.to_string(), ir, annotations_of(schema));
    }

    /// Convert without hoisting. Used for parameters and bodies, whose inline
    /// shapes stay inline. `location` only labels diagnostics.
    pub fn convert_inline(&mut self, schema: &Schema, location: &str) -> IrSchema {
        self.convert(schema, Position::inline(location))
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Registered models, in registration order.
    pub fn models(&self) -> &[IrModelDef] {
        &self.models
    }

    /// Consume the converter, yielding the registry and the diagnostics.
    pub fn finish(self) -> (Vec<IrModelDef>, Vec<Diagnostic>) {
        (self.models, self.diagnostics)
    }

    fn diagnose(&mut self, location: String, message: String) {
        warn!(location = %location, "{message}");
        self.diagnostics.push(Diagnostic { location, message });
    }

    fn convert(&mut self, schema: &Schema, pos: Position<'_>) -> IrSchema {
        let nullable = schema.is_nullable();

        if let Some(path) = &schema.ref_path {
            return IrSchema::reference(ref_name(path)).with_nullable(nullable);
        }

        if let Some(members) = &schema.one_of {
            return self.convert_union(schema, members, pos, UnionKind::OneOf);
        }
        if let Some(members) = &schema.any_of {
            return self.convert_union(schema, members, pos, UnionKind::AnyOf);
        }
        if let Some(members) = &schema.all_of {
            let members = members.iter().map(|m| self.convert(m, pos)).collect();
            return self.finish_node(SchemaKind::AllOf { members }, schema);
        }
        if let Some(inner) = &schema.not {
            let inner = Box::new(self.convert(inner, pos));
            return self.finish_node(SchemaKind::Not { inner }, schema);
        }

        if let Some(values) = enum_literals(schema) {
            return self.convert_enum(schema, values, pos);
        }

        let types = schema
            .schema_type
            .as_ref()
            .map(|t| t.non_null())
            .unwrap_or_default();

        match types.as_slice() {
            [] => self.convert_untyped(schema, pos),
            [single] => self.convert_typed(schema, single, pos),
            several => {
                let members = several
                    .iter()
                    .map(|t| IrSchema {
                        nullable: false,
                        ..self.convert_typed(schema, t, pos)
                    })
                    .collect();
                self.finish_node(SchemaKind::AnyOf { members }, schema)
            }
        }
    }

    fn convert_typed(&mut self, schema: &Schema, type_name: &str, pos: Position<'_>) -> IrSchema {
        let kind = match type_name {
            "string" => SchemaKind::String,
            "number" => SchemaKind::Number,
            "integer" => SchemaKind::Integer,
            "boolean" => SchemaKind::Boolean,
            "null" => SchemaKind::Null,
            "array" => return self.convert_array(schema, pos),
            "object" => return self.convert_object(schema, pos),
            other => {
                self.diagnose(pos.describe(), format!("unknown schema type {other:?}, treated as unknown"));
                SchemaKind::Unknown
            }
        };
        self.finish_node(kind, schema)
    }

    /// A schema without a non-null `type`: infer the shape from its keywords.
    fn convert_untyped(&mut self, schema: &Schema, pos: Position<'_>) -> IrSchema {
        if schema.properties.is_some() || schema.additional_properties.is_some() {
            debug!(location = %pos.describe(), "Inferred object from properties");
            return self.convert_object(schema, pos);
        }
        if schema.items.is_some() {
            debug!(location = %pos.describe(), "Inferred array from items");
            return self.convert_array(schema, pos);
        }
        if schema.schema_type.as_ref().is_some_and(|t| t.is_only_null()) {
            return self.finish_node(SchemaKind::Null, schema);
        }
        self.finish_node(SchemaKind::Unknown, schema)
    }

    fn convert_union(&mut self, schema: &Schema, members: &[Schema], pos: Position<'_>, union: UnionKind) -> IrSchema {
        let has_null_member = members.iter().any(Schema::is_null_type);
        let mut converted: Vec<IrSchema> = members
            .iter()
            .filter(|m| !m.is_null_type())
            .map(|m| self.convert(m, pos))
            .collect();

        // `anyOf: [T, null]` is a nullable T.
        if has_null_member
            && converted.len() == 1
            && schema.discriminator.is_none()
            && let Some(only) = converted.pop()
        {
            return only.with_nullable(true);
        }

        let kind = match union {
            UnionKind::OneOf => SchemaKind::OneOf { members: converted },
            UnionKind::AnyOf => SchemaKind::AnyOf { members: converted },
        };
        self.finish_node(kind, schema).with_nullable(has_null_member)
    }

    fn convert_enum(&mut self, schema: &Schema, raw: Vec<EnumValue>, pos: Position<'_>) -> IrSchema {
        let has_null = raw.contains(&EnumValue::Null);
        let raw_values: Vec<EnumValue> = raw.into_iter().filter(|v| *v != EnumValue::Null).collect();
        let values = raw_values.iter().map(ToString::to_string).collect();
        let base = enum_base(schema, &raw_values);
        let node = self
            .finish_node(SchemaKind::Enum { values, raw_values, base }, schema)
            .with_nullable(has_null);

        if pos.should_hoist() {
            self.hoist(node, schema, pos)
        } else {
            node
        }
    }

    fn convert_array(&mut self, schema: &Schema, pos: Position<'_>) -> IrSchema {
        let items = match &schema.items {
            Some(items) => self.convert(items, pos.item()),
            None => IrSchema::unknown(),
        };
        self.finish_node(
            SchemaKind::Array {
                items: Box::new(items),
            },
            schema,
        )
    }

    fn convert_object(&mut self, schema: &Schema, pos: Position<'_>) -> IrSchema {
        if pos.should_hoist() {
            self.hoist_object(schema, pos)
        } else {
            self.object_node(schema, pos.parent, pos)
        }
    }

    /// Hoist a nested object. The slot is settled before the children are
    /// named, so a suffixed `X_2` owns `X_2_Field` rather than `X_Field`.
    fn hoist_object(&mut self, schema: &Schema, pos: Position<'_>) -> IrSchema {
        let base = pos.synthetic_name();
        let mut candidate = base.clone();
        let mut suffix = 1;
        loop {
            match self.registered.get(&candidate).copied() {
                Some(index) => {
                    let mark = (self.models.len(), self.diagnostics.len());
                    let node = self.object_node(schema, &candidate, pos);
                    let nullable = node.nullable;
                    let model = IrSchema { nullable: false, ..node };
                    if self.models[index].schema == model {
                        return IrSchema::reference(candidate).with_nullable(nullable);
                    }
                    self.rollback(mark);
                }
                None if self.reserved.contains(&candidate) => {}
                None => break,
            }
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }

        let node = self.object_node(schema, &candidate, pos);
        let nullable = node.nullable;
        let model = IrSchema { nullable: false, ..node };
        if candidate == base {
            debug!(name = %candidate, "Hoisted nested schema");
        } else {
            self.diagnose(
                pos.describe(),
                format!("synthetic name {base} is taken by a different shape, registered as {candidate}"),
            );
        }
        self.push_model(candidate.clone(), model, annotations_of(schema));
        IrSchema::reference(candidate).with_nullable(nullable)
    }

    /// Drop every model and diagnostic recorded after `mark`.
    fn rollback(&mut self, (models, diagnostics): (usize, usize)) {
        for dropped in self.models.drain(models..) {
            self.registered.remove(&dropped.name);
        }
        self.diagnostics.truncate(diagnostics);
    }

    /// The object node itself; nested shapes are named after `owner`.
    fn object_node(&mut self, schema: &Schema, owner: &str, pos: Position<'_>) -> IrSchema {
        let mut properties = Vec::new();
        if let Some(props) = &schema.properties {
            self.convert_fields(props, &schema.required, owner, pos, &mut properties);
        }

        let mut additional_properties = None;
        match &schema.additional_properties {
            Some(AdditionalProperties::Bool(true)) => {
                additional_properties = Some(Box::new(IrSchema::unknown()));
            }
            Some(AdditionalProperties::Schema(extra)) => match &extra.properties {
                // Named extras are folded into the object itself.
                Some(extra_props) if extra.ref_path.is_none() && !extra_props.is_empty() => {
                    self.convert_fields(extra_props, &extra.required, owner, pos, &mut properties);
                }
                _ => {
                    let extra_pos = pos.field(owner, "Properties");
                    additional_properties = Some(Box::new(self.convert(extra, extra_pos)));
                }
            },
            Some(AdditionalProperties::Bool(false)) | None => {}
        }

        self.finish_node(
            SchemaKind::Object {
                properties,
                additional_properties,
            },
            schema,
        )
    }

    /// Convert properties in name order and append the ones not already present.
    fn convert_fields(
        &mut self,
        props: &indexmap::IndexMap<String, Schema>,
        required: &[String],
        owner: &str,
        pos: Position<'_>,
        out: &mut Vec<IrField>,
    ) {
        let required: HashSet<&str> = required.iter().map(String::as_str).collect();
        let mut names: Vec<&String> = props.keys().collect();
        names.sort();

        for name in names {
            if out.iter().any(|f| &f.name == name) {
                continue;
            }
            let Some(prop) = props.get(name) else {
                continue;
            };
            let field_schema = self.convert(prop, pos.field(owner, name));
            out.push(IrField {
                name: name.clone(),
                schema: field_schema,
                required: required.contains(name.as_str()),
                annotations: annotations_of(prop),
            });
        }
    }

    /// Register an enum `node` under its synthetic name and return a `Ref`.
    fn hoist(&mut self, node: IrSchema, schema: &Schema, pos: Position<'_>) -> IrSchema {
        let nullable = node.nullable;
        let model = IrSchema {
            nullable: false,
            ..node
        };
        let name = self.register(pos.synthetic_name(), model, annotations_of(schema), &pos);
        IrSchema::reference(name).with_nullable(nullable)
    }

    /// Register a synthetic model. A structurally equal registration under the
    /// same name is reused; otherwise `_2`, `_3`, ... is appended until a free
    /// or equal slot is found.
    fn register(&mut self, base: String, schema: IrSchema, annotations: Annotations, pos: &Position<'_>) -> String {
        let mut candidate = base.clone();
        let mut suffix = 1;
        loop {
            match self.registered.get(&candidate) {
                Some(&index) if self.models[index].schema == schema => return candidate,
                Some(_) => {}
                None if !self.reserved.contains(&candidate) => break,
                None => {}
            }
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }

        if candidate != base {
            self.diagnose(
                pos.describe(),
                format!("synthetic name {base} is taken by a different shape, registered as {candidate}"),
            );
        } else {
            debug!(name = %candidate, "Hoisted nested schema");
        }

        self.push_model(candidate.clone(), schema, annotations);
        candidate
    }

    fn push_model(&mut self, name: String, schema: IrSchema, annotations: Annotations) {
        self.registered.insert(name.clone(), self.models.len());
        self.models.push(IrModelDef {
            name,
            schema,
            annotations,
        });
    }

    /// Attach the node-level attributes every kind carries.
    fn finish_node(&self, kind: SchemaKind, schema: &Schema) -> IrSchema {
        IrSchema {
            kind,
            nullable: schema.is_nullable(),
            format: schema.format.clone(),
            discriminator: schema.discriminator.as_ref().map(|d| IrDiscriminator {
                property_name: d.property_name.clone(),
                mapping: d
                    .mapping
                    .iter()
                    .map(|(value, target)| (value.clone(), ref_name(target).to_string()))
                    .collect(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum UnionKind {
    OneOf,
    AnyOf,
}

/// `enum` literals, or a `const` as a single-value enum.
fn enum_literals(schema: &Schema) -> Option<Vec<EnumValue>> {
    if let Some(values) = &schema.enum_values
        && !values.is_empty()
    {
        return Some(values.clone());
    }
    schema
        .const_value
        .as_ref()
        .map(|v| vec![EnumValue::from_json(v)])
}

/// Explicit type first, else the first literal's native type.
fn enum_base(schema: &Schema, values: &[EnumValue]) -> EnumBase {
    let declared = schema
        .schema_type
        .as_ref()
        .and_then(|t| t.non_null().first().copied());
    match declared {
        Some("string") => return EnumBase::String,
        Some("integer") => return EnumBase::Integer,
        Some("number") => return EnumBase::Number,
        Some("boolean") => return EnumBase::Boolean,
        _ => {}
    }
    match values.first() {
        Some(EnumValue::Integer(_)) => EnumBase::Integer,
        Some(EnumValue::Float(_)) => EnumBase::Number,
        Some(EnumValue::Bool(_)) => EnumBase::Boolean,
        Some(EnumValue::String(_) | EnumValue::Null | EnumValue::Other(_)) | None => EnumBase::String,
    }
}

pub(crate) fn annotations_of(schema: &Schema) -> Annotations {
    Annotations {
        title: schema.title.clone(),
        description: schema.description.clone(),
        deprecated: schema.deprecated,
        read_only: schema.read_only,
        write_only: schema.write_only,
        default: schema.default.clone(),
        examples: schema.collected_examples(),
    }
}
