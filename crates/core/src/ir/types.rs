//! Schema-level IR: type nodes, fields and model definitions.
//!
//! The IR is language-agnostic. It is serialised (camelCase) by the built-in
//! JSON emitter, never deserialised.

use crate::openapi::EnumValue;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One type node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrSchema {
    /// The shape.
    #[serde(flatten)]
    pub kind: SchemaKind,
    /// Also admits `null`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// `format` as declared, e.g. `uuid` or `binary`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Discriminator of a polymorphic node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<IrDiscriminator>,
}

/// The closed set of shapes a type node can take.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaKind {
    /// No usable type information.
    Unknown,
    /// Text.
    String,
    /// Any number.
    Number,
    /// Whole number.
    Integer,
    /// `true` or `false`.
    Boolean,
    /// Only `null`.
    Null,
    /// A list.
    Array {
        /// Element type.
        items: Box<IrSchema>,
    },
    /// An anonymous object; hoisted unless it is a model's own shape or inline.
    #[serde(rename_all = "camelCase")]
    Object {
        /// Properties sorted by name.
        properties: Vec<IrField>,
        /// Type of extra keys, when they are allowed.
        #[serde(skip_serializing_if = "Option::is_none")]
        additional_properties: Option<Box<IrSchema>>,
    },
    /// A closed set of literals.
    #[serde(rename_all = "camelCase")]
    Enum {
        /// Literals as strings, `null` excluded.
        values: Vec<String>,
        /// Literals as declared, `null` excluded.
        raw_values: Vec<EnumValue>,
        /// Scalar kind of the literals.
        base: EnumBase,
    },
    /// A reference to a registered model.
    Ref {
        /// Model name.
        name: String,
    },
    /// Exactly one of `members`.
    OneOf {
        /// Alternatives, in declaration order.
        members: Vec<IrSchema>,
    },
    /// At least one of `members`.
    AnyOf {
        /// Alternatives, in declaration order.
        members: Vec<IrSchema>,
    },
    /// All of `members`.
    AllOf {
        /// Parts, in declaration order.
        members: Vec<IrSchema>,
    },
    /// Anything but `inner`.
    Not {
        /// The excluded type.
        inner: Box<IrSchema>,
    },
}

/// Scalar kind an enum's literals belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnumBase {
    /// String literals.
    String,
    /// Number literals.
    Number,
    /// Integer literals.
    Integer,
    /// Boolean literals.
    Boolean,
}

/// Discriminator of a `oneOf`/`anyOf` node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrDiscriminator {
    /// Property holding the discriminating value.
    pub property_name: String,
    /// Discriminator value -> model name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
}

/// Documentation and access metadata carried to generated code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotations {
    /// Short title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marked deprecated.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Sent by the server only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    /// Sent by the client only.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
    /// Default value as declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// `example` followed by `examples`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
}

/// A named property of an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrField {
    /// Property name as declared.
    pub name: String,
    /// Property type.
    #[serde(rename = "type")]
    pub schema: IrSchema,
    /// Listed in `required`.
    pub required: bool,
    /// Property metadata.
    #[serde(flatten)]
    pub annotations: Annotations,
}

/// A top-level named model: a component schema or a hoisted nested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrModelDef {
    /// Unique model name.
    pub name: String,
    /// The model's shape.
    pub schema: IrSchema,
    /// Model metadata.
    #[serde(flatten)]
    pub annotations: Annotations,
}

impl IrSchema {
    /// A plain node of `kind`.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            nullable: false,
            format: None,
            discriminator: None,
        }
    }

    /// A node with no usable type information.
    pub fn unknown() -> Self {
        Self::new(SchemaKind::Unknown)
    }

    /// A `Ref` to the model `name`.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref { name: name.into() })
    }

    /// Mark nullable when `nullable`; never clears it.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = self.nullable || nullable;
        self
    }

    /// True for [`SchemaKind::Enum`].
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, SchemaKind::Enum { .. })
    }

    /// Model name when this node is a `Ref`.
    pub fn ref_name(&self) -> Option<&str> {
        match &self.kind {
            SchemaKind::Ref { name } => Some(name),
            _ => None,
        }
    }

    /// Names referenced directly or anywhere below this node, including
    /// discriminator mapping targets. Duplicates are kept.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(discriminator) = &self.discriminator {
            out.extend(discriminator.mapping.values().map(String::as_str));
        }
        match &self.kind {
            SchemaKind::Ref { name } => out.push(name),
            SchemaKind::Array { items } => items.collect_refs(out),
            SchemaKind::Object {
                properties,
                additional_properties,
            } => {
                for field in properties {
                    field.schema.collect_refs(out);
                }
                if let Some(extra) = additional_properties {
                    extra.collect_refs(out);
                }
            }
            SchemaKind::OneOf { members } | SchemaKind::AnyOf { members } | SchemaKind::AllOf { members } => {
                for member in members {
                    member.collect_refs(out);
                }
            }
            SchemaKind::Not { inner } => inner.collect_refs(out),
            SchemaKind::Unknown
            | SchemaKind::String
            | SchemaKind::Number
            | SchemaKind::Integer
            | SchemaKind::Boolean
            | SchemaKind::Null
            | SchemaKind::Enum { .. } => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_refs_walks_every_edge() {
        let mut union = IrSchema::new(SchemaKind::OneOf {
            members: vec![IrSchema::reference("Cat"), IrSchema::reference("Dog")],
        });
        union.discriminator = Some(IrDiscriminator {
            property_name: "kind".into(),
            mapping: BTreeMap::from([("bird".to_string(), "Bird".to_string())]),
        });
        let schema = IrSchema::new(SchemaKind::Object {
            properties: vec![IrField {
                name: "pets".into(),
                schema: IrSchema::new(SchemaKind::Array {
                    items: Box::new(union),
                }),
                required: true,
                annotations: Annotations::default(),
            }],
            additional_properties: Some(Box::new(IrSchema::reference("Extra"))),
        });

        let mut refs = Vec::new();
        schema.collect_refs(&mut refs);
        assert_eq!(refs, vec!["Bird", "Cat", "Dog", "Extra"]);
    }

    #[test]
    fn test_serialize_shape() {
        let schema = IrSchema::reference("User").with_nullable(true);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "ref", "name": "User", "nullable": true })
        );

        let plain = serde_json::to_value(IrSchema::new(SchemaKind::String)).unwrap();
        assert_eq!(plain, serde_json::json!({ "kind": "string" }));
    }
}
