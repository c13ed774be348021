//! Per-target projection of IR type nodes into abstract type expressions.
//!
//! [`TypeProjector::project`] decides *what* a type becomes in a target's
//! vocabulary; [`TypeExpr::render`] spells it as a type reference. When a
//! target cannot express a shape the result is an explicit
//! [`TypeExpr::Approximated`] node, never a silent drop.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::openapi::EnumValue;

use super::types::{EnumBase, IrSchema, SchemaKind};

/// Output ecosystem whose type vocabulary a projection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// `typescript` and `typescript-types` clients.
    TypeScript,
    /// `go` clients.
    Go,
    /// `python` clients.
    Python,
}

impl FromStr for Target {
    type Err = Error;

    /// Accepts the client `type` identifiers of the configuration file.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "typescript" | "typescript-types" => Ok(Target::TypeScript),
            "go" => Ok(Target::Go),
            "python" => Ok(Target::Python),
            other => Err(Error::UnsupportedTarget(other.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::TypeScript => "typescript",
            Target::Go => "go",
            Target::Python => "python",
        })
    }
}

/// What a target's type system can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Union types.
    pub unions: bool,
    /// Intersection types.
    pub intersections: bool,
    /// Anonymous object types.
    pub inline_records: bool,
    literal_bases: &'static [EnumBase],
}

impl Capabilities {
    /// Whether enums of `base` can be spelled as literal types.
    pub fn literals(&self, base: EnumBase) -> bool {
        self.literal_bases.contains(&base)
    }
}

impl Target {
    /// Every target, in a fixed order.
    pub const ALL: [Target; 3] = [Target::TypeScript, Target::Go, Target::Python];

    /// What this target's type system can express.
    pub fn capabilities(self) -> Capabilities {
        match self {
            Target::TypeScript => Capabilities {
                unions: true,
                intersections: true,
                inline_records: true,
                literal_bases: &[EnumBase::String, EnumBase::Number, EnumBase::Integer, EnumBase::Boolean],
            },
            Target::Go => Capabilities {
                unions: false,
                intersections: false,
                inline_records: false,
                literal_bases: &[],
            },
            Target::Python => Capabilities {
                unions: true,
                intersections: false,
                inline_records: false,
                literal_bases: &[EnumBase::String, EnumBase::Integer, EnumBase::Boolean],
            },
        }
    }
}

/// Primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Scalar {
    /// Text.
    String,
    /// Whole number.
    Integer,
    /// Any number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Binary payload (`format: binary`).
    Bytes,
    /// The `null` type.
    Null,
    /// The target's top type.
    Any,
}

/// A literal value inside a [`TypeExpr::Literals`] union.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    /// A string literal.
    String(String),
    /// An integer literal.
    Integer(i64),
    /// A number literal.
    Number(f64),
    /// `true` or `false`.
    Boolean(bool),
}

/// Why a projection is not exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Approximation {
    /// A union the target cannot express became its top type.
    UntypedUnion,
    /// An intersection the target cannot express became its first member.
    FirstAllOfMember,
    /// An inline object the target cannot express became an untyped map.
    UntypedRecord,
}

/// A field of an inline record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordField {
    /// Property name as declared.
    pub name: String,
    /// Field type.
    pub expr: TypeExpr,
    /// Whether the property must be present.
    pub required: bool,
}

/// Target-independent type expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeExpr {
    /// A primitive.
    Scalar {
        /// Which primitive.
        scalar: Scalar,
    },
    /// A list.
    Sequence {
        /// Element type.
        items: Box<TypeExpr>,
    },
    /// String-keyed map.
    Map {
        /// Value type.
        values: Box<TypeExpr>,
    },
    /// A registered model.
    Named {
        /// Model name as registered in the IR.
        name: String,
    },
    /// Any one of `members`.
    Union {
        /// Alternatives, in declaration order.
        members: Vec<TypeExpr>,
    },
    /// All of `members` at once.
    Intersection {
        /// Parts, in declaration order.
        members: Vec<TypeExpr>,
    },
    /// A union of literal values.
    Literals {
        /// The admitted values.
        values: Vec<Literal>,
    },
    /// An inline object type.
    Record {
        /// Declared properties.
        fields: Vec<RecordField>,
        /// Type of additional properties, if allowed.
        extra: Option<Box<TypeExpr>>,
    },
    /// `inner` or null.
    Nullable {
        /// The non-null type.
        inner: Box<TypeExpr>,
    },
    /// A lossy stand-in for a shape the target cannot express.
    Approximated {
        /// What is emitted instead.
        expr: Box<TypeExpr>,
        /// What was lost.
        approximation: Approximation,
    },
}

impl TypeExpr {
    /// Shorthand for [`TypeExpr::Scalar`].
    pub fn scalar(scalar: Scalar) -> Self {
        TypeExpr::Scalar { scalar }
    }

    fn any() -> Self {
        Self::scalar(Scalar::Any)
    }

    fn approximated(expr: TypeExpr, approximation: Approximation) -> Self {
        TypeExpr::Approximated {
            expr: Box::new(expr),
            approximation,
        }
    }

    /// True when the expression already admits `null`.
    pub fn admits_null(&self) -> bool {
        match self {
            TypeExpr::Scalar { scalar: Scalar::Null } | TypeExpr::Nullable { .. } => true,
            TypeExpr::Approximated { expr, .. } => expr.admits_null(),
            _ => false,
        }
    }

    /// Wrap in the nullable wrapper unless that would double-wrap.
    pub fn nullable(self) -> Self {
        if self.admits_null() {
            self
        } else {
            TypeExpr::Nullable { inner: Box::new(self) }
        }
    }
}

/// Maps IR type nodes to [`TypeExpr`] for one target.
#[derive(Debug, Clone)]
pub struct TypeProjector {
    target: Target,
    known_models: Option<HashSet<String>>,
}

impl TypeProjector {
    /// A projector that trusts every model reference.
    pub fn new(target: Target) -> Self {
        Self {
            target,
            known_models: None,
        }
    }

    /// References outside `names` degrade to the any type.
    pub fn with_known_models<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.known_models = Some(names.into_iter().collect());
        self
    }

    /// The target this projector spells types for.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Project one type node, nullability included.
    pub fn project(&self, schema: &IrSchema) -> TypeExpr {
        let expr = self.project_kind(schema);
        if schema.nullable { expr.nullable() } else { expr }
    }

    fn project_kind(&self, schema: &IrSchema) -> TypeExpr {
        let caps = self.target.capabilities();
        match &schema.kind {
            SchemaKind::Unknown | SchemaKind::Not { .. } => TypeExpr::any(),
            SchemaKind::String if schema.format.as_deref() == Some("binary") => TypeExpr::scalar(Scalar::Bytes),
            SchemaKind::String => TypeExpr::scalar(Scalar::String),
            SchemaKind::Number => TypeExpr::scalar(Scalar::Number),
            SchemaKind::Integer => TypeExpr::scalar(Scalar::Integer),
            SchemaKind::Boolean => TypeExpr::scalar(Scalar::Boolean),
            SchemaKind::Null => TypeExpr::scalar(Scalar::Null),
            SchemaKind::Array { items } => TypeExpr::Sequence {
                items: Box::new(self.project(items)),
            },
            SchemaKind::Ref { name } => match &self.known_models {
                Some(known) if !known.contains(name) => {
                    warn!(target_lang = %self.target, model = %name, "Unresolved model reference projected as any");
                    TypeExpr::any()
                }
                _ => TypeExpr::Named { name: name.clone() },
            },
            SchemaKind::OneOf { members } | SchemaKind::AnyOf { members } => {
                if caps.unions {
                    TypeExpr::Union {
                        members: members.iter().map(|m| self.project(m)).collect(),
                    }
                } else {
                    TypeExpr::approximated(TypeExpr::any(), Approximation::UntypedUnion)
                }
            }
            SchemaKind::AllOf { members } => {
                if caps.intersections {
                    TypeExpr::Intersection {
                        members: members.iter().map(|m| self.project(m)).collect(),
                    }
                } else {
                    let first = members.first().map_or_else(TypeExpr::any, |m| self.project(m));
                    TypeExpr::approximated(first, Approximation::FirstAllOfMember)
                }
            }
            SchemaKind::Enum {
                values,
                raw_values,
                base,
            } => {
                if values.is_empty() {
                    TypeExpr::any()
                } else if caps.literals(*base) {
                    TypeExpr::Literals {
                        values: literals(values, raw_values, *base),
                    }
                } else {
                    TypeExpr::scalar(base_scalar(*base))
                }
            }
            SchemaKind::Object {
                properties,
                additional_properties,
            } => {
                let extra = additional_properties.as_ref().map(|e| Box::new(self.project(e)));
                if properties.is_empty() {
                    TypeExpr::Map {
                        values: extra.unwrap_or_else(|| Box::new(TypeExpr::any())),
                    }
                } else if caps.inline_records {
                    TypeExpr::Record {
                        fields: properties
                            .iter()
                            .map(|f| RecordField {
                                name: f.name.clone(),
                                expr: self.project(&f.schema),
                                required: f.required,
                            })
                            .collect(),
                        extra,
                    }
                } else {
                    let map = TypeExpr::Map {
                        values: Box::new(TypeExpr::any()),
                    };
                    TypeExpr::approximated(map, Approximation::UntypedRecord)
                }
            }
        }
    }
}

fn base_scalar(base: EnumBase) -> Scalar {
    match base {
        EnumBase::String => Scalar::String,
        EnumBase::Number => Scalar::Number,
        EnumBase::Integer => Scalar::Integer,
        EnumBase::Boolean => Scalar::Boolean,
    }
}

/// Literal values from the raw enum literals, falling back to the
/// stringified values.
fn literals(values: &[String], raw: &[EnumValue], base: EnumBase) -> Vec<Literal> {
    if raw.is_empty() {
        return values
            .iter()
            .map(|v| match base {
                EnumBase::Integer => v.parse().map_or_else(|_| Literal::String(v.clone()), Literal::Integer),
                EnumBase::Number => v.parse().map_or_else(|_| Literal::String(v.clone()), Literal::Number),
                EnumBase::Boolean => v.parse().map_or_else(|_| Literal::String(v.clone()), Literal::Boolean),
                EnumBase::String => Literal::String(v.clone()),
            })
            .collect();
    }
    raw.iter()
        .filter_map(|v| match v {
            EnumValue::String(s) => Some(Literal::String(s.clone())),
            EnumValue::Integer(i) => Some(Literal::Integer(*i)),
            EnumValue::Float(x) => Some(Literal::Number(*x)),
            EnumValue::Bool(b) => Some(Literal::Boolean(*b)),
            EnumValue::Other(value) => Some(Literal::String(value.to_string())),
            EnumValue::Null => None,
        })
        .collect()
}

impl TypeExpr {
    /// Spell the expression as a type reference in `target`'s syntax. Model
    /// names are qualified the way generated code imports them.
    pub fn render(&self, target: Target) -> String {
        match target {
            Target::TypeScript => self.render_ts(),
            Target::Go => self.render_go(),
            Target::Python => self.render_py(),
        }
    }

    fn render_ts(&self) -> String {
        match self {
            TypeExpr::Scalar { scalar } => match scalar {
                Scalar::String => "string",
                Scalar::Integer | Scalar::Number => "number",
                Scalar::Boolean => "boolean",
                Scalar::Bytes => "Blob",
                Scalar::Null => "null",
                Scalar::Any => "unknown",
            }
            .to_string(),
            TypeExpr::Sequence { items } => format!("Array<{}>", items.render_ts()),
            TypeExpr::Map { values } => format!("Record<string, {}>", values.render_ts()),
            TypeExpr::Named { name } => format!("Schema.{name}"),
            TypeExpr::Union { members } => join(members, " | ", |m| m.render_ts()),
            TypeExpr::Intersection { members } => join(members, " & ", |m| match m {
                TypeExpr::Union { .. } | TypeExpr::Nullable { .. } => format!("({})", m.render_ts()),
                _ => m.render_ts(),
            }),
            TypeExpr::Literals { values } => join(values, " | ", |v| match v {
                Literal::String(s) => quote(s),
                Literal::Integer(i) => i.to_string(),
                Literal::Number(x) => x.to_string(),
                Literal::Boolean(b) => b.to_string(),
            }),
            TypeExpr::Record { fields, extra } => {
                let mut parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        let key = if is_identifier(&f.name) { f.name.clone() } else { quote(&f.name) };
                        let opt = if f.required { "" } else { "?" };
                        format!("{key}{opt}: {}", f.expr.render_ts())
                    })
                    .collect();
                if let Some(extra) = extra {
                    parts.push(format!("[key: string]: {}", extra.render_ts()));
                }
                format!("{{ {} }}", parts.join("; "))
            }
            TypeExpr::Nullable { inner } => match inner.as_ref() {
                TypeExpr::Intersection { .. } => format!("({}) | null", inner.render_ts()),
                _ => format!("{} | null", inner.render_ts()),
            },
            TypeExpr::Approximated { expr, .. } => expr.render_ts(),
        }
    }

    fn render_go(&self) -> String {
        match self {
            TypeExpr::Scalar { scalar } => match scalar {
                Scalar::String => "string",
                Scalar::Integer => "int64",
                Scalar::Number => "float64",
                Scalar::Boolean => "bool",
                Scalar::Bytes => "[]byte",
                Scalar::Null | Scalar::Any => "interface{}",
            }
            .to_string(),
            TypeExpr::Sequence { items } => format!("[]{}", items.render_go()),
            TypeExpr::Map { values } => format!("map[string]{}", values.render_go()),
            TypeExpr::Named { name } => go_identifier(name),
            TypeExpr::Union { .. } | TypeExpr::Intersection { .. } => "interface{}".to_string(),
            TypeExpr::Literals { values } => match values.first() {
                Some(Literal::Integer(_)) => "int64",
                Some(Literal::Number(_)) => "float64",
                Some(Literal::Boolean(_)) => "bool",
                Some(Literal::String(_)) | None => "string",
            }
            .to_string(),
            TypeExpr::Record { .. } => "map[string]interface{}".to_string(),
            TypeExpr::Nullable { inner } => {
                let inner = inner.render_go();
                if inner == "interface{}" { inner } else { format!("*{inner}") }
            }
            TypeExpr::Approximated { expr, .. } => expr.render_go(),
        }
    }

    fn render_py(&self) -> String {
        match self {
            TypeExpr::Scalar { scalar } => match scalar {
                Scalar::String => "str",
                Scalar::Integer => "int",
                Scalar::Number => "float",
                Scalar::Boolean => "bool",
                Scalar::Bytes => "bytes",
                Scalar::Null => "None",
                Scalar::Any => "Any",
            }
            .to_string(),
            TypeExpr::Sequence { items } => format!("List[{}]", items.render_py()),
            TypeExpr::Map { values } => format!("Dict[str, {}]", values.render_py()),
            TypeExpr::Named { name } => format!("models.{name}"),
            TypeExpr::Union { members } => format!("Union[{}]", join(members, ", ", |m| m.render_py())),
            TypeExpr::Intersection { .. } | TypeExpr::Record { .. } => "Dict[str, Any]".to_string(),
            TypeExpr::Literals { values } => {
                let parts = join(values, ", ", |v| match v {
                    Literal::String(s) => quote(s),
                    Literal::Integer(i) => i.to_string(),
                    Literal::Number(x) => x.to_string(),
                    Literal::Boolean(true) => "True".to_string(),
                    Literal::Boolean(false) => "False".to_string(),
                });
                format!("Literal[{parts}]")
            }
            TypeExpr::Nullable { inner } => format!("Optional[{}]", inner.render_py()),
            TypeExpr::Approximated { expr, .. } => expr.render_py(),
        }
    }
}

fn join<T>(items: &[T], sep: &str, f: impl Fn(&T) -> String) -> String {
    items.iter().map(f).collect::<Vec<_>>().join(sep)
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Model names keep their spelling in Go. Only what Go cannot accept changes:
/// the first letter is upper-cased so the type is exported, other characters
/// become `_`, and a name that cannot start an exported identifier gets `T`.
fn go_identifier(name: &str) -> String {
    let body: String = name
        .chars()
        .map(|c| if c == '_' || c.is_alphabetic() || c.is_ascii_digit() { c } else { '_' })
        .collect();
    let mut chars = body.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            let upper: String = first.to_uppercase().collect();
            if upper.chars().all(char::is_uppercase) {
                upper + chars.as_str()
            } else {
                format!("T{body}")
            }
        }
        _ => format!("T{body}"),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
