//! OpenAPI document structs for serde deserialization.
//!
//! Only the subset of OpenAPI 3.0 / 3.1 the compiler reads is modelled.
//! Validation keywords (`pattern`, `minimum`, ...) are accepted and ignored.
//! Maps whose declaration order matters (properties, media types, response
//! codes) use [`IndexMap`]; maps that are always walked by name use
//! [`BTreeMap`].

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Root OpenAPI document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiSpec {
    /// Declared OpenAPI version.
    #[serde(default)]
    pub openapi: Option<String>,
    /// Title and version.
    #[serde(default)]
    pub info: Info,
    /// Path templates and their operations.
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
    /// Reusable definitions.
    pub components: Option<Components>,
}

/// Document metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
}

/// Reusable definitions referenced by `$ref`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Named schemas; each becomes a model.
    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
    /// Named parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, Parameter>,
    /// Named request bodies.
    #[serde(default)]
    pub request_bodies: BTreeMap<String, RequestBody>,
    /// Named responses.
    #[serde(default)]
    pub responses: BTreeMap<String, Response>,
    /// Named security schemes.
    #[serde(default)]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

/// Either an inline object or a `$ref` into a component section.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// A reference.
    Ref {
        /// The `$ref` string.
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    /// The object itself.
    Item(T),
}

/// HTTP methods an operation can live under, in collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `HEAD`
    Head,
    /// `TRACE`
    Trace,
}

impl HttpMethod {
    /// Every method, in collection order.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Trace,
    ];

    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    /// `get` operation.
    pub get: Option<Operation>,
    /// `put` operation.
    pub put: Option<Operation>,
    /// `post` operation.
    pub post: Option<Operation>,
    /// `delete` operation.
    pub delete: Option<Operation>,
    /// `options` operation.
    pub options: Option<Operation>,
    /// `head` operation.
    pub head: Option<Operation>,
    /// `patch` operation.
    pub patch: Option<Operation>,
    /// `trace` operation.
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    /// Declared operations in [`HttpMethod::ALL`] order.
    pub fn operations(&self) -> Vec<(HttpMethod, &Operation)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(|method| self.operation(method).map(|op| (method, op)))
            .collect()
    }

    /// The operation declared under `method`.
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// `operationId`.
    pub operation_id: Option<String>,
    /// Tags in declaration order; the first one groups the operation.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Short summary.
    pub summary: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Marked deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// Operation-level parameters; they override path-level ones.
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    /// Request body, inline or referenced.
    pub request_body: Option<RefOr<RequestBody>>,
    /// Responses by status code, in declaration order.
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
}

/// A parameter (path, query, header or cookie).
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// `path`, `query`, `header` or `cookie`.
    #[serde(rename = "in")]
    pub location: String,
    /// Declared `required`.
    #[serde(default)]
    pub required: bool,
    /// Parameter description.
    pub description: Option<String>,
    /// Parameter type.
    pub schema: Option<Schema>,
}

/// A request body definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    /// Declared `required`.
    #[serde(default)]
    pub required: bool,
    /// Body description.
    pub description: Option<String>,
    /// Media types, in declaration order.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response definition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    /// Response description.
    pub description: Option<String>,
    /// Media types, in declaration order.
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    /// Payload schema.
    pub schema: Option<Schema>,
}

/// A security scheme definition.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    /// `http`, `apiKey`, `oauth2` or `openIdConnect`.
    #[serde(rename = "type", default)]
    pub scheme_type: String,
    /// HTTP auth scheme.
    pub scheme: Option<String>,
    /// Bearer token format hint.
    pub bearer_format: Option<String>,
    /// Where an API key is sent.
    #[serde(rename = "in")]
    pub location: Option<String>,
    /// API key name.
    pub name: Option<String>,
    /// Scheme description.
    pub description: Option<String>,
}

/// JSON Schema definition used in OpenAPI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The declared type; 3.1 allows an array such as `["string", "null"]`.
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    /// `$ref`; when present every other keyword is ignored.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    /// Object properties.
    pub properties: Option<IndexMap<String, Schema>>,

    /// Required property names.
    #[serde(default)]
    pub required: Vec<String>,

    /// Array element schema.
    pub items: Option<Box<Schema>>,

    /// `enum` literals.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<EnumValue>>,

    /// `const`, treated as a one-value enum.
    #[serde(rename = "const")]
    pub const_value: Option<Value>,

    /// `anyOf` members.
    pub any_of: Option<Vec<Schema>>,
    /// `oneOf` members.
    pub one_of: Option<Vec<Schema>>,
    /// `allOf` members.
    pub all_of: Option<Vec<Schema>>,
    /// `not` schema.
    pub not: Option<Box<Schema>>,

    /// `additionalProperties`.
    pub additional_properties: Option<AdditionalProperties>,

    /// Discriminator of a polymorphic schema.
    pub discriminator: Option<Discriminator>,

    /// Format hint (e.g., date-time, uuid, binary).
    pub format: Option<String>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead).
    pub nullable: Option<bool>,

    // annotations
    /// Short title.
    pub title: Option<String>,
    /// Long description.
    pub description: Option<String>,
    /// Marked deprecated.
    #[serde(default)]
    pub deprecated: bool,
    /// Sent by the server only.
    #[serde(default)]
    pub read_only: bool,
    /// Sent by the client only.
    #[serde(default)]
    pub write_only: bool,
    /// Default value.
    pub default: Option<Value>,
    /// 3.0 single example.
    pub example: Option<Value>,
    /// 3.1 example list.
    pub examples: Option<Value>,
}

/// A single `enum` or `const` literal.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum EnumValue {
    /// A string literal.
    String(String),
    /// An integer that fits in `i64`.
    Integer(i64),
    /// Any other number.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// The `null` literal.
    Null,
    /// An array or object literal, kept as written.
    Other(Value),
}

impl EnumValue {
    /// Convert a `const` value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => EnumValue::String(s.clone()),
            Value::Bool(b) => EnumValue::Bool(*b),
            Value::Null => EnumValue::Null,
            Value::Number(n) => n
                .as_i64()
                .map(EnumValue::Integer)
                .or_else(|| n.as_f64().map(EnumValue::Float))
                .unwrap_or_else(|| EnumValue::Other(value.clone())),
            Value::Array(_) | Value::Object(_) => EnumValue::Other(value.clone()),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::String(s) => f.write_str(s),
            EnumValue::Integer(i) => write!(f, "{i}"),
            EnumValue::Float(x) => write!(f, "{x}"),
            EnumValue::Bool(b) => write!(f, "{b}"),
            EnumValue::Null => f.write_str("null"),
            EnumValue::Other(value) => write!(f, "{value}"),
        }
    }
}

/// Discriminator for polymorphic schemas (oneOf/anyOf).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// Property holding the discriminating value.
    pub property_name: String,
    /// Discriminator value -> `$ref` of the selected schema.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

/// Schema type can be a single type or an array of types.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    /// `"type": "string"`
    Single(String),
    /// `"type": ["string", "null"]`
    Multiple(Vec<String>),
}

impl SchemaType {
    /// Declared type names, excluding `"null"`.
    pub fn non_null(&self) -> Vec<&str> {
        match self {
            SchemaType::Single(t) if t == "null" => Vec::new(),
            SchemaType::Single(t) => vec![t.as_str()],
            SchemaType::Multiple(ts) => ts.iter().map(String::as_str).filter(|t| *t != "null").collect(),
        }
    }

    /// True when `null` is the only declared type.
    pub fn is_only_null(&self) -> bool {
        match self {
            SchemaType::Single(t) => t == "null",
            SchemaType::Multiple(ts) => !ts.is_empty() && ts.iter().all(|t| t == "null"),
        }
    }
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` allows any extra key, `false` none.
    Bool(bool),
    /// Extra keys map to values of this schema.
    Schema(Box<Schema>),
}

impl Schema {
    /// 3.0 `nullable: true` or a 3.1 type array containing `"null"`.
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        matches!(&self.schema_type, Some(SchemaType::Multiple(types)) if types.iter().any(|t| t == "null"))
    }

    /// A bare `{ "type": "null" }` member, as used in `anyOf: [X, null]`.
    pub fn is_null_type(&self) -> bool {
        self.ref_path.is_none()
            && self.schema_type.as_ref().is_some_and(SchemaType::is_only_null)
    }

    /// Examples from either the 3.0 `example` or the 3.1 `examples` keyword.
    pub fn collected_examples(&self) -> Vec<Value> {
        let mut out = Vec::new();
        if let Some(example) = &self.example {
            out.push(example.clone());
        }
        match &self.examples {
            Some(Value::Array(items)) => out.extend(items.iter().cloned()),
            Some(other) => out.push(other.clone()),
            None => {}
        }
        out
    }
}

/// Final path segment of a `$ref` (`#/components/schemas/User` -> `User`).
pub fn ref_name(ref_path: &str) -> &str {
    ref_path.rsplit('/').next().unwrap_or(ref_path)
}
