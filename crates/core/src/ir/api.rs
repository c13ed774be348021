//! Operation-level IR: services, operations, parameters, bodies.

use super::types::{IrModelDef, IrSchema};
use crate::openapi::HttpMethod;
use serde::Serialize;

/// Fallback grouping tag for operations that declare none.
pub const MISC_TAG: &str = "misc";

/// The complete IR of one document, or a derived subset of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ir {
    /// Services sorted by tag.
    pub services: Vec<IrService>,
    /// Model registry; a model always follows the models it references.
    pub model_defs: Vec<IrModelDef>,
    /// Declared security schemes, sorted by key.
    pub security_schemes: Vec<IrSecurityScheme>,
}

/// Operations grouped under one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrService {
    /// Grouping tag.
    pub tag: String,
    /// Operations sorted by path, then method.
    pub operations: Vec<IrOperation>,
}

/// One HTTP operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrOperation {
    /// `operationId` as declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template, e.g. `/users/{id}`.
    pub path: String,
    /// The single grouping tag.
    pub tag: String,
    /// Every declared tag; filtering looks at these.
    pub original_tags: Vec<String>,
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Marked deprecated.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Sorted by name.
    pub path_params: Vec<IrParam>,
    /// Path parameter names in template order.
    pub path_param_order: Vec<String>,
    /// Sorted by name.
    pub query_params: Vec<IrParam>,
    /// Selected request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<IrRequestBody>,
    /// Selected success response.
    pub response: IrResponse,
}

impl IrOperation {
    /// Path parameters in the order they appear in the path template.
    /// Parameters missing from the template follow, sorted by name.
    pub fn path_params_in_order(&self) -> Vec<&IrParam> {
        let mut ordered: Vec<&IrParam> = self
            .path_param_order
            .iter()
            .filter_map(|name| self.path_params.iter().find(|p| &p.name == name))
            .collect();
        for param in &self.path_params {
            if !self.path_param_order.contains(&param.name) {
                ordered.push(param);
            }
        }
        ordered
    }

    /// Tags the filter evaluates: the declared tags, or the fallback tag.
    pub fn effective_tags(&self) -> Vec<&str> {
        if self.original_tags.is_empty() {
            vec![MISC_TAG]
        } else {
            self.original_tags.iter().map(String::as_str).collect()
        }
    }

    /// Every type node the operation uses.
    pub fn schemas(&self) -> Vec<&IrSchema> {
        let mut out: Vec<&IrSchema> = self
            .path_params
            .iter()
            .chain(&self.query_params)
            .map(|p| &p.schema)
            .collect();
        if let Some(body) = &self.request_body {
            out.push(&body.schema);
        }
        if let ResponseBody::Schema(schema) = &self.response.body {
            out.push(schema);
        }
        out
    }
}

/// A path or query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrParam {
    /// Name as declared.
    pub name: String,
    /// Path parameters are always required.
    pub required: bool,
    /// Parameter type, never hoisted.
    pub schema: IrSchema,
    /// Parameter description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The request body for the preferred media type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRequestBody {
    /// Selected media type.
    pub content_type: String,
    /// Body type, never hoisted.
    pub schema: IrSchema,
    /// Whether the body must be sent.
    pub required: bool,
}

/// The success response of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrResponse {
    /// Selected status code; absent for [`ResponseBody::Unknown`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Selected media type, when the status has content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// What the call returns.
    pub body: ResponseBody,
    /// Response description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl IrResponse {
    /// Marker for operations without any usable success response.
    pub fn unknown() -> Self {
        Self {
            status: None,
            content_type: None,
            body: ResponseBody::Unknown,
            description: None,
        }
    }
}

/// What a successful call returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "schema", rename_all = "camelCase")]
pub enum ResponseBody {
    /// A body of this type.
    Schema(IrSchema),
    /// The selected status declares no content.
    NoContent,
    /// No success status was declared.
    Unknown,
}

/// A `components.securitySchemes` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrSecurityScheme {
    /// Key under `securitySchemes`.
    pub key: String,
    /// `http`, `apiKey`, `oauth2` or `openIdConnect`.
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// HTTP auth scheme, e.g. `bearer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Bearer token format hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    /// Where an API key is sent.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Header, query or cookie name of an API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Ir {
    /// Every operation across services.
    pub fn operations(&self) -> impl Iterator<Item = &IrOperation> {
        self.services.iter().flat_map(|s| s.operations.iter())
    }

    /// Look up a model by name.
    pub fn model(&self, name: &str) -> Option<&IrModelDef> {
        self.model_defs.iter().find(|m| m.name == name)
    }
}
