//! Operation collection: services, parameters, bodies and responses.
//!
//! Operation shapes are converted inline; only `$ref`s reach the model
//! registry.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::openapi::{
    Components, HttpMethod, MediaType, OpenApiSpec, Operation, Parameter, RefOr, RequestBody, Response, ref_name,
};

use super::api::{
    IrOperation, IrParam, IrRequestBody, IrResponse, IrSecurityScheme, IrService, MISC_TAG, ResponseBody,
};
use super::normalize::SchemaConverter;
use super::types::IrSchema;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Walks the paths of one document and builds its services.
#[derive(Debug)]
pub struct OperationCollector<'a> {
    spec: &'a OpenApiSpec,
    components: Option<&'a Components>,
}

impl<'a> OperationCollector<'a> {
    /// A collector over the paths and components of `spec`.
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self {
            spec,
            components: spec.components.as_ref(),
        }
    }

    /// All operations grouped by their first declared tag (or `misc`).
    /// Services are sorted by tag, operations by path then method.
    pub fn collect(&self, converter: &mut SchemaConverter) -> Vec<IrService> {
        let mut services: BTreeMap<String, Vec<IrOperation>> = BTreeMap::new();

        for (path, item) in &self.spec.paths {
            let shared = self.resolve_parameters(&item.parameters);
            for (method, op) in item.operations() {
                let ir = self.collect_operation(converter, path, method, op, &shared);
                debug!(method = %method, path = %path, tag = %ir.tag, "Collected operation");
                services.entry(ir.tag.clone()).or_default().push(ir);
            }
        }

        services
            .into_iter()
            .map(|(tag, mut operations)| {
                operations.sort_by(|a, b| (&a.path, a.method.as_str()).cmp(&(&b.path, b.method.as_str())));
                IrService { tag, operations }
            })
            .collect()
    }

    fn collect_operation(
        &self,
        converter: &mut SchemaConverter,
        path: &str,
        method: HttpMethod,
        op: &'a Operation,
        shared: &[&'a Parameter],
    ) -> IrOperation {
        let location = format!("{method} {path}");
        let tag = op.tags.first().cloned().unwrap_or_else(|| MISC_TAG.to_string());

        // Operation-level parameters override path-level ones.
        let own = self.resolve_parameters(&op.parameters);
        let mut merged: Vec<&Parameter> = shared
            .iter()
            .copied()
            .filter(|p| !own.iter().any(|o| o.name == p.name && o.location == p.location))
            .collect();
        merged.extend(own);

        let mut path_params = Vec::new();
        let mut query_params = Vec::new();
        for param in merged {
            let target = match param.location.as_str() {
                "path" => &mut path_params,
                "query" => &mut query_params,
                _ => continue,
            };
            let schema = match &param.schema {
                Some(schema) => converter.convert_inline(schema, &format!("{location} {}", param.name)),
                None => IrSchema::unknown(),
            };
            target.push(IrParam {
                name: param.name.clone(),
                required: param.required || param.location == "path",
                schema,
                description: param.description.clone(),
            });
        }
        path_params.sort_by(|a: &IrParam, b| a.name.cmp(&b.name));
        query_params.sort_by(|a: &IrParam, b| a.name.cmp(&b.name));

        let request_body = op
            .request_body
            .as_ref()
            .and_then(|body| self.resolve_request_body(body))
            .and_then(|body| request_body(converter, body, &location));

        let response = self.response(converter, op, &location);

        IrOperation {
            operation_id: op.operation_id.clone(),
            method,
            path: path.to_string(),
            tag,
            original_tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            deprecated: op.deprecated,
            path_params,
            path_param_order: template_params(path),
            query_params,
            request_body,
            response,
        }
    }

    fn resolve_parameters(&self, params: &'a [RefOr<Parameter>]) -> Vec<&'a Parameter> {
        params
            .iter()
            .filter_map(|param| match param {
                RefOr::Item(param) => Some(param),
                RefOr::Ref { ref_path } => {
                    let found = self.components.and_then(|c| c.parameters.get(ref_name(ref_path)));
                    if found.is_none() {
                        warn!(reference = %ref_path, "Skipping unresolved parameter reference");
                    }
                    found
                }
            })
            .collect()
    }

    fn resolve_request_body(&self, body: &'a RefOr<RequestBody>) -> Option<&'a RequestBody> {
        match body {
            RefOr::Item(body) => Some(body),
            RefOr::Ref { ref_path } => {
                let found = self.components.and_then(|c| c.request_bodies.get(ref_name(ref_path)));
                if found.is_none() {
                    warn!(reference = %ref_path, "Skipping unresolved request body reference");
                }
                found
            }
        }
    }

    fn resolve_response(&self, response: &'a RefOr<Response>) -> Option<&'a Response> {
        match response {
            RefOr::Item(response) => Some(response),
            RefOr::Ref { ref_path } => {
                let found = self.components.and_then(|c| c.responses.get(ref_name(ref_path)));
                if found.is_none() {
                    warn!(reference = %ref_path, "Skipping unresolved response reference");
                }
                found
            }
        }
    }

    /// `200`, then `201`, then any other `2xx` in status order.
    fn response(&self, converter: &mut SchemaConverter, op: &'a Operation, location: &str) -> IrResponse {
        let mut statuses: Vec<&String> = op
            .responses
            .keys()
            .filter(|code| code.len() == 3 && code.starts_with('2'))
            .collect();
        statuses.sort_by(|a, b| (status_rank(a), a).cmp(&(status_rank(b), b)));

        for status in statuses {
            let Some(response) = op.responses.get(status).and_then(|r| self.resolve_response(r)) else {
                continue;
            };
            let (content_type, body) = match pick_response_media(&response.content) {
                Some((content_type, media)) => (
                    Some(content_type.clone()),
                    ResponseBody::Schema(media_schema(converter, media, &format!("{location} {status}"))),
                ),
                None => (None, ResponseBody::NoContent),
            };
            return IrResponse {
                status: Some(status.clone()),
                content_type,
                body,
                description: response.description.clone(),
            };
        }

        debug!(location = %location, "No success response declared");
        IrResponse::unknown()
    }
}

fn status_rank(code: &str) -> u8 {
    match code {
        "200" => 0,
        "201" => 1,
        _ => 2,
    }
}

fn is_json(content_type: &str) -> bool {
    content_type == JSON || content_type.ends_with("+json") || content_type.starts_with("application/json;")
}

fn request_body(converter: &mut SchemaConverter, body: &RequestBody, location: &str) -> Option<IrRequestBody> {
    let exact = |ct: &str| body.content.get_key_value(ct);
    let picked = exact(JSON)
        .or_else(|| body.content.iter().find(|(ct, _)| is_json(ct)))
        .or_else(|| exact(FORM))
        .or_else(|| exact(MULTIPART))
        .or_else(|| body.content.first())?;

    let (content_type, media) = picked;
    let schema = if content_type == MULTIPART {
        IrSchema::unknown()
    } else {
        media_schema(converter, media, &format!("{location} body"))
    };

    Some(IrRequestBody {
        content_type: content_type.clone(),
        schema,
        required: body.required,
    })
}

/// Structured media first, else the first declared one.
fn pick_response_media(content: &IndexMap<String, MediaType>) -> Option<(&String, &MediaType)> {
    content
        .get_key_value(JSON)
        .or_else(|| content.iter().find(|(ct, _)| is_json(ct)))
        .or_else(|| content.first())
}

fn media_schema(converter: &mut SchemaConverter, media: &MediaType, location: &str) -> IrSchema {
    match &media.schema {
        Some(schema) => converter.convert_inline(schema, location),
        None => IrSchema::unknown(),
    }
}

/// Parameter names in the order they appear in a path template.
pub fn template_params(path: &str) -> Vec<String> {
    path.split('{')
        .skip(1)
        .filter_map(|segment| segment.split_once('}').map(|(name, _)| name.to_string()))
        .collect()
}

/// `components.securitySchemes` in name order.
pub fn collect_security_schemes(spec: &OpenApiSpec) -> Vec<IrSecurityScheme> {
    let Some(components) = &spec.components else {
        return Vec::new();
    };
    components
        .security_schemes
        .iter()
        .map(|(key, scheme)| {
            let mut ir = IrSecurityScheme {
                key: key.clone(),
                scheme_type: scheme.scheme_type.clone(),
                scheme: None,
                bearer_format: None,
                location: None,
                name: None,
            };
            match scheme.scheme_type.as_str() {
                "http" => {
                    ir.scheme = scheme.scheme.clone();
                    ir.bearer_format = scheme.bearer_format.clone();
                }
                "apiKey" => {
                    ir.location = scheme.location.clone();
                    ir.name = scheme.name.clone();
                }
                _ => {}
            }
            ir
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ir::types::SchemaKind;

    const ORGS: &str = r##"{
  "openapi": "3.0.3",
  "info": { "title": "Orgs", "version": "1" },
  "paths": {
    "/v1/organizations/{id}": {
      "get": {
        "operationId": "OrganizationsController_findOne",
        "tags": ["organizations"],
        "parameters": [{ "name": "id", "in": "path", "required": true, "schema": { "type": "string" } }],
        "responses": {
          "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/OrganizationDto" } } } }
        }
      }
    },
    "/v1/resource-types": {
      "post": {
        "operationId": "ResourceTypesController_create",
        "tags": ["resource-types", "admin"],
        "requestBody": {
          "required": true,
          "content": {
            "application/json": {
              "schema": {
                "type": "object",
                "required": ["name"],
                "properties": {
                  "name": { "type": "string" },
                  "parentResourceTypeId": { "type": "string" }
                }
              }
            }
          }
        },
        "responses": { "201": { "description": "Created" } }
      },
      "get": {
        "operationId": "ResourceTypesController_list",
        "tags": ["resource-types"],
        "parameters": [
          { "name": "limit", "in": "query", "schema": { "type": "integer" } },
          { "name": "X-Trace", "in": "header", "schema": { "type": "string" } },
          { "$ref": "#/components/parameters/Cursor" }
        ],
        "responses": { "default": { "description": "whatever" } }
      }
    },
    "/health": {
      "get": { "responses": { "204": { "description": "healthy" } } }
    }
  },
  "components": {
    "schemas": {
      "OrganizationDto": {
        "type": "object",
        "properties": {
          "id": { "type": "string" }, "name": { "type": "string" },
          "createdAt": { "type": "string" }, "updatedAt": { "type": "string" }
        }
      }
    },
    "parameters": {
      "Cursor": { "name": "cursor", "in": "query", "schema": { "type": "string" } }
    },
    "securitySchemes": {
      "bearer": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" },
      "apiKey": { "type": "apiKey", "in": "header", "name": "X-API-Key" }
    }
  }
}"##;

    fn collect(json: &str) -> Vec<IrService> {
        let spec = OpenApiSpec::from_json(json).unwrap();
        let mut converter = SchemaConverter::for_spec(&spec);
        OperationCollector::new(&spec).collect(&mut converter)
    }

    fn find<'s>(services: &'s [IrService], id: &str) -> &'s IrOperation {
        services
            .iter()
            .flat_map(|s| &s.operations)
            .find(|op| op.operation_id.as_deref() == Some(id))
            .unwrap()
    }

    #[test]
    fn test_services_grouped_and_sorted() {
        let services = collect(ORGS);
        let tags: Vec<_> = services.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["misc", "organizations", "resource-types"]);

        let rt = &services[2];
        let methods: Vec<_> = rt.operations.iter().map(|o| o.method).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Post]);
        assert_eq!(rt.operations[1].original_tags, vec!["resource-types", "admin"]);
    }

    #[test]
    fn test_path_params_and_ref_response() {
        let services = collect(ORGS);
        let op = find(&services, "OrganizationsController_findOne");
        let names: Vec<_> = op.path_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id"]);
        assert!(op.path_params[0].required);
        assert_eq!(op.response.status.as_deref(), Some("200"));
        match &op.response.body {
            ResponseBody::Schema(schema) => assert_eq!(schema.ref_name(), Some("OrganizationDto")),
            other => panic!("expected schema, got {other:?}"),
        }
    }

    #[test]
    fn test_request_body_required_fields() {
        let services = collect(ORGS);
        let op = find(&services, "ResourceTypesController_create");
        let body = op.request_body.as_ref().unwrap();
        assert_eq!(body.content_type, "application/json");
        assert!(body.required);
        match &body.schema.kind {
            SchemaKind::Object { properties, .. } => {
                let required: Vec<_> = properties.iter().map(|f| (f.name.as_str(), f.required)).collect();
                assert_eq!(required, vec![("name", true), ("parentResourceTypeId", false)]);
            }
            other => panic!("expected object, got {other:?}"),
        }
        assert_eq!(op.response.body, ResponseBody::NoContent);
        assert_eq!(op.response.status.as_deref(), Some("201"));
    }

    #[test]
    fn test_query_params_resolve_refs_and_skip_headers() {
        let services = collect(ORGS);
        let op = find(&services, "ResourceTypesController_list");
        let names: Vec<_> = op.query_params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cursor", "limit"]);
        assert_eq!(op.response, IrResponse::unknown());
    }

    #[test]
    fn test_untagged_operation_is_misc_with_no_content() {
        let services = collect(ORGS);
        let health = &services[0].operations[0];
        assert_eq!(health.tag, MISC_TAG);
        assert!(health.original_tags.is_empty());
        assert_eq!(health.effective_tags(), vec![MISC_TAG]);
        assert_eq!(health.response.body, ResponseBody::NoContent);
        assert_eq!(health.response.status.as_deref(), Some("204"));
    }

    #[test]
    fn test_path_level_params_merge_and_template_order() {
        let services = collect(
            r##"{
  "openapi": "3.1.0", "info": { "title": "t", "version": "1" },
  "paths": {
    "/orgs/{orgId}/users/{userId}": {
      "parameters": [
        { "name": "orgId", "in": "path", "required": true, "schema": { "type": "string" } },
        { "name": "userId", "in": "path", "required": true, "schema": { "type": "string" } }
      ],
      "get": {
        "operationId": "getUser",
        "parameters": [{ "name": "userId", "in": "path", "required": true, "schema": { "type": "integer" } }],
        "responses": { "200": { "description": "OK", "content": { "text/plain": { "schema": { "type": "string" } } } } }
      }
    }
  }
}"##,
        );
        let op = find(&services, "getUser");
        assert_eq!(op.path_param_order, vec!["orgId", "userId"]);
        let user_id = op.path_params.iter().find(|p| p.name == "userId").unwrap();
        assert_eq!(user_id.schema.kind, SchemaKind::Integer);

        let ordered: Vec<_> = op.path_params_in_order().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(ordered, vec!["orgId", "userId"]);

        assert_eq!(op.response.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_body_media_precedence() {
        let spec: OpenApiSpec = OpenApiSpec::from_json(
            r##"{
  "openapi": "3.1.0", "info": { "title": "t", "version": "1" },
  "paths": {
    "/upload": {
      "post": {
        "operationId": "upload",
        "requestBody": { "content": {
          "multipart/form-data": { "schema": { "type": "object", "properties": { "file": { "type": "string", "format": "binary" } } } },
          "application/x-www-form-urlencoded": { "schema": { "type": "object" } }
        } },
        "responses": { "200": { "description": "OK", "content": {
          "text/plain": { "schema": { "type": "string" } },
          "application/problem+json": { "schema": { "type": "integer" } }
        } } }
      },
      "put": {
        "operationId": "replace",
        "requestBody": { "content": { "multipart/form-data": { "schema": { "type": "object" } } } },
        "responses": { "202": { "description": "Accepted" }, "299": { "description": "odd" } }
      }
    }
  }
}"##,
        )
        .unwrap();
        let mut converter = SchemaConverter::for_spec(&spec);
        let services = OperationCollector::new(&spec).collect(&mut converter);

        let upload = find(&services, "upload");
        assert_eq!(upload.request_body.as_ref().unwrap().content_type, FORM);
        assert_eq!(upload.response.content_type.as_deref(), Some("application/problem+json"));

        let replace = find(&services, "replace");
        let body = replace.request_body.as_ref().unwrap();
        assert_eq!(body.content_type, MULTIPART);
        assert_eq!(body.schema.kind, SchemaKind::Unknown);
        assert_eq!(replace.response.status.as_deref(), Some("202"));
    }

    #[test]
    fn test_ok_outranks_created_regardless_of_order() {
        let services = collect(
            r##"{
  "openapi": "3.1.0", "info": { "title": "t", "version": "1" },
  "paths": {
    "/a": {
      "post": {
        "operationId": "createdFirst",
        "responses": {
          "201": { "description": "Created", "content": { "application/json": { "schema": { "type": "integer" } } } },
          "200": { "description": "OK", "content": { "application/json": { "schema": { "type": "string" } } } }
        }
      },
      "put": {
        "operationId": "okWithoutJson",
        "responses": {
          "201": { "description": "Created", "content": { "application/json": { "schema": { "type": "integer" } } } },
          "200": { "description": "OK", "content": { "text/csv": { "schema": { "type": "string" } } } }
        }
      },
      "patch": {
        "operationId": "okWithoutBody",
        "responses": {
          "201": { "description": "Created", "content": { "application/json": { "schema": { "type": "integer" } } } },
          "200": { "description": "OK" }
        }
      }
    }
  }
}"##,
        );

        let created_first = find(&services, "createdFirst");
        assert_eq!(created_first.response.status.as_deref(), Some("200"));
        assert_eq!(
            created_first.response.body,
            ResponseBody::Schema(IrSchema::new(SchemaKind::String))
        );

        let without_json = find(&services, "okWithoutJson");
        assert_eq!(without_json.response.status.as_deref(), Some("200"));
        assert_eq!(without_json.response.content_type.as_deref(), Some("text/csv"));

        let without_body = find(&services, "okWithoutBody");
        assert_eq!(without_body.response.status.as_deref(), Some("200"));
        assert_eq!(without_body.response.body, ResponseBody::NoContent);
        assert_eq!(without_body.response.content_type, None);
    }

    #[test]
    fn test_template_params() {
        assert_eq!(template_params("/a/{x}/b/{y}"), vec!["x", "y"]);
        assert!(template_params("/plain").is_empty());
    }

    #[test]
    fn test_security_schemes_sorted() {
        let spec = OpenApiSpec::from_json(ORGS).unwrap();
        let schemes = collect_security_schemes(&spec);
        let keys: Vec<_> = schemes.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["apiKey", "bearer"]);
        assert_eq!(schemes[0].name.as_deref(), Some("X-API-Key"));
        assert_eq!(schemes[1].bearer_format.as_deref(), Some("JWT"));
    }
}
