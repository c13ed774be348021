//! End-to-end checks over one document: build, derive per filter, project.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use sdkgen_core::hooks::method_name_for;
use sdkgen_core::ir::{
    Annotations, EnumBase, Ir, IrModelDef, IrSchema, ResponseBody, SchemaKind, TagFilter, Target, TypeExpr,
    TypeProjector, dedup_models,
};
use sdkgen_core::naming::{split_words, to_pascal_case, to_snake_case};
use sdkgen_core::openapi::OpenApiSpec;
use sdkgen_core::pipeline::{build_ir, derive_ir};

const PLATFORM_JSON: &str = r##"{
  "openapi": "3.1.0",
  "info": { "title": "Platform", "version": "1.0.0" },
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
        "tags": ["resource-types"],
        "requestBody": {
          "required": true,
          "content": {
            "application/json": {
              "schema": {
                "type": "object",
                "required": ["name"],
                "properties": {
                  "name": { "type": "string" },
                  "parentResourceTypeId": { "type": "string", "nullable": true }
                }
              }
            }
          }
        },
        "responses": {
          "201": { "description": "Created", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ResourceTypeDto" } } } }
        }
      }
    },
    "/v1/invoices": {
      "get": {
        "operationId": "listInvoices",
        "tags": ["billing", "organizations"],
        "responses": {
          "200": {
            "description": "OK",
            "content": { "application/json": { "schema": { "type": "array", "items": { "$ref": "#/components/schemas/InvoiceDto" } } } }
          }
        }
      }
    },
    "/v1/transport": {
      "get": {
        "operationId": "XMLHttpRequest",
        "responses": {
          "200": { "description": "OK", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Transport" } } } }
        }
      }
    }
  },
  "components": {
    "schemas": {
      "OrganizationDto": {
        "type": "object",
        "required": ["id", "name", "createdAt", "updatedAt"],
        "properties": {
          "id": { "type": "string" },
          "name": { "type": "string" },
          "createdAt": { "type": "string" },
          "updatedAt": { "type": "string" }
        }
      },
      "ResourceTypeDto": {
        "type": "object",
        "properties": {
          "id": { "type": "string" },
          "parent": { "$ref": "#/components/schemas/ResourceTypeDto" }
        }
      },
      "InvoiceDto": {
        "type": "object",
        "properties": {
          "lines": { "type": "array", "items": { "type": "object", "properties": { "amount": { "type": "number" } } } },
          "status": { "type": "string", "enum": ["draft", "paid"] },
          "organization": { "$ref": "#/components/schemas/OrganizationDto" }
        }
      },
      "Transport": {
        "type": "object",
        "properties": {
          "XMLHttpRequest": { "type": "object", "properties": { "url": { "type": "string" } } }
        }
      },
      "Unused": { "type": "object", "properties": { "x": { "type": "integer" } } }
    }
  }
}"##;

fn full_ir() -> Ir {
    build_ir(&OpenApiSpec::from_json(PLATFORM_JSON).unwrap()).ir
}

fn names(ir: &Ir) -> Vec<&str> {
    ir.model_defs.iter().map(|m| m.name.as_str()).collect()
}

fn filter(include: &[&str], exclude: &[&str]) -> TagFilter {
    TagFilter::new(include, exclude).unwrap()
}

#[test]
fn determinism_across_builds() {
    let first = build_ir(&OpenApiSpec::from_json(PLATFORM_JSON).unwrap());
    let second = build_ir(&OpenApiSpec::from_json(PLATFORM_JSON).unwrap());
    assert_eq!(first.ir, second.ir);
    assert_eq!(
        serde_json::to_string(&first.ir).unwrap(),
        serde_json::to_string(&second.ir).unwrap()
    );
}

#[test]
fn model_names_are_unique_in_every_derived_ir() {
    let ir = full_ir();
    for f in [
        TagFilter::allow_all(),
        filter(&["organizations"], &[]),
        filter(&[], &["billing"]),
        filter(&["resource"], &[]),
    ] {
        let derived = derive_ir(&ir, &f).unwrap();
        let unique: HashSet<_> = names(&derived).into_iter().collect();
        assert_eq!(unique.len(), derived.model_defs.len());
    }
}

#[test]
fn empty_filter_equals_match_all_filter() {
    let ir = full_ir();
    let unfiltered = derive_ir(&ir, &TagFilter::allow_all()).unwrap();
    let match_all = derive_ir(&ir, &filter(&[".*"], &[])).unwrap();
    assert_eq!(unfiltered, match_all);
    assert!(!names(&unfiltered).contains(&"Unused"));
}

#[test]
fn scenario_organization_lookup() {
    let ir = full_ir();
    let op = ir
        .operations()
        .find(|op| op.path == "/v1/organizations/{id}")
        .unwrap();

    let path_params: Vec<_> = op.path_params_in_order().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(path_params, vec!["id"]);
    match &op.response.body {
        ResponseBody::Schema(schema) => assert_eq!(schema.ref_name(), Some("OrganizationDto")),
        other => panic!("expected a schema response, got {other:?}"),
    }

    // listInvoices groups under billing but also carries the organizations
    // tag, so it survives and pulls in its models.
    let derived = derive_ir(&ir, &filter(&["^organizations$"], &[])).unwrap();
    let tags: Vec<_> = derived.services.iter().map(|s| s.tag.as_str()).collect();
    assert_eq!(tags, vec!["organizations"]);
    assert_eq!(derived.services[0].operations.len(), 2);
    assert_eq!(
        names(&derived),
        vec!["InvoiceDto_Lines_Item", "InvoiceDto_Status", "InvoiceDto", "OrganizationDto"]
    );

    let only_lookup = derive_ir(&ir, &filter(&["^organizations$"], &["billing"])).unwrap();
    assert_eq!(names(&only_lookup), vec!["OrganizationDto"]);
}

#[test]
fn scenario_resource_type_body_fields() {
    let ir = full_ir();
    let op = ir.operations().find(|op| op.path == "/v1/resource-types").unwrap();
    let body = op.request_body.as_ref().unwrap();
    assert_eq!(body.content_type, "application/json");
    assert!(body.required);

    let SchemaKind::Object { properties, .. } = &body.schema.kind else {
        panic!("request body should stay an inline object");
    };
    let fields: Vec<_> = properties
        .iter()
        .map(|f| (f.name.as_str(), f.required, f.schema.nullable))
        .collect();
    assert_eq!(
        fields,
        vec![("name", true, false), ("parentResourceTypeId", false, true)]
    );

    // Self-reference terminates and keeps exactly one model.
    let derived = derive_ir(&ir, &filter(&["resource-types"], &[])).unwrap();
    assert_eq!(names(&derived), vec!["ResourceTypeDto"]);
}

#[test]
fn scenario_acronym_split_is_uniform() {
    assert_eq!(split_words("XMLHttpRequest"), vec!["XML", "Http", "Request"]);
    assert_eq!(to_pascal_case("XMLHttpRequest"), "XmlHttpRequest");
    assert_eq!(to_snake_case("XMLHttpRequest"), "xml_http_request");

    let ir = full_ir();
    assert!(ir.model("Transport_XmlHttpRequest").is_some());

    let op = ir.operations().find(|op| op.path == "/v1/transport").unwrap();
    assert_eq!(op.tag, "misc");
    let raw = op.operation_id.as_deref().unwrap();
    assert_eq!(method_name_for(Target::Go, raw), "XmlHttpRequest");
    assert_eq!(method_name_for(Target::TypeScript, raw), "xmlHttpRequest");
    assert_eq!(method_name_for(Target::Python, raw), "xml_http_request");
}

#[test]
fn untagged_operations_filter_by_fallback_tag() {
    let ir = full_ir();
    let derived = derive_ir(&ir, &filter(&["^misc$"], &[])).unwrap();
    assert_eq!(derived.operations().count(), 1);
    assert_eq!(names(&derived), vec!["Transport_XmlHttpRequest", "Transport"]);
}

#[test]
fn dedup_is_idempotent_and_prefers_enums() {
    let def = |name: &str, kind: SchemaKind| IrModelDef {
        name: name.to_string(),
        schema: IrSchema::new(kind),
        annotations: Annotations::default(),
    };
    let status = SchemaKind::Enum {
        values: vec!["a".into()],
        raw_values: Vec::new(),
        base: EnumBase::String,
    };
    let models = vec![
        def("Status", SchemaKind::String),
        def("Status", status),
    ];

    let once = dedup_models(&models);
    assert_eq!(once.len(), 1);
    assert!(once[0].schema.is_enum());
    assert_eq!(dedup_models(&once), once);

    let derived = derive_ir(&full_ir(), &TagFilter::allow_all()).unwrap();
    assert_eq!(dedup_models(&derived.model_defs), derived.model_defs);
}

#[test]
fn nullable_null_is_not_double_wrapped() {
    let null = IrSchema {
        nullable: true,
        ..IrSchema::new(SchemaKind::Null)
    };
    for target in Target::ALL {
        let expr = TypeProjector::new(target).project(&null);
        assert!(matches!(expr, TypeExpr::Scalar { .. }), "{target}: {expr:?}");
        assert_eq!(expr.clone().nullable(), expr);
    }
}
