//! End-to-end generation.
//!
//! The pipeline is:
//! 1. Load: API document -> `OpenApiSpec`
//! 2. Build: `OpenApiSpec` -> full `Ir` (every model, every operation)
//! 3. Derive, per client: tag filter -> reachability prune -> dedup
//! 4. Emit: derived `Ir` -> files under the client's `outDir`
//!
//! The full IR is built once and never mutated; each client works on its
//! own derived copy.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ClientConfig, Config};
use crate::error::{Error, Result};
use crate::hooks::{method_name_for, resolve_method_name, run_command};
use crate::ir::{
    Diagnostic, Ir, IrParam, OperationCollector, ResponseBody, Scalar, SchemaConverter, TagFilter, Target,
    TypeExpr, TypeProjector, collect_security_schemes, dedup_models, prune,
};
use crate::openapi::{HttpMethod, OpenApiSpec};

/// Full IR of a document plus everything the converter flagged on the way.
#[derive(Debug, Clone)]
pub struct Build {
    /// Every model and every operation.
    pub ir: Ir,
    /// Non-fatal conversion problems.
    pub diagnostics: Vec<Diagnostic>,
}

/// Convert every component and collect every operation.
pub fn build_ir(spec: &OpenApiSpec) -> Build {
    let mut converter = SchemaConverter::for_spec(spec);
    converter.convert_components(spec);
    let services = OperationCollector::new(spec).collect(&mut converter);
    let security_schemes = collect_security_schemes(spec);
    let (model_defs, diagnostics) = converter.finish();

    debug!(
        services = services.len(),
        models = model_defs.len(),
        diagnostics = diagnostics.len(),
        "Built IR"
    );

    Build {
        ir: Ir {
            services,
            model_defs,
            security_schemes,
        },
        diagnostics,
    }
}

/// Narrow `ir` to the operations `filter` admits and the models they reach.
///
/// Fails when a surviving reference names no model.
pub fn derive_ir(ir: &Ir, filter: &TagFilter) -> Result<Ir> {
    let filtered = filter.apply(ir);
    let (mut derived, reach) = prune(&filtered);
    derived.model_defs = dedup_models(&derived.model_defs);

    if !reach.unresolved.is_empty() {
        return Err(Error::UnresolvedReferences {
            names: reach.unresolved.into_iter().collect(),
        });
    }

    debug!(
        services = derived.services.len(),
        models = derived.model_defs.len(),
        dropped_models = ir.model_defs.len().saturating_sub(derived.model_defs.len()),
        "Derived IR"
    );
    Ok(derived)
}

/// Writes a derived IR for one client.
pub trait Emitter {
    /// Returns the files written.
    fn emit(&self, ir: &Ir, client: &ClientConfig) -> Result<Vec<PathBuf>>;
}

/// Writes [`ClientConfig::ir_output_path`]: the derived IR with every model
/// and operation type spelled for the client's target.
#[derive(Debug, Default, Clone, Copy)]
pub struct IrJsonEmitter;

/// Contents of one `<package>.ir.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDocument<'a> {
    /// Client class name.
    pub client: &'a str,
    /// Package name as configured.
    pub package_name: &'a str,
    /// Go module path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<&'a str>,
    /// Target the types are spelled for.
    pub target: Target,
    /// The derived IR.
    pub ir: &'a Ir,
    /// Every model, in registry order.
    pub models: Vec<RenderedModel>,
    /// Every operation, in service order.
    pub operations: Vec<RenderedOperation>,
}

/// A model with its types spelled for the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedModel {
    /// Model name.
    pub name: String,
    /// How other types refer to the model.
    pub reference: String,
    /// Type of the model's shape.
    pub definition: String,
}

/// An operation with its client method name and spelled types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedOperation {
    /// Tag of the owning service.
    pub service: String,
    /// Method name in the target's convention.
    pub method_name: String,
    /// HTTP method.
    pub http_method: HttpMethod,
    /// Path template.
    pub path: String,
    /// Path parameters in template order, then query parameters.
    pub params: Vec<RenderedParam>,
    /// Body type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    /// `None` for a response without content.
    pub response: Option<String>,
}

/// A parameter with its type spelled for the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedParam {
    /// Parameter name.
    pub name: String,
    /// `path` or `query`.
    #[serde(rename = "in")]
    pub location: &'static str,
    /// Whether the parameter must be sent.
    pub required: bool,
    /// Parameter type.
    #[serde(rename = "type")]
    pub type_name: String,
}

impl IrJsonEmitter {
    /// Project every type of `ir` for the client's target.
    pub fn render<'a>(ir: &'a Ir, client: &'a ClientConfig) -> Result<ClientDocument<'a>> {
        let target = client.target()?;
        let projector = TypeProjector::new(target).with_known_models(ir.model_defs.iter().map(|m| m.name.clone()));
        let spell = |expr: TypeExpr| expr.render(target);

        let models = ir
            .model_defs
            .iter()
            .map(|m| RenderedModel {
                name: m.name.clone(),
                reference: spell(TypeExpr::Named { name: m.name.clone() }),
                definition: spell(projector.project(&m.schema)),
            })
            .collect();

        let param = |p: &IrParam, location: &'static str| RenderedParam {
            name: p.name.clone(),
            location,
            required: p.required,
            type_name: spell(projector.project(&p.schema)),
        };

        let operations = ir
            .operations()
            .map(|op| {
                let raw_name = resolve_method_name(op, client.operation_id_parser.as_deref());
                let params = op
                    .path_params_in_order()
                    .into_iter()
                    .map(|p| param(p, "path"))
                    .chain(op.query_params.iter().map(|p| param(p, "query")))
                    .collect();
                let response = match &op.response.body {
                    ResponseBody::Schema(schema) => Some(spell(projector.project(schema))),
                    ResponseBody::Unknown => Some(spell(TypeExpr::scalar(Scalar::Any))),
                    ResponseBody::NoContent => None,
                };
                RenderedOperation {
                    service: op.tag.clone(),
                    method_name: method_name_for(target, &raw_name),
                    http_method: op.method,
                    path: op.path.clone(),
                    params,
                    request_body: op.request_body.as_ref().map(|b| spell(projector.project(&b.schema))),
                    response,
                }
            })
            .collect();

        Ok(ClientDocument {
            client: &client.name,
            package_name: &client.package_name,
            module_name: client.module_name.as_deref(),
            target,
            ir,
            models,
            operations,
        })
    }
}

impl Emitter for IrJsonEmitter {
    fn emit(&self, ir: &Ir, client: &ClientConfig) -> Result<Vec<PathBuf>> {
        let document = Self::render(ir, client)?;
        let mut json = serde_json::to_string_pretty(&document)?;
        json.push('\n');

        let path = client.ir_output_path();
        std::fs::write(&path, json).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Wrote IR document");
        Ok(vec![path])
    }
}

/// Load the configured document and generate every selected client.
///
/// Generation is not transactional: files written before a failing client
/// or command stay on disk.
pub fn generate(config: &Config, only_client: Option<&str>) -> Result<Vec<PathBuf>> {
    let clients = config.selected_clients(only_client)?;
    let spec = OpenApiSpec::from_path(&config.spec_path())?;
    let build = build_ir(&spec);
    generate_clients(&build.ir, &clients, &IrJsonEmitter)
}

/// Per client: create `outDir`, pre-command, derive, emit, post-command.
pub fn generate_clients(ir: &Ir, clients: &[&ClientConfig], emitter: &dyn Emitter) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for client in clients {
        let target = client.target()?;
        let filter = client.tag_filter()?;

        std::fs::create_dir_all(&client.out_dir).map_err(|source| Error::Io {
            path: client.out_dir.clone(),
            source,
        })?;
        run_command(&client.pre_command, &client.out_dir, "pre-command")?;

        let derived = derive_ir(ir, &filter)?;
        let files = emitter.emit(&derived, client)?;

        run_command(&client.post_command, &client.out_dir, "post-command")?;

        info!(
            client = %client.name,
            target = %target,
            out_dir = %client.out_dir.display(),
            services = derived.services.len(),
            models = derived.model_defs.len(),
            "Generated client"
        );
        written.extend(files);
    }

    Ok(written)
}
