//! External hooks: the operation-id parser and pre/post generation commands.

use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ir::{IrOperation, Target};
use crate::naming::{to_camel_case, to_pascal_case, to_snake_case};
use crate::openapi::HttpMethod;

const CONTROLLER_MARKER: &str = "Controller_";

/// Raw method name for an operation.
///
/// `parser`, when set, is run as `<parser> <operationId> <METHOD> <path>`; its
/// trimmed stdout wins when it exits successfully with non-empty output.
/// Otherwise the operation id minus any `...Controller_` prefix is used, and
/// without an id the name is derived from the method and path.
pub fn resolve_method_name(op: &IrOperation, parser: Option<&Path>) -> String {
    let id = op.operation_id.as_deref().unwrap_or_default();

    if let Some(parser) = parser
        && let Some(name) = run_parser(parser, id, op)
    {
        return name;
    }

    let parsed = default_parse_operation_id(id);
    if !parsed.is_empty() {
        return parsed.to_string();
    }
    derive_method_name(op)
}

/// Method name in the target's casing convention.
pub fn method_name_for(target: Target, raw: &str) -> String {
    match target {
        Target::TypeScript => to_camel_case(raw),
        Target::Go => to_pascal_case(raw),
        Target::Python => to_snake_case(raw),
    }
}

fn run_parser(parser: &Path, id: &str, op: &IrOperation) -> Option<String> {
    let output = Command::new(parser)
        .arg(id)
        .arg(op.method.as_str())
        .arg(&op.path)
        .output();

    match output {
        Ok(out) if out.status.success() => {
            let name = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if name.is_empty() {
                debug!(operation_id = %id, "Operation id parser printed nothing, using default");
                None
            } else {
                Some(name)
            }
        }
        Ok(out) => {
            debug!(operation_id = %id, status = %out.status, "Operation id parser failed, using default");
            None
        }
        Err(e) => {
            warn!(parser = %parser.display(), error = %e, "Could not run operation id parser");
            None
        }
    }
}

/// Everything after `Controller_`, or the id unchanged.
pub fn default_parse_operation_id(id: &str) -> &str {
    match id.find(CONTROLLER_MARKER) {
        Some(idx) => &id[idx + CONTROLLER_MARKER.len()..],
        None => id,
    }
}

/// REST-style fallback name from the method and whether the path has a
/// parameter.
pub fn derive_method_name(op: &IrOperation) -> String {
    let has_param = op.path.contains('{') && op.path.contains('}');
    match op.method {
        HttpMethod::Get if has_param => "get".to_string(),
        HttpMethod::Get => "list".to_string(),
        HttpMethod::Post => "create".to_string(),
        HttpMethod::Put | HttpMethod::Patch => "update".to_string(),
        HttpMethod::Delete => "delete".to_string(),
        other => other.as_str().to_ascii_lowercase(),
    }
}

/// Run a pre/post generation command (program followed by arguments) inside
/// `work_dir`. An empty command is a no-op.
pub fn run_command(command: &[String], work_dir: &Path, label: &str) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Ok(());
    };
    let description = command.join(" ");
    info!(label, command = %description, dir = %work_dir.display(), "Running command");

    let status = Command::new(program)
        .args(args)
        .current_dir(work_dir)
        .status()
        .map_err(|e| Error::CommandFailed {
            label: label.to_string(),
            command: description.clone(),
            status: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::CommandFailed {
            label: label.to_string(),
            command: description,
            status: status.to_string(),
        })
    }
}
