//! `sdkgen` command line: generate clients from a config file or flags, or
//! validate a document.

#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use sdkgen_core::config::{ClientConfig, Config};
use sdkgen_core::ir::TagFilter;
use sdkgen_core::openapi::OpenApiSpec;
use sdkgen_core::pipeline::{build_ir, derive_ir, generate};
use sdkgen_core::{Error, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Crates whose events a plain `SDKGEN_LOG=<level>` enables.
const LOG_TARGETS: [&str; 2] = ["sdkgen_core", "sdkgen_cli"];

#[derive(Parser, Debug)]
#[command(
    name = "sdkgen",
    version,
    about = "Generate API clients from an OpenAPI document"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate clients from a config file, or a single client from flags
    Generate(GenerateArgs),
    /// Load a document, build its IR and report diagnostics
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct GenerateArgs {
    /// Path to sdkgen.yaml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Generate only the named client from the config
    #[arg(long, value_name = "NAME")]
    client: Option<String>,
    /// OpenAPI document (yaml/json), used without --config
    #[arg(long, value_name = "FILE")]
    input: Option<String>,
    /// Client type: typescript, typescript-types, go or python
    #[arg(long = "type", value_name = "TYPE")]
    client_type: Option<String>,
    /// Output directory
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Package name; its last path segment names the output file
    #[arg(long)]
    package_name: Option<String>,
    /// Client class name
    #[arg(long)]
    client_name: Option<String>,
    /// Regex for tags to include (repeatable)
    #[arg(long, value_name = "PATTERN")]
    include_tags: Vec<String>,
    /// Regex for tags to exclude (repeatable)
    #[arg(long, value_name = "PATTERN")]
    exclude_tags: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct ValidateArgs {
    /// OpenAPI document (yaml/json)
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    init_tracing();
    std::process::exit(run_cli(std::env::args()));
}

fn run_cli<I: IntoIterator<Item = String>>(args: I) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Generate(args)) => report(run_generate(args)),
            Some(Commands::Validate(args)) => report(run_validate(&args)),
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

fn report(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => config_from_flags(args.clone())?,
    };

    let written = generate(&config, args.client.as_deref())?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

/// Single-client configuration when no config file is given.
fn config_from_flags(args: GenerateArgs) -> Result<Config> {
    let (Some(input), Some(client_type), Some(out_dir), Some(package_name), Some(name)) = (
        args.input,
        args.client_type,
        args.out,
        args.package_name,
        args.client_name,
    ) else {
        return Err(Error::MissingConfig(
            "without --config, --input, --type, --out, --package-name and --client-name are required".to_string(),
        ));
    };

    Config::single(
        input,
        ClientConfig {
            client_type,
            out_dir,
            package_name,
            name,
            include_tags: args.include_tags,
            exclude_tags: args.exclude_tags,
            ..ClientConfig::default()
        },
    )
}

fn run_validate(args: &ValidateArgs) -> Result<()> {
    let spec = OpenApiSpec::from_path(&args.input)?;
    let build = build_ir(&spec);
    derive_ir(&build.ir, &TagFilter::allow_all())?;

    for diagnostic in &build.diagnostics {
        println!("warning: {diagnostic}");
    }
    println!(
        "{} {}: {} services, {} operations, {} models, {} diagnostics",
        spec.info.title,
        spec.info.version,
        build.ir.services.len(),
        build.ir.operations().count(),
        build.ir.model_defs.len(),
        build.diagnostics.len()
    );
    Ok(())
}

fn init_tracing() {
    // SDKGEN_LOG controls log level: "trace", "debug", "info", "warn", "error"
    // or a full tracing filter spec like "sdkgen_core=debug"
    let filter = match std::env::var("SDKGEN_LOG") {
        Ok(level) if is_plain_level(&level) => scoped_filter(&level),
        Ok(spec) => spec,
        Err(_) => scoped_filter("info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn scoped_filter(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const PETS_YAML: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1"
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      responses:
        "200":
          description: OK
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
components:
  schemas:
    Pet:
      type: object
      properties:
        name:
          type: string
"#;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("sdkgen")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_plain_levels_are_scoped() {
        assert!(is_plain_level("DEBUG"));
        assert!(!is_plain_level("sdkgen_core=debug"));
        assert_eq!(scoped_filter("warn"), "sdkgen_core=warn,sdkgen_cli=warn");
    }

    #[test]
    fn test_flags_require_all_fallback_fields() {
        let partial = GenerateArgs {
            input: Some("api.yaml".into()),
            client_type: Some("go".into()),
            ..GenerateArgs::default()
        };
        let err = config_from_flags(partial).unwrap_err();
        assert!(err.to_string().contains("--package-name"), "{err}");
    }

    #[test]
    fn test_flags_build_single_client() {
        let cli = Cli::try_parse_from(args(&[
            "generate",
            "--input",
            "api.yaml",
            "--type",
            "python",
            "--out",
            "out",
            "--package-name",
            "pets",
            "--client-name",
            "PetsClient",
            "--include-tags",
            "^pets",
            "--include-tags",
            "store",
        ]))
        .unwrap();
        let Some(Commands::Generate(generate_args)) = cli.command else {
            unreachable!("parsed a different subcommand");
        };

        let config = config_from_flags(generate_args).unwrap();
        assert_eq!(config.spec, "api.yaml");
        let client = &config.clients[0];
        assert_eq!(client.client_type, "python");
        assert_eq!(client.include_tags, vec!["^pets", "store"]);
    }

    #[test]
    fn test_generate_from_flags_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pets.yaml");
        std::fs::write(&input, PETS_YAML).unwrap();
        let out = dir.path().join("sdk");

        let code = run_cli(args(&[
            "generate",
            "--input",
            input.to_str().unwrap(),
            "--type",
            "typescript",
            "--out",
            out.to_str().unwrap(),
            "--package-name",
            "pets",
            "--client-name",
            "PetsClient",
        ]));
        assert_eq!(code, 0);
        assert!(out.join("pets.ir.json").exists());
    }

    #[test]
    fn test_validate_and_failures_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pets.yaml");
        std::fs::write(&input, PETS_YAML).unwrap();

        assert_eq!(run_cli(args(&["validate", "--input", input.to_str().unwrap()])), 0);
        assert_eq!(run_cli(args(&["validate", "--input", "missing.yaml"])), 1);
        assert_eq!(run_cli(args(&["generate", "--type", "go"])), 1);
    }
}
