mod render;
mod serve;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use vu_toolchain_core::document::REFPAGE_MACRO;
use vu_toolchain_core::grammar::source::is_grep_tag;
use vu_toolchain_core::{
    BuildContext, BuildOutcome, Diagnostic, Severity, VuParagraph, build_vu, check_vu,
    format_document, format_source, scan_document, to_pretty_json,
};
use vu_toolchain_diagnostics as diag;
use vu_toolchain_registry::{ApiRegistry, AvailabilityMaps, BuildConfig};

use crate::render::{Format, print_summary, render_diagnostics};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "vu",
    version,
    about = "VU toolchain: check, format and build codified Valid Usage statements"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// More logging on stderr (repeat for more). Overrides `VU_LOG`.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    // ── Analysis (progressive: parse → check → build) ───────────────
    /// Parse the VUs of a file and print their ASTs.
    ///
    /// FILE is an AsciiDoc document with codified VUs, or a file holding a
    /// single VU.
    Parse { file: String },

    /// Parse, expand and verify the VUs of a file.
    Check {
        file: String,
        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Strip the VUs of a file for a build and render them.
    Build {
        file: String,
        #[command(flatten)]
        registry: RegistryArgs,
        #[command(flatten)]
        config: ConfigArgs,
        /// Rendering of built VUs.
        #[arg(long, value_enum, default_value_t = BuildStyle::Output)]
        style: BuildStyle,
    },

    // ── File transformation ─────────────────────────────────────────
    /// Rewrite the VUs of a file in canonical source form.
    Format {
        file: String,
        /// Write formatted output back to the file (in-place).
        #[arg(long, short, conflicts_with = "check")]
        write: bool,
        /// Check if the file is already formatted (exit 1 if not). For CI.
        #[arg(long, conflicts_with = "write")]
        check: bool,
    },

    // ── Reference / informational ───────────────────────────────────
    /// Print the parameter tag of each VU, used to name new VUIDs.
    Tag { file: String },

    /// Explain a diagnostic ID (e.g. VU2005).
    Explain { id: String },

    /// Serve the documentation build's VU formatting protocol on
    /// stdin/stdout.
    Serve {
        #[command(flatten)]
        registry: RegistryArgs,
    },
}

#[derive(Args, Debug)]
struct RegistryArgs {
    /// Path to the API registry JSON.
    #[arg(long)]
    registry: PathBuf,
    /// API documented by VUs outside any reference page.
    #[arg(long)]
    api: Option<String>,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to a build configuration JSON. Without it and without
    /// `--version`/`--extension`, everything in the registry is built.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Enable a core version, e.g. VK_VERSION_1_1 (repeatable).
    #[arg(long = "version", value_name = "VERSION")]
    versions: Vec<String>,
    /// Enable an extension (repeatable).
    #[arg(long = "extension", value_name = "EXTENSION")]
    extensions: Vec<String>,
}

/// Rendering used by the `build` command.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum BuildStyle {
    /// Decorated markup for the built documentation.
    Output,
    /// English prose.
    Text,
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Parse { file } => cmd_parse(&file, format)?,
        Cmd::Check { file, registry } => cmd_check(&file, &registry, format)?,
        Cmd::Build {
            file,
            registry,
            config,
            style,
        } => cmd_build(&file, &registry, &config, style, format)?,
        Cmd::Format { file, write, check } => cmd_format(&file, write, check, format)?,
        Cmd::Tag { file } => cmd_tag(&file, format)?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
        Cmd::Serve { registry } => {
            let registry = load_registry(&registry.registry)?;
            serve::run(&registry, std::io::stdin().lock(), std::io::stdout().lock())?;
        }
    }

    Ok(())
}

/// `-v` flags win over `VU_LOG`; warnings are shown by default.
fn init_logging(verbose: u8) {
    let from_env = std::env::var("VU_LOG")
        .ok()
        .and_then(|v| log::LevelFilter::from_str(&v).ok());
    let level = match (verbose, from_env) {
        (0, Some(level)) => level,
        (0, None) => log::LevelFilter::Warn,
        (1, _) => log::LevelFilter::Info,
        (2, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

// ── Commands ────────────────────────────────────────────────────────────

/// What happened to one VU, as reported in JSON output.
#[derive(Debug, Serialize)]
struct VuReport<T: Serialize> {
    line: usize,
    #[serde(flatten)]
    result: T,
}

fn cmd_parse(file: &str, format: Format) -> Result<()> {
    let input = read_input(file)?;
    let mut diagnostics = Vec::new();
    let mut reports = Vec::new();

    for paragraph in vus_of(file, &input) {
        match paragraph.parse(file) {
            Ok(vu) => {
                if format == Format::Pretty {
                    println!("// {file}:{}", paragraph.vu_line());
                    println!("{}", to_pretty_json(vu.raw()));
                }
                reports.push(VuReport {
                    line: paragraph.vu_line(),
                    result: serde_json::json!({ "ast": vu.raw() }),
                });
            }
            Err(e) => diagnostics.extend(e.diagnostics()),
        }
    }

    finish(
        &input,
        file,
        &diagnostics,
        format,
        serde_json::json!({ "vus": reports, "diagnostics": diagnostics }),
    )
}

fn cmd_check(file: &str, registry_args: &RegistryArgs, format: Format) -> Result<()> {
    let input = read_input(file)?;
    let registry = load_registry(&registry_args.registry)?;
    let mut diagnostics = Vec::new();
    let mut count = 0usize;

    for paragraph in vus_of(file, &input) {
        count += 1;
        let (api, macros) = subject(&paragraph, registry_args.api.as_deref(), file)?;
        let checked = paragraph
            .parse(file)
            .and_then(|mut vu| check_vu(&mut vu, &api, &macros, &registry));
        match checked {
            Ok(checked) => diagnostics.extend(checked.warnings),
            Err(e) => diagnostics.extend(e.diagnostics()),
        }
    }

    let ok = !has_errors(&diagnostics);
    if format == Format::Pretty && ok {
        eprintln!("{count} VU(s) ok");
    }
    finish(
        &input,
        file,
        &diagnostics,
        format,
        serde_json::json!({ "ok": ok, "vus": count, "diagnostics": diagnostics }),
    )
}

fn cmd_build(
    file: &str,
    registry_args: &RegistryArgs,
    config_args: &ConfigArgs,
    style: BuildStyle,
    format: Format,
) -> Result<()> {
    let input = read_input(file)?;
    let registry = load_registry(&registry_args.registry)?;
    let config = resolve_config(config_args, &registry)?;
    let maps = AvailabilityMaps::build(&registry);
    let ctx = BuildContext {
        registry: &registry,
        config: &config,
        maps: &maps,
    };
    let mut diagnostics = Vec::new();
    let mut reports = Vec::new();

    for paragraph in vus_of(file, &input) {
        let line = paragraph.vu_line();
        let (api, macros) = subject(&paragraph, registry_args.api.as_deref(), file)?;
        let built = paragraph
            .parse(file)
            .and_then(|vu| build_vu(vu, &api, &macros, &ctx));
        let outcome = match built {
            Ok(outcome) => outcome,
            Err(e) => {
                diagnostics.extend(e.diagnostics());
                continue;
            }
        };
        diagnostics.extend(outcome.warnings().iter().cloned());
        if format == Format::Pretty {
            match &outcome {
                BuildOutcome::Built { output, text, .. } => {
                    println!("// {file}:{line}");
                    match style {
                        BuildStyle::Output => println!("{output}"),
                        BuildStyle::Text => println!("{text}"),
                    }
                }
                BuildOutcome::Eliminated { .. } => println!("// {file}:{line}: eliminated"),
            }
        }
        reports.push(VuReport {
            line,
            result: outcome,
        });
    }

    finish(
        &input,
        file,
        &diagnostics,
        format,
        serde_json::json!({ "vus": reports, "diagnostics": diagnostics }),
    )
}

fn cmd_format(file: &str, write: bool, check: bool, format: Format) -> Result<()> {
    let input = read_input(file)?;
    let doc = scan_document(file, &input);

    let (formatted, diagnostics) = if doc.paragraphs.is_empty() {
        format_standalone(file, &input)
    } else {
        let result = format_document(&doc);
        (result.text, result.diagnostics)
    };

    if !diagnostics.is_empty() {
        render_diagnostics(&input, file, &diagnostics);
        print_summary(&diagnostics);
    }

    let already_formatted = formatted == input;

    if check {
        status_message(
            format,
            already_formatted,
            "already formatted",
            "not formatted",
            file,
        )?;
        if !already_formatted {
            process::exit(1);
        }
    } else if write {
        if !already_formatted {
            fs::write(file, &formatted).with_context(|| format!("failed to write {file}"))?;
        }
        status_message(
            format,
            !already_formatted,
            "formatted",
            "already formatted",
            file,
        )?;
    } else {
        print!("{formatted}");
    }

    exit_on_errors(&diagnostics);
    Ok(())
}

/// Format a file holding one VU and nothing else. Unparsable input is
/// returned unchanged.
fn format_standalone(file: &str, input: &str) -> (String, Vec<Diagnostic>) {
    let Some(paragraph) = vus_of(file, input).pop() else {
        return (input.to_string(), Vec::new());
    };
    match paragraph.parse(file) {
        Ok(vu) => {
            let head = paragraph.lines[..paragraph.vu_start]
                .iter()
                .map(|l| format!("{l}\n"))
                .collect::<String>();
            (format!("{head}{}\n", format_source(vu.raw())), Vec::new())
        }
        Err(e) => (input.to_string(), e.diagnostics()),
    }
}

/// Emit a status message for --check / --write in the appropriate format.
fn status_message(
    format: Format,
    condition: bool,
    if_true: &str,
    if_false: &str,
    file: &str,
) -> Result<()> {
    let msg = if condition { if_true } else { if_false };
    match format {
        Format::Json => {
            let out = serde_json::json!({ "status": msg, "file": file });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => eprintln!("{msg}: {file}"),
    }
    Ok(())
}

fn cmd_tag(file: &str, format: Format) -> Result<()> {
    let input = read_input(file)?;
    let mut diagnostics = Vec::new();
    let mut reports = Vec::new();

    for paragraph in vus_of(file, &input) {
        match paragraph.parse(file) {
            Ok(vu) => {
                let tag = vu.parameter_tag();
                if format == Format::Pretty {
                    println!("{file}:{}: {tag}", paragraph.vu_line());
                }
                reports.push(VuReport {
                    line: paragraph.vu_line(),
                    result: serde_json::json!({ "tag": tag }),
                });
            }
            Err(e) => diagnostics.extend(e.diagnostics()),
        }
    }

    finish(
        &input,
        file,
        &diagnostics,
        format,
        serde_json::json!({ "vus": reports, "diagnostics": diagnostics }),
    )
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let out = serde_json::json!({
                "id": id,
                "explanation": diag::explain(id),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Format::Pretty => {
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{id}: (no explanation available)");
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn read_input(file: &str) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read {file}"))
}

fn load_registry(path: &Path) -> Result<ApiRegistry> {
    ApiRegistry::load(path).with_context(|| format!("failed to load registry {}", path.display()))
}

/// The build configuration from `--config`, extended by `--version` and
/// `--extension`.
fn resolve_config(args: &ConfigArgs, registry: &ApiRegistry) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("failed to load build configuration {}", path.display()))?,
        None if args.versions.is_empty() && args.extensions.is_empty() => {
            return Ok(BuildConfig::all(registry));
        }
        None => BuildConfig::default(),
    };
    config.versions.extend(args.versions.iter().cloned());
    config.extensions.extend(args.extensions.iter().cloned());
    Ok(config)
}

/// Codified VUs of a document, or the whole file as a single VU when it has
/// no codified paragraphs.
fn vus_of(file: &str, input: &str) -> Vec<VuParagraph> {
    let doc = scan_document(file, input);
    if !doc.paragraphs.is_empty() || input.trim().is_empty() {
        return doc.paragraphs;
    }
    let lines = doc.lines;
    let vu_start = usize::from(lines.first().is_some_and(|l| is_grep_tag(l)));
    vec![VuParagraph {
        line: 1,
        lines,
        anchor: None,
        vu_start,
        api: None,
        macros: Default::default(),
    }]
}

/// The API a VU documents and the macros it sees. `--api` fills in for VUs
/// outside any reference page.
fn subject(
    paragraph: &VuParagraph,
    fallback: Option<&str>,
    file: &str,
) -> Result<(String, vu_toolchain_core::MacroMap)> {
    let mut macros = paragraph.macros.clone();
    let api = match (&paragraph.api, fallback) {
        (Some(api), _) => api.clone(),
        (None, Some(api)) => {
            macros.insert(REFPAGE_MACRO.to_string(), api.to_string());
            api.to_string()
        }
        (None, None) => {
            return Err(anyhow!(
                "{file}:{}: VU is outside any reference page; pass --api",
                paragraph.line
            ));
        }
    };
    Ok((api, macros))
}

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| matches!(d.severity, Severity::Error))
}

/// Print the JSON result or the rendered diagnostics, then exit 1 if any
/// VU failed.
fn finish(
    input: &str,
    file: &str,
    diagnostics: &[Diagnostic],
    format: Format,
    json: serde_json::Value,
) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&json)?),
        Format::Pretty => {
            render_diagnostics(input, file, diagnostics);
            print_summary(diagnostics);
        }
    }
    exit_on_errors(diagnostics);
    Ok(())
}

/// Exit with code 1 if any diagnostic is an error.
/// Warnings and info do not cause a non-zero exit.
fn exit_on_errors(diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        process::exit(1);
    }
}
