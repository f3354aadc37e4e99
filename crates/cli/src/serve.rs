//! Line protocol used by the documentation build to format VUs.
//!
//! Commands arrive on stdin, one keyword per line:
//!
//! ```text
//! VERSIONS                          FORMAT-VU
//! VK_VERSION_1_0 VK_VERSION_1_1     vkCmdFoo
//! VK_KHR_swapchain                  file.adoc
//! VERSIONS-END                      42
//!                                   name$value$name$value
//!                                   <VU lines>
//!                                   FORMAT-VU-END
//! ```
//!
//! `VERSIONS` is answered with `VERSIONS-SUCCESS`. `FORMAT-VU` is answered
//! with `FORMAT-VU`, the response lines and one of `FORMAT-VU-SUCCESS`,
//! `FORMAT-VU-FAIL` or `FORMAT-VU-ELIMINATED`. `EXIT` ends the session.
//! Diagnostics go to stderr.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use vu_toolchain_core::grammar::source::is_grep_tag;
use vu_toolchain_core::{BuildContext, BuildOutcome, MacroMap, VuAst, build_vu};
use vu_toolchain_registry::{ApiRegistry, AvailabilityMaps, BuildConfig, InterfaceKind};

/// Serve requests from `input` until `EXIT` or end of input.
///
/// Every version and extension is enabled until a `VERSIONS` command
/// narrows the build.
pub(crate) fn run<R: BufRead, W: Write>(registry: &ApiRegistry, input: R, mut out: W) -> Result<()> {
    let maps = AvailabilityMaps::build(registry);
    let mut config = BuildConfig::all(registry);
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let line = line?;
        let response = match line.trim_end() {
            "EXIT" => break,
            "VERSIONS" => {
                let command = read_command(&mut lines, "VERSIONS-END")?;
                config = versions_config(registry, &command);
                log::info!(
                    "building {} version(s) and {} extension(s)",
                    config.versions.len(),
                    config.extensions.len()
                );
                vec!["VERSIONS-SUCCESS".to_string()]
            }
            "FORMAT-VU" => {
                let command = read_command(&mut lines, "FORMAT-VU-END")?;
                let ctx = BuildContext {
                    registry,
                    config: &config,
                    maps: &maps,
                };
                format_command(&command, &ctx)?
            }
            other => bail!("invalid command {other:?}"),
        };
        writeln!(out, "{}", response.join("\n"))?;
        out.flush()?;
    }
    Ok(())
}

fn read_command<I>(lines: &mut I, end: &str) -> Result<Vec<String>>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let mut command = Vec::new();
    for line in lines {
        let line = line?;
        if line.trim_end() == end {
            return Ok(command);
        }
        command.push(line.trim_end().to_string());
    }
    bail!("input ended before {end}")
}

fn versions_config(registry: &ApiRegistry, command: &[String]) -> BuildConfig {
    let (versions, extensions): (Vec<&str>, Vec<&str>) = command
        .iter()
        .flat_map(|l| l.split_whitespace())
        .partition(|name| is_version(registry, name));
    BuildConfig::new(versions, extensions)
}

fn is_version(registry: &ApiRegistry, name: &str) -> bool {
    match registry.interface(name) {
        Some(interface) => interface.kind == InterfaceKind::Version,
        None => name.to_ascii_uppercase().starts_with("VK_VERSION_"),
    }
}

/// `name$value$name$value...`
fn parse_macro_line(line: &str) -> Result<MacroMap> {
    if line.is_empty() {
        return Ok(MacroMap::new());
    }
    let parts: Vec<&str> = line.split('$').collect();
    if parts.len() % 2 != 0 {
        bail!("macro line has a name without a value: {line:?}");
    }
    Ok(parts
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}

fn respond(lines: impl IntoIterator<Item = String>, status: &str) -> Vec<String> {
    std::iter::once("FORMAT-VU".to_string())
        .chain(lines)
        .chain(std::iter::once(format!("FORMAT-VU-{status}")))
        .collect()
}

fn format_command(command: &[String], ctx: &BuildContext<'_>) -> Result<Vec<String>> {
    let [api, file, line, macros, vu_text @ ..] = command else {
        bail!("FORMAT-VU needs an API, a file, a line, macros and VU text");
    };
    if vu_text.is_empty() {
        bail!("FORMAT-VU without VU text");
    }
    let mut line: usize = line
        .trim()
        .parse()
        .with_context(|| format!("invalid line number {line:?}"))?;
    let macros = parse_macro_line(macros)?;

    let mut text = vu_text;
    if is_grep_tag(&text[0]) {
        text = &text[1..];
        line += 1;
    }

    let outcome = VuAst::from_lines(text, file.as_str(), line)
        .and_then(|vu| build_vu(vu, api, &macros, ctx));
    Ok(match outcome {
        Err(e) => {
            for d in e.diagnostics() {
                eprintln!("{d}");
            }
            respond(vu_text.iter().cloned(), "FAIL")
        }
        Ok(BuildOutcome::Eliminated { warnings }) => {
            warnings.iter().for_each(|d| eprintln!("{d}"));
            respond(Vec::new(), "ELIMINATED")
        }
        Ok(BuildOutcome::Built {
            output,
            text,
            warnings,
        }) => {
            warnings.iter().for_each(|d| eprintln!("{d}"));
            let lines = output
                .lines()
                .map(str::to_string)
                .chain(std::iter::once("FORMAT-VU-TEXT".to_string()))
                .chain(text.lines().map(str::to_string));
            respond(lines, "SUCCESS")
        }
    })
}
