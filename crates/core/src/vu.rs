//! One VU through the whole pipeline.
//!
//! A [`VuAst`] owns the parsed VU text and, once macros are applied, its
//! expanded AST. The raw AST is what authors wrote and is used for source
//! formatting and tag extraction; the expanded AST is what gets verified,
//! stripped and rendered for the build.

use serde::Serialize;
use vu_toolchain_diagnostics::Diagnostic;
use vu_toolchain_registry::{ApiRegistry, AvailabilityMaps, BuildConfig};

use crate::error::{MacroError, VuError};
use crate::format::{FormatStyle, format_output, format_text, format_vu};
use crate::grammar::ast::Module;
use crate::grammar::macros::{MacroMap, apply_macros_to_api_name, expand_macros};
use crate::grammar::parser::parse_vu;
use crate::grammar::source::{Origin, prepare_vu_text};
use crate::strip::{check_dead_code, strip_for_build};
use crate::tag::parameter_tag;
use crate::verify::{Verification, verify};

/// A parsed VU and its macro-expanded form.
#[derive(Debug, Clone)]
pub struct VuAst {
    text: String,
    raw: Module,
    expanded: Option<Module>,
    origin: Origin,
}

impl VuAst {
    /// Parse VU text that was already prepared (bullet and indentation
    /// removed, comments retained).
    pub fn parse(text: impl Into<String>, origin: Origin) -> Result<Self, VuError> {
        let text = text.into();
        let raw = parse_vu(&text).map_err(|e| VuError::Syntax(e.to_diagnostic(&origin)))?;
        log::debug!("parsed VU at {}:{}", origin.file, origin.line);
        Ok(Self {
            text,
            raw,
            expanded: None,
            origin,
        })
    }

    /// Prepare and parse the lines of a VU paragraph starting at document
    /// line `line`.
    pub fn from_lines<S: AsRef<str>>(
        lines: &[S],
        file: impl Into<String>,
        line: usize,
    ) -> Result<Self, VuError> {
        let prepared = prepare_vu_text(lines);
        Self::parse(prepared.text, Origin::new(file, line, prepared.indent))
    }

    /// The AST as written.
    pub fn raw(&self) -> &Module {
        &self.raw
    }

    /// The macro-expanded AST, or the raw AST if macros were not applied.
    pub fn expanded(&self) -> &Module {
        self.expanded.as_ref().unwrap_or(&self.raw)
    }

    /// Where the VU came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Substitute every `macro(name)` and re-parse.
    pub fn apply_macros(&mut self, macros: &MacroMap) -> Result<(), VuError> {
        let expansion = expand_macros(&self.text, macros)
            .map_err(|e| VuError::Macro(e.to_diagnostic(&self.origin)))?;
        let module = parse_vu(&expansion.text).map_err(|e| {
            VuError::Macro(MacroError::Parse(e).to_diagnostic(&self.origin))
        })?;
        log::debug!(
            "expanded {} macro(s) in VU at {}:{}",
            expansion.used.len(),
            self.origin.file,
            self.origin.line
        );
        self.expanded = Some(module);
        Ok(())
    }

    /// Verify the expanded AST. Fails with every error found.
    pub fn verify(&self, registry: &ApiRegistry, api: &str) -> Result<Verification, VuError> {
        let verification = verify(self.expanded(), registry, api, &self.origin);
        if verification.ok {
            Ok(verification)
        } else {
            Err(VuError::Verification(verification.issues))
        }
    }

    /// A `VU3002` warning if the expanded AST has dead code.
    pub fn dead_code_warning(&self) -> Option<Diagnostic> {
        check_dead_code(self.expanded(), &self.origin)
    }

    /// Render the raw AST. Source and Output renderings are self-checked.
    pub fn format(
        &self,
        style: FormatStyle,
        registry: &ApiRegistry,
        api: &str,
    ) -> Result<String, VuError> {
        Ok(format_vu(&self.raw, style, registry, api)?)
    }

    /// Parameter tag for a new VUID.
    pub fn parameter_tag(&self) -> String {
        parameter_tag(&self.raw)
    }
}

/// Shared, read-only state for building many VUs.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// The API registry.
    pub registry: &'a ApiRegistry,
    /// Versions and extensions of the build.
    pub config: &'a BuildConfig,
    /// Availability of features, structs and enum values.
    pub maps: &'a AvailabilityMaps,
}

/// What building one VU produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum BuildOutcome {
    /// The VU is part of the build.
    Built {
        /// Output rendering of the stripped VU.
        output: String,
        /// English rendering of the stripped VU.
        text: String,
        /// Advisory diagnostics.
        warnings: Vec<Diagnostic>,
    },
    /// Stripping removed the VU from this build.
    Eliminated {
        /// Advisory diagnostics.
        warnings: Vec<Diagnostic>,
    },
}

impl BuildOutcome {
    /// Advisory diagnostics of either outcome.
    pub fn warnings(&self) -> &[Diagnostic] {
        match self {
            BuildOutcome::Built { warnings, .. } | BuildOutcome::Eliminated { warnings } => {
                warnings
            }
        }
    }
}

/// A VU that passed expansion and verification.
#[derive(Debug, Clone, Serialize)]
pub struct CheckedVu {
    /// The documented API, with `{macro}` references resolved.
    pub api: String,
    /// Advisory diagnostics, including dead code.
    pub warnings: Vec<Diagnostic>,
}

/// Expand macros and verify one VU.
///
/// `api` may be a `{macro}` reference, resolved through `macros`.
pub fn check_vu(
    vu: &mut VuAst,
    api: &str,
    macros: &MacroMap,
    registry: &ApiRegistry,
) -> Result<CheckedVu, VuError> {
    vu.apply_macros(macros)?;
    let api = apply_macros_to_api_name(api, macros).ok_or_else(|| {
        let name = api.trim_start_matches('{').trim_end_matches('}').to_string();
        VuError::Macro(
            MacroError::Undefined {
                name,
                line: 1,
                column: 1,
            }
            .to_diagnostic(vu.origin()),
        )
    })?;
    let verification = vu.verify(registry, &api)?;
    let mut warnings: Vec<Diagnostic> = verification
        .issues
        .into_iter()
        .filter(|d| !d.is_error())
        .collect();
    warnings.extend(vu.dead_code_warning());
    log::debug!("verified VU at {}:{}", vu.origin().file, vu.origin().line);
    Ok(CheckedVu { api, warnings })
}

/// Run one VU through expansion, verification, stripping and rendering.
///
/// `api` may be a `{macro}` reference, resolved through `macros`.
pub fn build_vu(
    mut vu: VuAst,
    api: &str,
    macros: &MacroMap,
    ctx: &BuildContext<'_>,
) -> Result<BuildOutcome, VuError> {
    let CheckedVu { api, mut warnings } = check_vu(&mut vu, api, macros, ctx.registry)?;
    let stripped = strip_for_build(vu.expanded(), ctx.config, ctx.maps, vu.origin());
    warnings.extend(stripped.warnings);
    let Some(module) = stripped.module else {
        return Ok(BuildOutcome::Eliminated { warnings });
    };
    let output = format_output(&module, ctx.registry, &api)?;
    let text = format_text(&module, ctx.registry, &api);
    Ok(BuildOutcome::Built {
        output,
        text,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vu_toolchain_diagnostics::codes;
    use vu_toolchain_registry::{Category, Entity, Member};

    fn registry() -> ApiRegistry {
        ApiRegistry::new(
            vec![
                Entity {
                    name: "VkFooInfo".into(),
                    category: Category::Struct,
                    members: Vec::new(),
                    alias_of: None,
                    requires: None,
                    extends: Vec::new(),
                },
                Entity {
                    name: "vkCmdFoo".into(),
                    category: Category::Command,
                    members: vec![
                        Member {
                            name: "pInfo".into(),
                            type_name: "VkFooInfo".into(),
                            pointer: 1,
                            len: None,
                            fixed_len: None,
                        },
                        Member {
                            name: "count".into(),
                            type_name: "uint32_t".into(),
                            pointer: 0,
                            len: None,
                            fixed_len: None,
                        },
                    ],
                    alias_of: None,
                    requires: None,
                    extends: Vec::new(),
                },
            ],
            BTreeMap::new(),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    fn macros() -> MacroMap {
        MacroMap::from([
            ("refpage".to_string(), "vkCmdFoo".to_string()),
            ("infoparam".to_string(), "pname:pInfo".to_string()),
        ])
    }

    fn build(lines: &[&str], config: &BuildConfig) -> Result<BuildOutcome, VuError> {
        let reg = registry();
        let maps = AvailabilityMaps::build(&reg);
        let ctx = BuildContext {
            registry: &reg,
            config,
            maps: &maps,
        };
        let vu = VuAst::from_lines(lines, "cmd.adoc", 10)?;
        build_vu(vu, "{refpage}", &macros(), &ctx)
    }

    #[test]
    fn builds_through_macros() {
        let config = BuildConfig::new(["VK_VERSION_1_0"], Vec::<String>::new());
        let out = build(&["  * require(macro(infoparam) != NULL)"], &config).unwrap();
        let BuildOutcome::Built { output, text, warnings } = out else {
            panic!("expected a built VU");
        };
        assert!(output.contains("pname:pInfo"));
        assert_eq!(text, "* pname:pInfo must: not be `NULL`");
        assert!(warnings.is_empty());
    }

    #[test]
    fn version_gated_vu_is_eliminated() {
        let config = BuildConfig::new(["VK_VERSION_1_0"], Vec::<String>::new());
        let out = build(&["  * if is_version(1, 3):", "      require(count > 0)"], &config).unwrap();
        assert!(matches!(out, BuildOutcome::Eliminated { .. }));
    }

    #[test]
    fn errors_are_located_in_the_document() {
        let config = BuildConfig::new(["VK_VERSION_1_0"], Vec::<String>::new());
        let err = build(&["  * require(macro(missing))"], &config).unwrap_err();
        let d = &err.diagnostics()[0];
        assert_eq!(d.id, codes::MACRO_UNDEFINED);
        assert_eq!(d.location.as_ref().map(|l| l.line), Some(10));

        let err = build(&["  * require(nope == 1)"], &config).unwrap_err();
        assert!(matches!(err, VuError::Verification(_)));

        let err = VuAst::from_lines(&["  * require(count >)"], "cmd.adoc", 3).unwrap_err();
        assert_eq!(err.diagnostics()[0].id, codes::SYNTAX_ERROR);
    }

    #[test]
    fn check_resolves_the_api_and_reports_dead_code() {
        let reg = registry();
        let mut vu =
            VuAst::from_lines(&["* unused = count", "  require(count > 0)"], "cmd.adoc", 1).unwrap();
        let checked = check_vu(&mut vu, "{refpage}", &macros(), &reg).unwrap();
        assert_eq!(checked.api, "vkCmdFoo");
        assert_eq!(checked.warnings.len(), 1);
        assert_eq!(checked.warnings[0].id, codes::DEAD_CODE);

        let mut vu = VuAst::from_lines(&["* require(count > 0)"], "cmd.adoc", 1).unwrap();
        let err = check_vu(&mut vu, "{nopage}", &macros(), &reg).unwrap_err();
        assert_eq!(err.diagnostics()[0].id, codes::MACRO_UNDEFINED);
    }

    #[test]
    fn source_formatting_uses_the_raw_ast() {
        let reg = registry();
        let vu = VuAst::from_lines(&["* require(macro(infoparam)!=NULL)"], "cmd.adoc", 1).unwrap();
        assert_eq!(
            vu.format(FormatStyle::Source, &reg, "vkCmdFoo").unwrap(),
            "require(macro(infoparam) != NULL)"
        );
        assert_eq!(vu.parameter_tag(), "{infoparam}");
    }
}
