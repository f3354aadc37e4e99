//! Build-specific stripping of verified VUs.
//!
//! Stripping runs in two stages. The build stage folds `is_version`,
//! `is_ext_enabled`, `is_feature_enabled`, `has_pnext`, `has_bit` and enum
//! comparisons to constants according to the [`BuildConfig`] and
//! [`AvailabilityMaps`], propagating the constants through `and`/`or`,
//! `not`, conditionals and assigned variables. Dead code elimination then
//! removes unreferenced bindings and empty blocks until nothing changes.
//!
//! A VU that strips to nothing is excluded from the build.

mod build;
mod dce;

use serde::Serialize;
use vu_toolchain_diagnostics::{Diagnostic, codes};
use vu_toolchain_registry::{AvailabilityMaps, BuildConfig};

use crate::grammar::ast::{Module, Pos};
use crate::grammar::source::Origin;

use build::BuildStripper;

/// Result of stripping one VU for a build.
#[derive(Debug, Clone, Serialize)]
pub struct StripOutcome {
    /// The stripped VU, or `None` when it is eliminated from the build.
    pub module: Option<Module>,
    /// Advisory diagnostics, such as `require()` folding to `False`.
    pub warnings: Vec<Diagnostic>,
}

impl StripOutcome {
    /// Whether the VU was eliminated.
    pub fn is_eliminated(&self) -> bool {
        self.module.is_none()
    }
}

/// Strip a verified, macro-expanded VU for one build configuration.
pub fn strip_for_build(
    module: &Module,
    config: &BuildConfig,
    maps: &AvailabilityMaps,
    origin: &Origin,
) -> StripOutcome {
    let mut stripper = BuildStripper::new(config, maps, origin);
    let module = stripper.strip_module(module).and_then(dce::eliminate);
    if module.is_none() {
        log::debug!("VU at {}:{} eliminated from the build", origin.file, origin.line);
    }
    StripOutcome {
        module,
        warnings: stripper.warnings,
    }
}

/// Remove dead code only, without folding anything for a build.
pub fn strip_dead_code(module: &Module) -> Option<Module> {
    dce::eliminate(module.clone())
}

/// A `VU3002` warning if the VU contains code that can never matter in any
/// build: `pass`, unreferenced variables or blocks without effect.
pub fn check_dead_code(module: &Module, origin: &Origin) -> Option<Diagnostic> {
    if !dce::has_dead_code(module) {
        return None;
    }
    log::warn!("{}:{}: VU has dead code", origin.file, origin.line);
    Some(
        Diagnostic::warn(codes::DEAD_CODE, "VU has dead code")
            .at(origin.locate(Pos::new(1, 1))),
    )
}
