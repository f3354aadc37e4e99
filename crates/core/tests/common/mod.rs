//! Shared test helpers for `vu_toolchain_core` integration tests.

#![allow(unreachable_pub)]

use std::sync::LazyLock;
use vu_toolchain_core::grammar::ast::Module;
use vu_toolchain_core::{Origin, VuAst, parse_vu, retain_comments, verify};
use vu_toolchain_registry::{ApiRegistry, AvailabilityMaps, BuildConfig};

/// Registry loaded once per test binary via LazyLock.
pub static REGISTRY: LazyLock<ApiRegistry> = LazyLock::new(|| {
    let path =
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/registry.json");
    ApiRegistry::load(&path).unwrap_or_else(|e| panic!("failed to load {}: {}", path.display(), e))
});

/// Availability maps derived from [`REGISTRY`].
pub static MAPS: LazyLock<AvailabilityMaps> = LazyLock::new(|| AvailabilityMaps::build(&REGISTRY));

/// Build configuration from version and extension names.
#[allow(dead_code)]
pub fn config(versions: &[&str], extensions: &[&str]) -> BuildConfig {
    BuildConfig::new(versions.iter().copied(), extensions.iter().copied())
}

/// Parse standalone VU text, keeping comments.
#[allow(dead_code)]
pub fn parse(src: &str) -> Module {
    parse_vu(&retain_comments(src)).unwrap_or_else(|e| panic!("{src}: {e}"))
}

/// Parse standalone VU text into a [`VuAst`].
#[allow(dead_code)]
pub fn vu(src: &str) -> VuAst {
    let lines: Vec<&str> = src.lines().collect();
    VuAst::from_lines(&lines, "test.adoc", 1).unwrap_or_else(|e| panic!("{src}: {e}"))
}

/// Parse and verify `src` against `api`, panicking on any error.
#[allow(dead_code)]
pub fn verified(src: &str, api: &str) -> Module {
    let module = parse(src);
    let v = verify(&module, &REGISTRY, api, &Origin::standalone("test.adoc"));
    assert!(v.ok, "{src}: {:?}", v.issues);
    module
}
