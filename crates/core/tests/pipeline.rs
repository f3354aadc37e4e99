//! End-to-end behaviour of one VU through parse, verify, strip and format.

mod common;

use common::{MAPS, REGISTRY, config, parse, verified, vu};
use vu_toolchain_core::grammar::ast::normalize;
use vu_toolchain_core::{
    BuildContext, BuildOutcome, FormatStyle, MacroMap, Origin, VuError, codes, format_source,
    format_vu, strip_for_build, verify,
};

fn strip_source(src: &str, api: &str, versions: &[&str], extensions: &[&str]) -> Option<String> {
    let module = verified(src, api);
    let cfg = config(versions, extensions);
    strip_for_build(&module, &cfg, &MAPS, &Origin::standalone("test.adoc"))
        .module
        .map(|m| format_source(&m))
}

#[test]
fn pointer_parameter_compared_with_null() {
    let module = verified("require(pRegions != NULL)", "vkCmdCopyBuffer");
    let output = format_vu(&module, FormatStyle::Output, &REGISTRY, "vkCmdCopyBuffer").unwrap();
    assert!(output.contains("pname:pRegions"), "{output}");

    let cfg = config(&["VK_VERSION_1_0"], &[]);
    let stripped = strip_for_build(&module, &cfg, &MAPS, &Origin::standalone("test.adoc"));
    assert!(stripped.warnings.is_empty());
    assert_eq!(stripped.module.map(|m| normalize(&m)), Some(normalize(&module)));
}

#[test]
fn feature_outside_the_build_eliminates_the_vu() {
    let src = "if is_feature_enabled(hostQueryReset):\n  require(queryCount > 0)";
    assert_eq!(strip_source(src, "vkResetQueryPool", &["VK_VERSION_1_0"], &[]), None);
    assert_eq!(
        strip_source(src, "vkResetQueryPool", &["VK_VERSION_1_0"], &["VK_EXT_host_query_reset"])
            .as_deref(),
        Some(src)
    );
}

#[test]
fn loop_over_non_array_is_rejected() {
    let module = parse("for e in regionCount:\n  require(e > 0)");
    let v = verify(
        &module,
        &REGISTRY,
        "vkCmdCopyBuffer",
        &Origin::standalone("test.adoc"),
    );
    assert!(!v.ok);
    assert_eq!(v.issues[0].id, codes::NOT_AN_ARRAY);
    assert_eq!(v.issues[0].fragment.as_deref(), Some("regionCount"));
    let loc = v.issues[0].location.as_ref().unwrap();
    assert_eq!((loc.line, loc.column), (1, 10));
}

#[test]
fn undefined_macro_is_named() {
    let mut ast = vu("require(macro(foo) != NULL)");
    let err = ast.apply_macros(&MacroMap::new()).unwrap_err();
    assert!(matches!(err, VuError::Macro(_)));
    let d = &err.diagnostics()[0];
    assert_eq!(d.id, codes::MACRO_UNDEFINED);
    assert!(d.message.contains("foo"), "{}", d.message);
}

#[test]
fn trivially_true_vus_are_eliminated() {
    let cfg = ["VK_VERSION_1_0"];
    assert_eq!(strip_source("require(True)", "vkCmdCopyBuffer", &cfg, &[]), None);
    assert_eq!(
        strip_source("require(is_version(1, 0))", "vkCmdCopyBuffer", &cfg, &[]),
        None
    );
    assert_eq!(
        strip_source("require(is_version(1, 1))", "vkCmdCopyBuffer", &cfg, &[]).as_deref(),
        Some("require(False)")
    );
}

#[test]
fn extension_checks_follow_the_build() {
    let src = "require(is_ext_enabled(VK_KHR_image_format_list) or pCreateInfo != NULL)";
    let without = strip_source(src, "vkCreateImage", &["VK_VERSION_1_0"], &[]).unwrap();
    assert!(!without.contains("is_ext_enabled"), "{without}");
    assert_eq!(without, "require(pCreateInfo != NULL)");

    let with =
        strip_source(src, "vkCreateImage", &["VK_VERSION_1_0"], &["VK_KHR_image_format_list"])
            .unwrap();
    assert!(with.contains("is_ext_enabled(VK_KHR_image_format_list)"), "{with}");
}

#[test]
fn struct_and_bit_availability() {
    let chained = "if pCreateInfo.has_pnext(VkImageFormatListCreateInfo):\n  require(pCreateInfo.mipLevels == 1)";
    assert_eq!(strip_source(chained, "vkCreateImage", &["VK_VERSION_1_0"], &[]), None);
    assert!(strip_source(chained, "vkCreateImage", &["VK_VERSION_1_2"], &[]).is_some());

    let protected = "if pCreateInfo.flags.has_bit(VK_IMAGE_CREATE_PROTECTED_BIT):\n  require(pCreateInfo.arrayLayers == 1)";
    assert_eq!(strip_source(protected, "vkCreateImage", &["VK_VERSION_1_0"], &[]), None);
    assert!(strip_source(protected, "vkCreateImage", &["VK_VERSION_1_1"], &[]).is_some());
}

#[test]
fn stripping_is_idempotent() {
    let origin = Origin::standalone("test.adoc");
    for (src, api) in [
        (
            "if is_ext_enabled(VK_EXT_host_query_reset) and is_feature_enabled(hostQueryReset):\n  require(queryCount > 0)\nelse:\n  require(firstQuery == 0)",
            "vkResetQueryPool",
        ),
        (
            "layered = is_version(1, 1)\nif layered:\n  require(pCreateInfo.arrayLayers > 0)\nrequire(pCreateInfo.mipLevels > 0)",
            "vkCreateImage",
        ),
        (
            "require(pCreateInfo.initialLayout == VK_IMAGE_LAYOUT_UNDEFINED or pCreateInfo.initialLayout == VK_IMAGE_LAYOUT_PREINITIALIZED)",
            "vkCreateImage",
        ),
        (
            "if not (queryCount == 0):\n  require(is_version(1, 0))\nelse:\n  require(firstQuery == 0)",
            "vkResetQueryPool",
        ),
        (
            "if queryCount == 0:\n  reset = is_version(1, 1)\n  require(reset)\nelse:\n  reset = firstQuery == 0\n  require(reset)",
            "vkResetQueryPool",
        ),
    ] {
        let module = verified(src, api);
        for cfg in [
            config(&["VK_VERSION_1_0"], &[]),
            config(&["VK_VERSION_1_0", "VK_VERSION_1_1"], &["VK_EXT_host_query_reset"]),
        ] {
            let once = strip_for_build(&module, &cfg, &MAPS, &origin).module;
            let twice = once
                .as_ref()
                .and_then(|m| strip_for_build(m, &cfg, &MAPS, &origin).module);
            assert_eq!(
                once.as_ref().map(normalize),
                twice.as_ref().map(normalize),
                "{src}"
            );
        }
    }
}

#[test]
fn verified_vus_round_trip_through_every_styler() {
    for (src, api) in [
        ("require(pRegions != NULL)", "vkCmdCopyBuffer"),
        (
            "for region in pRegions:\n  require(region.srcOffset != region.dstOffset or regionCount == 1)",
            "vkCmdCopyBuffer",
        ),
        ("require(srcBuffer.valid())", "vkCmdCopyBuffer"),
        ("require(externally_synchronized(commandBuffer))", "vkCmdCopyBuffer"),
        (
            "if regionCount > 1:\n  require(pRegions[0].size != pRegions[1].size)\nelse:\n  require(True)",
            "vkCmdCopyBuffer",
        ),
        (
            "# only protected images\nif pCreateInfo.flags.has_bit(VK_IMAGE_CREATE_PROTECTED_BIT):\n  require(is_version(1, 1))",
            "vkCreateImage",
        ),
        (
            "if not pCreateInfo.has_pnext(VkImageFormatListCreateInfo):\n  require(pCreateInfo.flags.none())",
            "vkCreateImage",
        ),
        (
            "require(pCreateInfo.mipLevels >= 1 and (pCreateInfo.arrayLayers == 1 or is_feature_enabled(robustBufferAccess)))",
            "vkCreateImage",
        ),
        ("require((-regionCount) ** 2 > 0)", "vkCmdCopyBuffer"),
    ] {
        let module = verified(src, api);
        for style in [FormatStyle::Source, FormatStyle::Output, FormatStyle::Text] {
            let out = format_vu(&module, style, &REGISTRY, api)
                .unwrap_or_else(|e| panic!("{src} ({style}): {e}"));
            assert!(!out.is_empty());
        }
    }
}

#[test]
fn build_pipeline_reports_advisories() {
    let cfg = config(&["VK_VERSION_1_0"], &[]);
    let ctx = BuildContext {
        registry: &REGISTRY,
        config: &cfg,
        maps: &MAPS,
    };
    let macros = MacroMap::from([("refpage".to_string(), "vkCreateImage".to_string())]);

    let out = vu_toolchain_core::build_vu(
        vu("require(pCreateInfo.mipLevels > 0 and is_version(1, 2))"),
        "{refpage}",
        &macros,
        &ctx,
    )
    .unwrap();
    let BuildOutcome::Built { output, warnings, .. } = out else {
        panic!("expected a built VU");
    };
    assert!(output.contains("False"), "{output}");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].id, codes::REQUIRE_FALSE);

    let out = vu_toolchain_core::build_vu(
        vu("unused = pCreateInfo\nrequire(pCreateInfo != NULL)"),
        "{refpage}",
        &macros,
        &ctx,
    )
    .unwrap();
    assert!(out.warnings().iter().any(|d| d.id == codes::DEAD_CODE));
}

#[test]
fn text_rendering_reads_as_prose() {
    let module = verified(
        "if pCreateInfo.flags.has_bit(VK_IMAGE_CREATE_SPARSE_BINDING_BIT):\n  require(pCreateInfo.mipLevels == 1)",
        "vkCreateImage",
    );
    let text = format_vu(&module, FormatStyle::Text, &REGISTRY, "vkCreateImage").unwrap();
    assert!(text.starts_with("* if "), "{text}");
    assert!(text.contains("ename:VK_IMAGE_CREATE_SPARSE_BINDING_BIT"), "{text}");
    assert!(text.contains("must: be equal to"), "{text}");
}
