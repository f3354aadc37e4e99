//! Scanning and building whole documents.

mod common;

use common::{MAPS, REGISTRY, config};
use vu_toolchain_core::{BuildContext, BuildOutcome, build_vu, codes, format_document, scan_document};

const DOC: &str = "\
// Copyright notice
:regionsparam: pname:pRegions

[open,refpage='vkCmdCopyBuffer',desc='Copy data between buffer regions',type='protos']
--
.Valid Usage
****
  * [[VUID-vkCmdCopyBuffer-pRegions-00001]]
    codified-vu
    require(macro(regionsparam) != NULL)
  * [[VUID-vkCmdCopyBuffer-srcBuffer-00002]]
    The pname:srcBuffer must: be a valid buffer
****
--

[open,refpage='vkResetQueryPool',desc='Reset queries',type='protos']
--
.Valid Usage
****
  * codified-vu
    if is_feature_enabled(hostQueryReset):
      require(queryCount > 0)
  * codified-vu
    require(nope > 0)
****
--
";

#[test]
fn builds_every_codified_vu_in_order() {
    let doc = scan_document("copies.adoc", DOC);
    assert_eq!(doc.paragraphs.len(), 3);
    let apis: Vec<_> = doc.paragraphs.iter().map(|p| p.api.as_deref()).collect();
    assert_eq!(
        apis,
        [
            Some("vkCmdCopyBuffer"),
            Some("vkResetQueryPool"),
            Some("vkResetQueryPool")
        ]
    );

    let cfg = config(&["VK_VERSION_1_0"], &[]);
    let ctx = BuildContext {
        registry: &REGISTRY,
        config: &cfg,
        maps: &MAPS,
    };
    let outcomes: Vec<_> = doc
        .paragraphs
        .iter()
        .map(|p| {
            let vu = p.parse(&doc.file)?;
            build_vu(vu, "{refpage}", &p.macros, &ctx)
        })
        .collect();

    match &outcomes[0] {
        Ok(BuildOutcome::Built { output, text, .. }) => {
            assert!(output.contains("pname:pRegions"), "{output}");
            assert_eq!(text, "* pname:pRegions must: not be `NULL`");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(outcomes[1], Ok(BuildOutcome::Eliminated { .. })));
    let err = outcomes[2].as_ref().unwrap_err();
    let d = &err.diagnostics()[0];
    assert_eq!(d.id, codes::UNKNOWN_SYMBOL);
    assert_eq!(d.location.as_ref().map(|l| (l.line, l.column)), Some((24, 13)));
}

#[test]
fn formatting_a_canonical_document_changes_nothing() {
    let doc = scan_document("copies.adoc", DOC);
    let formatted = format_document(&doc);
    assert!(formatted.diagnostics.is_empty());
    assert!(!formatted.changed, "{}", formatted.text);
    assert_eq!(formatted.text, DOC);
}
