use super::Styler;

/// Canonical VU source, the form authors write and `vu format` rewrites.
///
/// Every [`Styler`] default is the Source rendering, so this styler adds
/// nothing of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceStyler;

impl Styler for SourceStyler {}
