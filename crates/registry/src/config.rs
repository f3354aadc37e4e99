use crate::{ApiRegistry, InterfaceKind, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Feature names that predate the feature structs, mapped to the extension
/// that provided the same functionality.
pub const DEFAULT_LEGACY_FEATURE_ALIASES: &[(&str, &str)] = &[
    ("shaderDrawParameters", "VK_KHR_shader_draw_parameters"),
    ("drawIndirectCount", "VK_KHR_draw_indirect_count"),
    ("samplerMirrorClampToEdge", "VK_KHR_sampler_mirror_clamp_to_edge"),
    ("descriptorIndexing", "VK_EXT_descriptor_indexing"),
    ("samplerFilterMinmax", "VK_EXT_sampler_filter_minmax"),
    ("shaderOutputViewportIndex", "VK_EXT_shader_viewport_index_layer"),
    ("shaderOutputLayer", "VK_EXT_shader_viewport_index_layer"),
];

fn default_legacy_feature_aliases() -> BTreeMap<String, String> {
    DEFAULT_LEGACY_FEATURE_ALIASES
        .iter()
        .map(|(f, e)| ((*f).to_string(), (*e).to_string()))
        .collect()
}

/// The versions and extensions included in one documentation build.
///
/// Names are compared case-insensitively, so `VK_VERSION_1_1` and
/// `vk_version_1_1` are the same version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Enabled core versions (`VK_VERSION_1_0`, ...).
    #[serde(default)]
    pub versions: Vec<String>,
    /// Enabled extensions.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Legacy feature name → extension providing it.
    #[serde(default = "default_legacy_feature_aliases")]
    pub legacy_feature_aliases: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
            extensions: Vec::new(),
            legacy_feature_aliases: default_legacy_feature_aliases(),
        }
    }
}

impl BuildConfig {
    /// Build configuration from version and extension names.
    pub fn new<V, E>(versions: V, extensions: E) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            versions: versions.into_iter().map(Into::into).collect(),
            extensions: extensions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Configuration enabling every version and extension in the registry.
    pub fn all(registry: &ApiRegistry) -> Self {
        let names = |kind| {
            registry
                .interfaces
                .iter()
                .filter(move |i| i.kind == kind)
                .map(|i| i.name.clone())
        };
        Self::new(
            names(InterfaceKind::Version),
            names(InterfaceKind::Extension),
        )
    }

    /// Read a JSON build configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Whether the core version `major.minor` is enabled.
    pub fn has_version(&self, major: u64, minor: u64) -> bool {
        let name = format!("vk_version_{major}_{minor}");
        self.versions.iter().any(|v| v.eq_ignore_ascii_case(&name))
    }

    /// Whether an extension is enabled.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(name))
    }

    /// Whether a version or extension name is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.versions
            .iter()
            .chain(&self.extensions)
            .any(|v| v.eq_ignore_ascii_case(name))
    }

    /// Extension standing in for a legacy feature name.
    pub fn legacy_alias(&self, feature: &str) -> Option<&str> {
        self.legacy_feature_aliases.get(feature).map(String::as_str)
    }
}
