//! API registry tables for the VU toolchain.
//!
//! Defines the data structures describing the documented API: entities
//! (structs, handles, enums, bitmasks, commands), enum values, API constants
//! and the per-version / per-extension `require` blocks that introduce them.
//! The tables are deserialized from a JSON export of the API registry and
//! consumed by the VU type extractor, the output formatter and the build
//! stripper.

#![warn(missing_docs)]

/// Symbol availability per version / extension label.
pub mod availability;
/// Build configuration: enabled versions, extensions and legacy aliases.
pub mod config;

pub use availability::AvailabilityMaps;
pub use config::BuildConfig;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::OnceLock;

/// Current format version for the registry JSON schema.
pub const REGISTRY_FORMAT_VERSION: &str = "0.1.0";

/// Struct whose boolean members are the core features.
pub const CORE_FEATURES_STRUCT: &str = "VkPhysicalDeviceFeatures";
/// Struct that feature structs extend through their `pNext` chain.
pub const FEATURES2_STRUCT: &str = "VkPhysicalDeviceFeatures2";

/// Errors raised while loading registry or build configuration files.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid registry JSON.
    #[error("invalid registry JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The registry was produced for an incompatible schema.
    #[error("unsupported registry format version {found} (expected {expected})")]
    FormatVersion {
        /// Version found in the file.
        found: String,
        /// Version this crate understands.
        expected: &'static str,
    },
}

/// Registry category of an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A structure type.
    Struct,
    /// A union type.
    Union,
    /// A dispatchable or non-dispatchable handle.
    Handle,
    /// An enumerated type (including `FlagBits` types).
    Enum,
    /// A `Flags` bitmask type.
    Bitmask,
    /// A typedef'd base type such as `VkDeviceSize`.
    Basetype,
    /// A preprocessor definition.
    Define,
    /// A function pointer type.
    Funcpointer,
    /// An API command.
    Command,
}

impl Category {
    /// Cross-reference macro used when linking a name of this category.
    pub fn link_macro(self) -> &'static str {
        match self {
            Category::Struct | Category::Union | Category::Handle => "slink",
            Category::Enum => "elink",
            Category::Bitmask | Category::Funcpointer => "tlink",
            Category::Basetype => "basetype",
            Category::Define => "dlink",
            Category::Command => "flink",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Struct => write!(f, "struct"),
            Category::Union => write!(f, "union"),
            Category::Handle => write!(f, "handle"),
            Category::Enum => write!(f, "enum"),
            Category::Bitmask => write!(f, "bitmask"),
            Category::Basetype => write!(f, "basetype"),
            Category::Define => write!(f, "define"),
            Category::Funcpointer => write!(f, "funcpointer"),
            Category::Command => write!(f, "command"),
        }
    }
}

/// Kind of API interface that introduces symbols.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    /// A core API version such as `VK_VERSION_1_1`.
    Version,
    /// An extension such as `VK_KHR_swapchain`.
    Extension,
}

/// A struct member or command parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member or parameter name.
    pub name: String,
    /// Base type name, without pointer decoration.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Number of `*` in the declaration.
    #[serde(default)]
    pub pointer: u32,
    /// Length expression for pointer arrays (`len` attribute).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<String>,
    /// Size of a fixed array member (`[VK_UUID_SIZE]`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_len: Option<String>,
}

/// A named registry entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Entity name.
    pub name: String,
    /// Registry category.
    pub category: Category,
    /// Struct members, or command parameters.
    #[serde(default, alias = "params")]
    pub members: Vec<Member>,
    /// Name of the entity this one is an alias of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    /// For bitmasks, the `FlagBits` enum supplying their bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    /// Structs whose `pNext` chain this struct may extend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
}

impl Entity {
    /// Look up a member or parameter by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A group of symbols introduced together, optionally conditional on other
/// versions or extensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequireBlock {
    /// Dependency expression: `+` joins requirements, `,` separates alternatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends: Option<String>,
    /// Types introduced by this block.
    #[serde(default)]
    pub types: Vec<String>,
    /// Enum values introduced by this block.
    #[serde(default)]
    pub enums: Vec<String>,
}

/// A core version or extension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiInterface {
    /// Interface name (`VK_VERSION_1_2`, `VK_KHR_maintenance1`).
    pub name: String,
    /// Version or extension.
    pub kind: InterfaceKind,
    /// Symbol groups this interface introduces.
    #[serde(default)]
    pub require: Vec<RequireBlock>,
}

/// Top-level container for the API registry tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRegistry {
    /// Table format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All known entities.
    pub entities: Vec<Entity>,
    /// Enum value name → defining enum name.
    #[serde(default)]
    pub enum_values: BTreeMap<String, String>,
    /// API constant name → its type (`VK_UUID_SIZE` → `uint32_t`).
    #[serde(default)]
    pub constants: BTreeMap<String, String>,
    /// Versions and extensions.
    #[serde(default)]
    pub interfaces: Vec<ApiInterface>,

    /// Cached name → index into `entities` (lazily initialized).
    #[serde(skip)]
    entity_map: OnceLock<HashMap<String, usize>>,
    /// Cached feature names (lazily initialized).
    #[serde(skip)]
    feature_set: OnceLock<BTreeSet<String>>,
}

fn default_format_version() -> String {
    REGISTRY_FORMAT_VERSION.to_string()
}

impl ApiRegistry {
    /// Create a new `ApiRegistry` with the given tables.
    /// Cache fields are initialized lazily on first access.
    pub fn new(
        entities: Vec<Entity>,
        enum_values: BTreeMap<String, String>,
        constants: BTreeMap<String, String>,
        interfaces: Vec<ApiInterface>,
    ) -> Self {
        Self {
            format_version: default_format_version(),
            entities,
            enum_values,
            constants,
            interfaces,
            entity_map: OnceLock::new(),
            feature_set: OnceLock::new(),
        }
    }

    /// Parse registry JSON and check its format version.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let registry: ApiRegistry = serde_json::from_str(json)?;
        if registry.format_version != REGISTRY_FORMAT_VERSION {
            return Err(RegistryError::FormatVersion {
                found: registry.format_version,
                expected: REGISTRY_FORMAT_VERSION,
            });
        }
        log::debug!(
            "loaded registry: {} entities, {} enum values, {} interfaces",
            registry.entities.len(),
            registry.enum_values.len(),
            registry.interfaces.len()
        );
        Ok(registry)
    }

    /// Read and parse a registry JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    fn entity_map(&self) -> &HashMap<String, usize> {
        self.entity_map.get_or_init(|| {
            self.entities
                .iter()
                .enumerate()
                .map(|(i, e)| (e.name.clone(), i))
                .collect()
        })
    }

    /// Look up an entity by its exact name, without following aliases.
    pub fn lookup(&self, name: &str) -> Option<&Entity> {
        self.entity_map().get(name).map(|&i| &self.entities[i])
    }

    /// Name of the entity `name` aliases, if it is an alias.
    pub fn is_alias(&self, name: &str) -> Option<&str> {
        self.lookup(name)?.alias_of.as_deref()
    }

    /// Look up an entity, following an alias once to its defining entity.
    pub fn resolve(&self, name: &str) -> Option<&Entity> {
        let entity = self.lookup(name)?;
        match &entity.alias_of {
            Some(target) => self.lookup(target),
            None => Some(entity),
        }
    }

    /// Enum defining the given enum value.
    pub fn enum_of_value(&self, value: &str) -> Option<&str> {
        self.enum_values.get(value).map(String::as_str)
    }

    /// Type of an API constant.
    pub fn constant_type(&self, name: &str) -> Option<&str> {
        self.constants.get(name).map(String::as_str)
    }

    /// Look up a version or extension by name.
    pub fn interface(&self, name: &str) -> Option<&ApiInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Whether `name` is an extension name.
    pub fn is_extension(&self, name: &str) -> bool {
        self.interface(name)
            .is_some_and(|i| i.kind == InterfaceKind::Extension)
    }

    /// Structs whose boolean members name device features.
    pub fn feature_structs(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| {
            e.category == Category::Struct
                && e.alias_of.is_none()
                && (e.name == CORE_FEATURES_STRUCT
                    || e.extends.iter().any(|x| x == FEATURES2_STRUCT))
        })
    }

    /// All feature names: `VkBool32` members of the feature structs.
    pub fn features(&self) -> &BTreeSet<String> {
        self.feature_set.get_or_init(|| {
            self.feature_structs()
                .flat_map(|s| s.members.iter())
                .filter(|m| m.type_name == "VkBool32" && m.pointer == 0)
                .map(|m| m.name.clone())
                .collect()
        })
    }

    /// Whether `name` is a device feature.
    pub fn is_feature(&self, name: &str) -> bool {
        self.features().contains(name)
    }

    /// Cross-reference macro for an API name, if it has one.
    pub fn link_macro(&self, name: &str) -> Option<&'static str> {
        if name == "VK_NULL_HANDLE" {
            return Some("dlink");
        }
        if self.enum_values.contains_key(name) {
            return Some("ename");
        }
        if let Some(entity) = self.lookup(name) {
            return Some(entity.category.link_macro());
        }
        if self.is_extension(name) {
            return Some("apiext");
        }
        if self.constants.contains_key(name) {
            return Some("dlink");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, ty: &str) -> Member {
        Member {
            name: name.into(),
            type_name: ty.into(),
            pointer: 0,
            len: None,
            fixed_len: None,
        }
    }

    fn entity(name: &str, category: Category) -> Entity {
        Entity {
            name: name.into(),
            category,
            members: Vec::new(),
            alias_of: None,
            requires: None,
            extends: Vec::new(),
        }
    }

    fn sample() -> ApiRegistry {
        let mut info = entity("VkRenderPassCreateInfo2", Category::Struct);
        info.members = vec![member("flags", "VkRenderPassCreateFlags")];
        let mut alias = entity("VkRenderPassCreateInfo2KHR", Category::Struct);
        alias.alias_of = Some("VkRenderPassCreateInfo2".into());
        let mut feats = entity("VkPhysicalDeviceFeatures", Category::Struct);
        feats.members = vec![
            member("robustBufferAccess", "VkBool32"),
            member("unused", "uint32_t"),
        ];
        let mut feats12 = entity("VkPhysicalDeviceVulkan12Features", Category::Struct);
        feats12.members = vec![member("drawIndirectCount", "VkBool32")];
        feats12.extends = vec![FEATURES2_STRUCT.into()];
        ApiRegistry::new(
            vec![
                info,
                alias,
                feats,
                feats12,
                entity("VkImageType", Category::Enum),
            ],
            BTreeMap::from([("VK_IMAGE_TYPE_2D".into(), "VkImageType".into())]),
            BTreeMap::from([("VK_UUID_SIZE".into(), "uint32_t".into())]),
            vec![ApiInterface {
                name: "VK_KHR_swapchain".into(),
                kind: InterfaceKind::Extension,
                require: Vec::new(),
            }],
        )
    }

    #[test]
    fn resolve_follows_alias_once() {
        let reg = sample();
        assert_eq!(
            reg.is_alias("VkRenderPassCreateInfo2KHR"),
            Some("VkRenderPassCreateInfo2")
        );
        let e = reg.resolve("VkRenderPassCreateInfo2KHR").unwrap();
        assert_eq!(e.name, "VkRenderPassCreateInfo2");
        assert!(e.member("flags").is_some());
        assert!(reg.resolve("VkNope").is_none());
    }

    #[test]
    fn features_are_bool_members_of_feature_structs() {
        let reg = sample();
        assert!(reg.is_feature("robustBufferAccess"));
        assert!(reg.is_feature("drawIndirectCount"));
        assert!(!reg.is_feature("unused"));
        assert!(!reg.is_feature("flags"));
    }

    #[test]
    fn link_macros_by_category() {
        let reg = sample();
        assert_eq!(reg.link_macro("VkRenderPassCreateInfo2"), Some("slink"));
        assert_eq!(reg.link_macro("VkImageType"), Some("elink"));
        assert_eq!(reg.link_macro("VK_IMAGE_TYPE_2D"), Some("ename"));
        assert_eq!(reg.link_macro("VK_NULL_HANDLE"), Some("dlink"));
        assert_eq!(reg.link_macro("VK_KHR_swapchain"), Some("apiext"));
        assert_eq!(reg.link_macro("VK_UUID_SIZE"), Some("dlink"));
        assert_eq!(reg.link_macro("pCreateInfo"), None);
    }

    #[test]
    fn json_params_alias_members() {
        let json = r#"{
            "formatVersion": "0.1.0",
            "entities": [
                {"name": "vkCmdDraw", "category": "command",
                 "params": [{"name": "commandBuffer", "type": "VkCommandBuffer"}]}
            ]
        }"#;
        let reg = ApiRegistry::from_json_str(json).unwrap();
        let cmd = reg.lookup("vkCmdDraw").unwrap();
        assert_eq!(cmd.category, Category::Command);
        assert_eq!(cmd.members[0].type_name, "VkCommandBuffer");
    }

    #[test]
    fn json_rejects_other_format_version() {
        let json = r#"{"formatVersion": "9.9.9", "entities": []}"#;
        let err = ApiRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::FormatVersion { .. }));
    }

    #[test]
    fn category_display() {
        assert_eq!(Category::Bitmask.to_string(), "bitmask");
        assert_eq!(Category::Command.link_macro(), "flink");
    }
}
