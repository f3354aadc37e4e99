use crate::{ApiRegistry, BuildConfig};
use std::collections::{BTreeMap, BTreeSet};

/// Labels under which a symbol is introduced.
///
/// A label is a version or extension name, optionally joined with `+` to the
/// names it additionally depends on (`VK_KHR_foo+VK_VERSION_1_1`).
pub type Labels = BTreeSet<String>;

/// Where each feature, struct and enum value becomes available.
///
/// Built once per registry and shared read-only by every VU compiled for a
/// build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityMaps {
    /// Feature name → labels of the feature structs declaring it.
    pub features: BTreeMap<String, Labels>,
    /// Struct name → labels.
    pub structs: BTreeMap<String, Labels>,
    /// Enum value name → labels.
    pub enum_values: BTreeMap<String, Labels>,
}

impl AvailabilityMaps {
    /// Derive the maps from the registry's `require` blocks.
    pub fn build(registry: &ApiRegistry) -> Self {
        let mut maps = Self::default();
        for interface in &registry.interfaces {
            for block in &interface.require {
                let labels = block_labels(&interface.name, block.depends.as_deref());
                for ty in &block.types {
                    let is_struct = registry
                        .lookup(ty)
                        .is_some_and(|e| e.category == crate::Category::Struct);
                    if is_struct {
                        maps.structs
                            .entry(ty.clone())
                            .or_default()
                            .extend(labels.iter().cloned());
                    }
                }
                for value in &block.enums {
                    maps.enum_values
                        .entry(value.clone())
                        .or_default()
                        .extend(labels.iter().cloned());
                }
            }
        }
        for feature_struct in registry.feature_structs() {
            let Some(labels) = maps.structs.get(&feature_struct.name).cloned() else {
                continue;
            };
            for member in &feature_struct.members {
                if member.type_name == "VkBool32" && member.pointer == 0 {
                    maps.features
                        .entry(member.name.clone())
                        .or_default()
                        .extend(labels.iter().cloned());
                }
            }
        }
        log::debug!(
            "availability maps: {} features, {} structs, {} enum values",
            maps.features.len(),
            maps.structs.len(),
            maps.enum_values.len()
        );
        maps
    }

    /// Whether any label's parts are all enabled in `config`.
    pub fn is_defined_in_build(labels: &Labels, config: &BuildConfig) -> bool {
        labels
            .iter()
            .any(|label| label.split('+').all(|part| config.is_enabled(part)))
    }

    /// Whether a feature exists in the build. Unknown features do not.
    pub fn feature_defined(&self, name: &str, config: &BuildConfig) -> bool {
        self.features
            .get(name)
            .is_some_and(|labels| Self::is_defined_in_build(labels, config))
    }

    /// Whether a struct exists in the build.
    ///
    /// Structs not introduced by any interface are assumed always present.
    pub fn struct_defined(&self, name: &str, config: &BuildConfig) -> bool {
        self.structs
            .get(name)
            .is_none_or(|labels| Self::is_defined_in_build(labels, config))
    }

    /// Whether an enum value exists in the build.
    ///
    /// Values not introduced by any interface are assumed always present.
    pub fn enum_value_defined(&self, name: &str, config: &BuildConfig) -> bool {
        self.enum_values
            .get(name)
            .is_none_or(|labels| Self::is_defined_in_build(labels, config))
    }

    /// Whether `name` is a tracked enum value.
    pub fn is_enum_value(&self, name: &str) -> bool {
        self.enum_values.contains_key(name)
    }
}

/// Expand a `require` block's dependency expression into compound labels.
fn block_labels(interface: &str, depends: Option<&str>) -> Vec<String> {
    let Some(depends) = depends.filter(|d| !d.trim().is_empty()) else {
        return vec![interface.to_string()];
    };
    DependsParser::new(depends)
        .parse()
        .into_iter()
        .map(|conj| {
            std::iter::once(interface.to_string())
                .chain(conj)
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect()
}

/// Converts `A+(B,C)` style dependency expressions into disjunctive normal
/// form: a list of alternatives, each a list of required names.
struct DependsParser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> DependsParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            text,
            pos: 0,
        }
    }

    fn parse(mut self) -> Vec<Vec<String>> {
        self.alternatives()
    }

    fn alternatives(&mut self) -> Vec<Vec<String>> {
        let mut out = self.conjunction();
        while self.eat(b',') {
            out.extend(self.conjunction());
        }
        out
    }

    fn conjunction(&mut self) -> Vec<Vec<String>> {
        let mut out = self.factor();
        while self.eat(b'+') {
            let rhs = self.factor();
            out = out
                .iter()
                .flat_map(|l| {
                    rhs.iter().map(move |r| {
                        let mut both = l.clone();
                        both.extend(r.iter().cloned());
                        both
                    })
                })
                .collect();
        }
        out
    }

    fn factor(&mut self) -> Vec<Vec<String>> {
        self.skip_ws();
        if self.eat(b'(') {
            let inner = self.alternatives();
            self.eat(b')');
            return inner;
        }
        let start = self.pos;
        while self.pos < self.src.len() && !b"+,() \t".contains(&self.src[self.pos]) {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        if name.is_empty() {
            vec![Vec::new()]
        } else {
            vec![vec![name.to_string()]]
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        self.skip_ws();
        if self.src.get(self.pos) == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiInterface, Category, Entity, InterfaceKind, Member, RequireBlock};

    #[test]
    fn labels_without_depends() {
        assert_eq!(block_labels("VK_VERSION_1_1", None), vec!["VK_VERSION_1_1"]);
        assert_eq!(block_labels("VK_VERSION_1_1", Some("  ")), vec!["VK_VERSION_1_1"]);
    }

    #[test]
    fn labels_expand_alternatives() {
        assert_eq!(
            block_labels("VK_KHR_a", Some("VK_VERSION_1_1+(VK_KHR_b,VK_KHR_c)")),
            vec![
                "VK_KHR_a+VK_VERSION_1_1+VK_KHR_b",
                "VK_KHR_a+VK_VERSION_1_1+VK_KHR_c"
            ]
        );
    }

    fn registry() -> ApiRegistry {
        let bool_member = |name: &str| Member {
            name: name.into(),
            type_name: "VkBool32".into(),
            pointer: 0,
            len: None,
            fixed_len: None,
        };
        let strukt = |name: &str, members: Vec<Member>, extends: Vec<String>| Entity {
            name: name.into(),
            category: Category::Struct,
            members,
            alias_of: None,
            requires: None,
            extends,
        };
        ApiRegistry::new(
            vec![
                strukt(
                    "VkPhysicalDeviceFeatures",
                    vec![bool_member("robustBufferAccess")],
                    vec![],
                ),
                strukt(
                    "VkPhysicalDeviceFooFeaturesEXT",
                    vec![bool_member("foo")],
                    vec!["VkPhysicalDeviceFeatures2".into()],
                ),
            ],
            BTreeMap::new(),
            BTreeMap::new(),
            vec![
                ApiInterface {
                    name: "VK_VERSION_1_0".into(),
                    kind: InterfaceKind::Version,
                    require: vec![RequireBlock {
                        depends: None,
                        types: vec!["VkPhysicalDeviceFeatures".into()],
                        enums: vec!["VK_IMAGE_TYPE_2D".into()],
                    }],
                },
                ApiInterface {
                    name: "VK_EXT_foo".into(),
                    kind: InterfaceKind::Extension,
                    require: vec![RequireBlock {
                        depends: Some("VK_VERSION_1_1".into()),
                        types: vec!["VkPhysicalDeviceFooFeaturesEXT".into()],
                        enums: vec!["VK_STRUCTURE_TYPE_FOO_EXT".into()],
                    }],
                },
            ],
        )
    }

    #[test]
    fn maps_record_compound_labels() {
        let maps = AvailabilityMaps::build(&registry());
        assert_eq!(
            maps.features["foo"],
            Labels::from(["VK_EXT_foo+VK_VERSION_1_1".to_string()])
        );
        assert_eq!(
            maps.features["robustBufferAccess"],
            Labels::from(["VK_VERSION_1_0".to_string()])
        );
        assert!(maps.is_enum_value("VK_STRUCTURE_TYPE_FOO_EXT"));
    }

    #[test]
    fn defined_requires_every_label_part() {
        let maps = AvailabilityMaps::build(&registry());
        let only_ext = BuildConfig::new(["VK_VERSION_1_0"], ["VK_EXT_foo"]);
        let both = BuildConfig::new(["VK_VERSION_1_0", "VK_VERSION_1_1"], ["VK_EXT_foo"]);
        assert!(!maps.feature_defined("foo", &only_ext));
        assert!(maps.feature_defined("foo", &both));
        assert!(!maps.struct_defined("VkPhysicalDeviceFooFeaturesEXT", &only_ext));
        assert!(maps.enum_value_defined("VK_IMAGE_TYPE_2D", &only_ext));
        assert!(!maps.enum_value_defined("VK_STRUCTURE_TYPE_FOO_EXT", &only_ext));
    }

    #[test]
    fn untracked_symbols() {
        let maps = AvailabilityMaps::build(&registry());
        let cfg = BuildConfig::new(["VK_VERSION_1_0"], Vec::<String>::new());
        assert!(!maps.feature_defined("nonexistentFeature", &cfg));
        assert!(maps.struct_defined("VkUntracked", &cfg));
        assert!(maps.enum_value_defined("VK_UNTRACKED", &cfg));
    }
}
