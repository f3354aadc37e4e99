//! Resolves VU symbols against the API registry.

use vu_toolchain_registry::{ApiRegistry, Category, Member};

use crate::types::{VuType, VuTypeClass};

/// C and API scalar types that behave as numbers.
const NUMERIC_TYPES: &[&str] = &[
    "char",
    "float",
    "double",
    "int8_t",
    "uint8_t",
    "int16_t",
    "uint16_t",
    "int32_t",
    "uint32_t",
    "int64_t",
    "uint64_t",
    "size_t",
    "int",
    "VkBool32",
    "VkDeviceSize",
    "VkDeviceAddress",
];

/// Types that are bitmasks without a dedicated `FlagBits` enum.
const GENERIC_BITMASKS: &[&str] = &["VkSampleMask", "VkFlags", "VkFlags64"];

/// Subject whose members are looked up on a different struct.
const SUBJECT_REDIRECTS: &[(&str, &str, &str)] = &[(
    "VkPipelineCreateInfo",
    "flags",
    "VkGraphicsPipelineCreateInfo",
)];

/// Assigns [`VuType`]s to names: sentinels, members or parameters of the
/// documented API (the "subject"), and bare API tokens.
#[derive(Debug, Clone, Copy)]
pub struct TypeExtractor<'r> {
    registry: &'r ApiRegistry,
    api: &'r str,
}

impl<'r> TypeExtractor<'r> {
    /// Create an extractor for VUs documenting `api`.
    pub fn new(registry: &'r ApiRegistry, api: &'r str) -> Self {
        Self { registry, api }
    }

    /// The documented API.
    pub fn api(&self) -> &'r str {
        self.api
    }

    /// The registry symbols are resolved against.
    pub fn registry(&self) -> &'r ApiRegistry {
        self.registry
    }

    /// Type of a bare identifier, or `None` if it is unknown.
    pub fn symbol_type(&self, name: &str) -> Option<VuType> {
        match name {
            "NULL" => return Some(VuType::null()),
            "VK_NULL_HANDLE" => return Some(VuType::new(VuTypeClass::Handle, "VK_NULL_HANDLE")),
            _ => {}
        }
        self.member_type(self.api, name)
            .or_else(|| self.api_type(name))
    }

    /// Whether `name` is a member or parameter of the documented API.
    pub fn is_subject_symbol(&self, name: &str) -> bool {
        self.find_member(self.api, name).is_some()
    }

    /// Whether `name` is a sentinel or API token (not a subject member).
    pub fn is_api_token(&self, name: &str) -> bool {
        matches!(name, "NULL" | "VK_NULL_HANDLE") || self.api_type(name).is_some()
    }

    fn find_member(&self, entity: &str, member: &str) -> Option<&'r Member> {
        let entity = SUBJECT_REDIRECTS
            .iter()
            .find(|(subject, m, _)| *subject == entity && *m == member)
            .map_or(entity, |(_, _, target)| *target);
        self.registry
            .lookup(entity)
            .and_then(|e| e.member(member))
            .or_else(|| self.registry.resolve(entity)?.member(member))
    }

    /// Type of `member` of struct or command `entity`.
    pub fn member_type(&self, entity: &str, member: &str) -> Option<VuType> {
        let m = self.find_member(entity, member)?;
        let mut ty = match self.api_type(&m.type_name) {
            Some(t) if t.class == VuTypeClass::StructName => {
                VuType::struct_value(t.name)
            }
            Some(t) => t,
            None => {
                log::debug!(
                    "member {entity}.{member} has unclassified type {}",
                    m.type_name
                );
                VuType::new(VuTypeClass::Void, m.type_name.clone())
            }
        };
        ty.pointer_level = m.pointer;
        ty.array_len = m.len.clone();
        if let Some(fixed) = &m.fixed_len {
            ty.pointer_level += 1;
            ty.array_len = Some(fixed.clone());
        }
        Some(ty)
    }

    /// Classify a bare API token.
    pub fn api_type(&self, name: &str) -> Option<VuType> {
        if name == "void" {
            return Some(VuType::void());
        }
        if NUMERIC_TYPES.contains(&name) {
            return Some(VuType::new(VuTypeClass::Num, name));
        }
        if GENERIC_BITMASKS.contains(&name) {
            return Some(VuType::new(VuTypeClass::Bitmask, name));
        }
        if self.registry.enum_of_value(name).is_some() {
            return Some(VuType::new(VuTypeClass::Enum, name));
        }
        if let Some(ty) = self.registry.constant_type(name) {
            return Some(VuType::new(VuTypeClass::Num, ty));
        }
        if let Some(entity) = self.registry.resolve(name) {
            let class = match entity.category {
                Category::Bitmask => VuTypeClass::Bitmask,
                Category::Enum => VuTypeClass::Enum,
                Category::Handle | Category::Basetype => VuTypeClass::Handle,
                Category::Struct | Category::Union => VuTypeClass::StructName,
                Category::Command => VuTypeClass::Void,
                Category::Define | Category::Funcpointer => return None,
            };
            return Some(VuType::new(class, entity.name.clone()));
        }
        if self.registry.is_extension(name) {
            return Some(VuType::new(VuTypeClass::ExtensionName, name));
        }
        if self.registry.is_feature(name) {
            return Some(VuType::new(VuTypeClass::FeatureName, name));
        }
        None
    }

    /// The enum family a bitmask or enum type belongs to: the `FlagBits`
    /// enum of a bitmask, the defining enum of an enum value, or the enum
    /// itself. Empty for generic types.
    pub fn enum_family(&self, ty: &VuType) -> String {
        if ty.name.is_empty() || GENERIC_BITMASKS.contains(&ty.name.as_str()) {
            return String::new();
        }
        let resolved = |name: &str| {
            self.registry
                .resolve(name)
                .map_or_else(|| name.to_string(), |e| e.name.clone())
        };
        match ty.class {
            VuTypeClass::Bitmask => match self
                .registry
                .resolve(&ty.name)
                .and_then(|e| e.requires.as_deref())
            {
                Some(bits) => resolved(bits),
                None => resolved(&ty.name),
            },
            VuTypeClass::Enum => match self.registry.enum_of_value(&ty.name) {
                Some(parent) => resolved(parent),
                None => resolved(&ty.name),
            },
            _ => ty.name.clone(),
        }
    }
}
