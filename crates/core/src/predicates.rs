//! The closed set of VU predicates and their signatures.

use crate::types::{VuType, VuTypeClass};

/// Declared signature of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Receiver type for attribute-style predicates.
    pub object: Option<VuType>,
    /// Argument types, in order. A `Void` argument accepts anything.
    pub args: Vec<VuType>,
    /// Result type.
    pub ret: VuType,
}

impl Signature {
    fn free(args: Vec<VuType>, ret: VuType) -> Self {
        Self {
            object: None,
            args,
            ret,
        }
    }

    fn method(object: VuType, args: Vec<VuType>, ret: VuType) -> Self {
        Self {
            object: Some(object),
            args,
            ret,
        }
    }
}

/// Free-function predicates: `require(...)`, `is_version(...)`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    /// `require(cond)`: the VU's assertion.
    Require,
    /// `has_pnext(Struct)`: the subject's pNext chain includes a struct.
    HasPnext,
    /// `pnext(Struct)`: the struct in the subject's pNext chain.
    Pnext,
    /// `array_index(loopVar)`: index of the current loop element.
    ArrayIndex,
    /// `is_version(major, minor)`: the API version is at least `major.minor`.
    IsVersion,
    /// `is_ext_enabled(Ext)`: an extension is enabled.
    IsExtEnabled,
    /// `is_feature_enabled(feature)`: a device feature is enabled.
    IsFeatureEnabled,
    /// `externally_synchronized(handle)`.
    ExternallySynchronized,
    /// `macro(name)`: a textual macro reference.
    Macro,
}

impl Predicate {
    /// Every free-function predicate.
    pub const ALL: [Predicate; 9] = [
        Predicate::Require,
        Predicate::HasPnext,
        Predicate::Pnext,
        Predicate::ArrayIndex,
        Predicate::IsVersion,
        Predicate::IsExtEnabled,
        Predicate::IsFeatureEnabled,
        Predicate::ExternallySynchronized,
        Predicate::Macro,
    ];

    /// Look a predicate up by its source name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Source name.
    pub fn name(self) -> &'static str {
        match self {
            Predicate::Require => "require",
            Predicate::HasPnext => "has_pnext",
            Predicate::Pnext => "pnext",
            Predicate::ArrayIndex => "array_index",
            Predicate::IsVersion => "is_version",
            Predicate::IsExtEnabled => "is_ext_enabled",
            Predicate::IsFeatureEnabled => "is_feature_enabled",
            Predicate::ExternallySynchronized => "externally_synchronized",
            Predicate::Macro => "macro",
        }
    }

    /// Declared signature.
    pub fn signature(self) -> Signature {
        match self {
            Predicate::Require => Signature::free(vec![VuType::bool()], VuType::void()),
            Predicate::HasPnext => Signature::free(vec![VuType::struct_name()], VuType::bool()),
            Predicate::Pnext => Signature::free(
                vec![VuType::struct_name()],
                VuType::new(VuTypeClass::Struct, ""),
            ),
            Predicate::ArrayIndex => Signature::free(vec![VuType::void()], VuType::uint()),
            Predicate::IsVersion => {
                Signature::free(vec![VuType::num(), VuType::num()], VuType::bool())
            }
            Predicate::IsExtEnabled => {
                Signature::free(vec![VuType::extension_name()], VuType::bool())
            }
            Predicate::IsFeatureEnabled => {
                Signature::free(vec![VuType::feature_name()], VuType::bool())
            }
            Predicate::ExternallySynchronized => {
                Signature::free(vec![VuType::handle()], VuType::bool())
            }
            Predicate::Macro => Signature::free(vec![VuType::void()], VuType::void()),
        }
    }
}

/// Attribute-style predicates: `obj.valid()`, `flags.has_bit(...)`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrPredicate {
    /// `s.has_pnext(Struct)`.
    HasPnext,
    /// `s.pnext(Struct)`.
    Pnext,
    /// `flags.has_bit(VK_..._BIT)`.
    HasBit,
    /// `flags.any()`: at least one bit is set.
    Any,
    /// `flags.none()`: no bit is set.
    None,
    /// `handle.valid()`.
    Valid,
    /// `handle.create_info()`: the struct the handle was created with.
    CreateInfo,
    /// `pipeline.graphics_create_info()`.
    GraphicsCreateInfo,
    /// `pipeline.compute_create_info()`.
    ComputeCreateInfo,
    /// `pipeline.raytracing_create_info()`.
    RayTracingCreateInfo,
}

impl AttrPredicate {
    /// Every attribute-style predicate.
    pub const ALL: [AttrPredicate; 10] = [
        AttrPredicate::HasPnext,
        AttrPredicate::Pnext,
        AttrPredicate::HasBit,
        AttrPredicate::Any,
        AttrPredicate::None,
        AttrPredicate::Valid,
        AttrPredicate::CreateInfo,
        AttrPredicate::GraphicsCreateInfo,
        AttrPredicate::ComputeCreateInfo,
        AttrPredicate::RayTracingCreateInfo,
    ];

    /// Look a predicate up by its attribute name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Attribute name.
    pub fn name(self) -> &'static str {
        match self {
            AttrPredicate::HasPnext => "has_pnext",
            AttrPredicate::Pnext => "pnext",
            AttrPredicate::HasBit => "has_bit",
            AttrPredicate::Any => "any",
            AttrPredicate::None => "none",
            AttrPredicate::Valid => "valid",
            AttrPredicate::CreateInfo => "create_info",
            AttrPredicate::GraphicsCreateInfo => "graphics_create_info",
            AttrPredicate::ComputeCreateInfo => "compute_create_info",
            AttrPredicate::RayTracingCreateInfo => "raytracing_create_info",
        }
    }

    /// Declared signature, including the receiver type.
    pub fn signature(self) -> Signature {
        let any_struct = || VuType::new(VuTypeClass::Struct, "");
        match self {
            AttrPredicate::HasPnext => {
                Signature::method(any_struct(), vec![VuType::struct_name()], VuType::bool())
            }
            AttrPredicate::Pnext => {
                Signature::method(any_struct(), vec![VuType::struct_name()], any_struct())
            }
            AttrPredicate::HasBit => {
                Signature::method(VuType::bitmask(), vec![VuType::any_enum()], VuType::bool())
            }
            AttrPredicate::Any | AttrPredicate::None => {
                Signature::method(VuType::bitmask(), Vec::new(), VuType::bool())
            }
            AttrPredicate::Valid => Signature::method(VuType::handle(), Vec::new(), VuType::bool()),
            AttrPredicate::CreateInfo
            | AttrPredicate::GraphicsCreateInfo
            | AttrPredicate::ComputeCreateInfo
            | AttrPredicate::RayTracingCreateInfo => {
                Signature::method(VuType::handle(), Vec::new(), any_struct())
            }
        }
    }

    /// Name of the struct returned when applied to `object` with the given
    /// struct-name argument. `None` for predicates that do not return structs.
    pub fn returned_struct(self, object: &str, arg: Option<&str>) -> Option<String> {
        let pipeline_variant = |kind: &str| {
            let rest = object.strip_prefix("Vk").unwrap_or(object);
            format!("Vk{kind}{rest}CreateInfo")
        };
        match self {
            AttrPredicate::Pnext => arg.map(str::to_string),
            AttrPredicate::CreateInfo => Some(format!("{object}CreateInfo")),
            AttrPredicate::GraphicsCreateInfo => Some(pipeline_variant("Graphics")),
            AttrPredicate::ComputeCreateInfo => Some(pipeline_variant("Compute")),
            AttrPredicate::RayTracingCreateInfo => Some(pipeline_variant("RayTracing")),
            _ => None,
        }
    }
}

/// Whether `name` is any predicate (free-function or attribute-style).
pub fn is_predicate_name(name: &str) -> bool {
    Predicate::from_name(name).is_some() || AttrPredicate::from_name(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_round_trips_names() {
        for p in Predicate::ALL {
            assert_eq!(Predicate::from_name(p.name()), Some(p));
        }
        for p in AttrPredicate::ALL {
            assert_eq!(AttrPredicate::from_name(p.name()), Some(p));
        }
        assert_eq!(Predicate::from_name("requires"), None);
    }

    #[test]
    fn signatures() {
        let sig = Predicate::IsVersion.signature();
        assert_eq!(sig.args.len(), 2);
        assert_eq!(sig.ret, VuType::bool());
        let sig = AttrPredicate::HasBit.signature();
        assert_eq!(sig.object.unwrap().class, VuTypeClass::Bitmask);
        assert_eq!(sig.args[0].class, VuTypeClass::Enum);
        assert_eq!(Predicate::ArrayIndex.signature().ret, VuType::uint());
    }

    #[test]
    fn returned_struct_names() {
        assert_eq!(
            AttrPredicate::CreateInfo.returned_struct("VkImage", None).as_deref(),
            Some("VkImageCreateInfo")
        );
        assert_eq!(
            AttrPredicate::GraphicsCreateInfo
                .returned_struct("VkPipeline", None)
                .as_deref(),
            Some("VkGraphicsPipelineCreateInfo")
        );
        assert_eq!(
            AttrPredicate::Pnext
                .returned_struct("VkRenderPassCreateInfo2", Some("VkRenderPassFragmentDensityMapCreateInfoEXT"))
                .as_deref(),
            Some("VkRenderPassFragmentDensityMapCreateInfoEXT")
        );
        assert_eq!(AttrPredicate::Valid.returned_struct("VkImage", None), None);
    }

    #[test]
    fn predicate_names() {
        assert!(is_predicate_name("valid"));
        assert!(is_predicate_name("require"));
        assert!(!is_predicate_name("pCreateInfo"));
    }
}
