//! Type compatibility rules.

use crate::extract::TypeExtractor;
use crate::types::{VuType, VuTypeClass};

/// Whether two types may be compared with `==`/`!=` or passed for one
/// another.
///
/// `NULL` takes on the pointer level of the other side. `Void` on either
/// side matches anything of the same pointer level. Struct names are only
/// compared when `require_name` is set.
pub(crate) fn types_match(
    extractor: &TypeExtractor<'_>,
    a: &VuType,
    b: &VuType,
    require_name: bool,
) -> bool {
    let a_level = if is_null(a) { b.pointer_level } else { a.pointer_level };
    let b_level = if is_null(b) { a.pointer_level } else { b.pointer_level };
    if a_level != b_level {
        return false;
    }
    if a.class == VuTypeClass::Void || b.class == VuTypeClass::Void {
        return true;
    }
    base_types_match(extractor, a, b, require_name)
}

fn is_null(ty: &VuType) -> bool {
    ty.class == VuTypeClass::Void && ty.is_pointer()
}

fn base_types_match(
    extractor: &TypeExtractor<'_>,
    a: &VuType,
    b: &VuType,
    require_name: bool,
) -> bool {
    use VuTypeClass::*;
    match (a.class, b.class) {
        (Enum | Bitmask, Enum | Bitmask) => enum_types_match(extractor, a, b),
        (x, y) if x != y => false,
        (Struct, _) => !require_name || a.name == b.name,
        (Handle, _) => {
            a.name == b.name
                || a.name.is_empty()
                || b.name.is_empty()
                || a.name == "VK_NULL_HANDLE"
                || b.name == "VK_NULL_HANDLE"
        }
        _ => true,
    }
}

/// Enum and bitmask types match when they belong to the same `FlagBits`
/// family, or when either side is generic.
pub(crate) fn enum_types_match(extractor: &TypeExtractor<'_>, a: &VuType, b: &VuType) -> bool {
    if a.name == b.name {
        return true;
    }
    let fa = extractor.enum_family(a);
    let fb = extractor.enum_family(b);
    fa.is_empty() || fb.is_empty() || fa == fb
}

/// Whether `actual` can be passed where a predicate declares `expected`.
pub(crate) fn arg_matches(extractor: &TypeExtractor<'_>, expected: &VuType, actual: &VuType) -> bool {
    expected.class == VuTypeClass::Void || types_match(extractor, expected, actual, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vu_toolchain_registry::{ApiRegistry, Category, Entity};

    fn registry() -> ApiRegistry {
        let entity = |name: &str, category, requires: Option<&str>| Entity {
            name: name.into(),
            category,
            members: Vec::new(),
            alias_of: None,
            requires: requires.map(Into::into),
            extends: Vec::new(),
        };
        ApiRegistry::new(
            vec![
                entity("VkCullModeFlagBits", Category::Enum, None),
                entity("VkCullModeFlags", Category::Bitmask, Some("VkCullModeFlagBits")),
                entity("VkImageType", Category::Enum, None),
            ],
            BTreeMap::from([
                ("VK_CULL_MODE_FRONT_BIT".into(), "VkCullModeFlagBits".into()),
                ("VK_IMAGE_TYPE_2D".into(), "VkImageType".into()),
            ]),
            BTreeMap::new(),
            Vec::new(),
        )
    }

    #[test]
    fn null_matches_any_pointer() {
        let reg = registry();
        let ex = TypeExtractor::new(&reg, "vkCmdDraw");
        let ptr = VuType::new(VuTypeClass::Struct, "VkFoo").with_pointer(1);
        assert!(types_match(&ex, &ptr, &VuType::null(), true));
        assert!(types_match(&ex, &VuType::null(), &ptr, true));
        let ptr2 = VuType::new(VuTypeClass::Num, "char").with_pointer(2);
        assert!(types_match(&ex, &VuType::null(), &ptr2, true));
    }

    #[test]
    fn pointer_levels_must_agree() {
        let reg = registry();
        let ex = TypeExtractor::new(&reg, "vkCmdDraw");
        let ptr = VuType::new(VuTypeClass::Num, "uint32_t").with_pointer(1);
        assert!(!types_match(&ex, &ptr, &VuType::num(), true));
    }

    #[test]
    fn flag_bits_collapse_to_their_bitmask() {
        let reg = registry();
        let ex = TypeExtractor::new(&reg, "vkCmdDraw");
        let flags = VuType::new(VuTypeClass::Bitmask, "VkCullModeFlags");
        let bit = VuType::new(VuTypeClass::Enum, "VK_CULL_MODE_FRONT_BIT");
        let other = VuType::new(VuTypeClass::Enum, "VK_IMAGE_TYPE_2D");
        assert!(types_match(&ex, &flags, &bit, true));
        assert!(!types_match(&ex, &flags, &other, true));
        assert!(types_match(&ex, &flags, &VuType::bitmask(), true));
    }

    #[test]
    fn struct_names_only_checked_when_required() {
        let reg = registry();
        let ex = TypeExtractor::new(&reg, "vkCmdDraw");
        let a = VuType::struct_value("VkA");
        let b = VuType::struct_value("VkB");
        assert!(!types_match(&ex, &a, &b, true));
        assert!(types_match(&ex, &a, &b, false));
    }

    #[test]
    fn handles() {
        let reg = registry();
        let ex = TypeExtractor::new(&reg, "vkCmdDraw");
        let image = VuType::new(VuTypeClass::Handle, "VkImage");
        let buffer = VuType::new(VuTypeClass::Handle, "VkBuffer");
        let null = VuType::new(VuTypeClass::Handle, "VK_NULL_HANDLE");
        assert!(!types_match(&ex, &image, &buffer, true));
        assert!(types_match(&ex, &image, &null, true));
        assert!(arg_matches(&ex, &VuType::handle(), &image));
        assert!(arg_matches(&ex, &VuType::void(), &VuType::bool()));
    }
}
