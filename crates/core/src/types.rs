//! The VU type system.

use serde::Serialize;
use std::fmt;

/// Broad classification used for type matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VuTypeClass {
    /// No value, or the wildcard type of an unconstrained argument.
    Void,
    /// A truth value.
    Bool,
    /// Any numeric type.
    Num,
    /// A `Flags` bitmask.
    Bitmask,
    /// An enumerant or enum type (including `FlagBits`).
    Enum,
    /// A struct value.
    Struct,
    /// An API handle.
    Handle,
    /// The name of a struct type, as passed to `has_pnext()`.
    StructName,
    /// The name of an extension, as passed to `is_ext_enabled()`.
    ExtensionName,
    /// The name of a device feature, as passed to `is_feature_enabled()`.
    FeatureName,
}

impl fmt::Display for VuTypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VuTypeClass::Void => "void",
            VuTypeClass::Bool => "bool",
            VuTypeClass::Num => "number",
            VuTypeClass::Bitmask => "bitmask",
            VuTypeClass::Enum => "enum",
            VuTypeClass::Struct => "struct",
            VuTypeClass::Handle => "handle",
            VuTypeClass::StructName => "struct name",
            VuTypeClass::ExtensionName => "extension name",
            VuTypeClass::FeatureName => "feature name",
        };
        f.write_str(s)
    }
}

/// Length recorded for arrays whose length is not known after indexing.
pub const UNSPECIFIED_LEN: &str = "UNSPECIFIED";

/// The type of a VU expression.
///
/// `name` is the concrete API type (`VkImageType`) or empty when the class
/// alone is enough for matching. A `Struct` value always has a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VuType {
    /// Type class.
    pub class: VuTypeClass,
    /// Concrete API type name, or empty.
    pub name: String,
    /// Levels of indirection.
    pub pointer_level: u32,
    /// Array length expression, for pointers and fixed arrays.
    pub array_len: Option<String>,
}

impl VuType {
    /// A non-pointer type.
    pub fn new(class: VuTypeClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
            pointer_level: 0,
            array_len: None,
        }
    }

    /// `void`.
    pub fn void() -> Self {
        Self::new(VuTypeClass::Void, "void")
    }

    /// `bool`.
    pub fn bool() -> Self {
        Self::new(VuTypeClass::Bool, "bool")
    }

    /// `uint32_t`.
    pub fn uint() -> Self {
        Self::new(VuTypeClass::Num, "uint32_t")
    }

    /// Any number.
    pub fn num() -> Self {
        Self::new(VuTypeClass::Num, "")
    }

    /// Any bitmask.
    pub fn bitmask() -> Self {
        Self::new(VuTypeClass::Bitmask, "")
    }

    /// Any enum.
    pub fn any_enum() -> Self {
        Self::new(VuTypeClass::Enum, "")
    }

    /// Any handle.
    pub fn handle() -> Self {
        Self::new(VuTypeClass::Handle, "")
    }

    /// Any struct name.
    pub fn struct_name() -> Self {
        Self::new(VuTypeClass::StructName, "")
    }

    /// Any extension name.
    pub fn extension_name() -> Self {
        Self::new(VuTypeClass::ExtensionName, "")
    }

    /// Any feature name.
    pub fn feature_name() -> Self {
        Self::new(VuTypeClass::FeatureName, "")
    }

    /// A struct value of the given type.
    pub fn struct_value(name: impl Into<String>) -> Self {
        Self::new(VuTypeClass::Struct, name)
    }

    /// The type of `NULL`: a pointer to void.
    pub fn null() -> Self {
        Self::void().with_pointer(1)
    }

    /// Set the pointer level (builder pattern).
    pub fn with_pointer(mut self, level: u32) -> Self {
        self.pointer_level = level;
        self
    }

    /// Set the array length (builder pattern).
    pub fn with_len(mut self, len: Option<String>) -> Self {
        self.array_len = len;
        self
    }

    /// Whether the value is a pointer (or array).
    pub fn is_pointer(&self) -> bool {
        self.pointer_level > 0
    }

    /// Whether the value can be iterated or subscripted.
    pub fn is_array(&self) -> bool {
        self.pointer_level > 0 && self.array_len.is_some()
    }

    /// The type of one element of this array.
    pub fn indexed(&self) -> Self {
        let pointer_level = self.pointer_level.saturating_sub(1);
        Self {
            class: self.class,
            name: self.name.clone(),
            pointer_level,
            array_len: (pointer_level > 0).then(|| UNSPECIFIED_LEN.to_string()),
        }
    }

    /// The pointee, with every level of indirection removed.
    pub fn dereferenced(&self) -> Self {
        Self {
            class: self.class,
            name: self.name.clone(),
            pointer_level: 0,
            array_len: None,
        }
    }
}

impl fmt::Display for VuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.class)?;
        } else {
            write!(f, "{}", self.name)?;
        }
        for _ in 0..self.pointer_level {
            f.write_str("*")?;
        }
        if let Some(len) = &self.array_len {
            write!(f, "[{len}]")?;
        }
        Ok(())
    }
}
