//! Mapping between host element kinds and MATLAB `mxClassID` values.
//!
//! The numeric ids are fixed by the MATLAB C API and are part of the wire
//! contract with libmx:
//!
//! ```text
//! 0 unknown   4 char     8 int8    12 int32   16 function_handle
//! 1 cell      5 void     9 uint8   13 uint32  17 opaque
//! 2 struct    6 double  10 int16   14 int64   18 object
//! 3 logical   7 single  11 uint16  15 uint64
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::{MxError, Result};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassId {
    Unknown = 0,
    Cell = 1,
    Struct = 2,
    Logical = 3,
    Char = 4,
    Void = 5,
    Double = 6,
    Single = 7,
    Int8 = 8,
    UInt8 = 9,
    Int16 = 10,
    UInt16 = 11,
    Int32 = 12,
    UInt32 = 13,
    Int64 = 14,
    UInt64 = 15,
    Function = 16,
    Opaque = 17,
    Object = 18,
}

impl ClassId {
    /// Interpret a raw `mxClassID`. Ids outside the enumeration are `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        let class = match raw {
            0 => ClassId::Unknown,
            1 => ClassId::Cell,
            2 => ClassId::Struct,
            3 => ClassId::Logical,
            4 => ClassId::Char,
            5 => ClassId::Void,
            6 => ClassId::Double,
            7 => ClassId::Single,
            8 => ClassId::Int8,
            9 => ClassId::UInt8,
            10 => ClassId::Int16,
            11 => ClassId::UInt16,
            12 => ClassId::Int32,
            13 => ClassId::UInt32,
            14 => ClassId::Int64,
            15 => ClassId::UInt64,
            16 => ClassId::Function,
            17 => ClassId::Opaque,
            18 => ClassId::Object,
            _ => return None,
        };
        Some(class)
    }

    pub fn raw(self) -> i32 {
        self as i32
    }

    /// Class name as reported by `mxGetClassName`.
    pub fn name(self) -> &'static str {
        match self {
            ClassId::Unknown => "unknown",
            ClassId::Cell => "cell",
            ClassId::Struct => "struct",
            ClassId::Logical => "logical",
            ClassId::Char => "char",
            ClassId::Void => "void",
            ClassId::Double => "double",
            ClassId::Single => "single",
            ClassId::Int8 => "int8",
            ClassId::UInt8 => "uint8",
            ClassId::Int16 => "int16",
            ClassId::UInt16 => "uint16",
            ClassId::Int32 => "int32",
            ClassId::UInt32 => "uint32",
            ClassId::Int64 => "int64",
            ClassId::UInt64 => "uint64",
            ClassId::Function => "function_handle",
            ClassId::Opaque => "opaque",
            ClassId::Object => "object",
        }
    }

    pub fn numeric(self) -> Option<NumericClass> {
        let class = match self {
            ClassId::Double => NumericClass::Double,
            ClassId::Single => NumericClass::Single,
            ClassId::Int8 => NumericClass::Int8,
            ClassId::UInt8 => NumericClass::UInt8,
            ClassId::Int16 => NumericClass::Int16,
            ClassId::UInt16 => NumericClass::UInt16,
            ClassId::Int32 => NumericClass::Int32,
            ClassId::UInt32 => NumericClass::UInt32,
            ClassId::Int64 => NumericClass::Int64,
            ClassId::UInt64 => NumericClass::UInt64,
            _ => return None,
        };
        Some(class)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The ten real numeric storage classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericClass {
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl NumericClass {
    pub fn class_id(self) -> ClassId {
        match self {
            NumericClass::Double => ClassId::Double,
            NumericClass::Single => ClassId::Single,
            NumericClass::Int8 => ClassId::Int8,
            NumericClass::UInt8 => ClassId::UInt8,
            NumericClass::Int16 => ClassId::Int16,
            NumericClass::UInt16 => ClassId::UInt16,
            NumericClass::Int32 => ClassId::Int32,
            NumericClass::UInt32 => ClassId::UInt32,
            NumericClass::Int64 => ClassId::Int64,
            NumericClass::UInt64 => ClassId::UInt64,
        }
    }

    /// Bytes per element of one real component.
    pub fn element_size(self) -> usize {
        match self {
            NumericClass::Int8 | NumericClass::UInt8 => 1,
            NumericClass::Int16 | NumericClass::UInt16 => 2,
            NumericClass::Int32 | NumericClass::UInt32 | NumericClass::Single => 4,
            NumericClass::Int64 | NumericClass::UInt64 | NumericClass::Double => 8,
        }
    }

    pub fn supports_complex(self) -> bool {
        matches!(self, NumericClass::Double | NumericClass::Single)
    }
}

/// Host-side element kind of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Text,
    /// Heterogeneous containers and anything without a fixed-width layout.
    Generic,
}

impl ElementKind {
    pub fn is_complex(self) -> bool {
        matches!(self, ElementKind::Complex64 | ElementKind::Complex128)
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Bool => "bool",
            ElementKind::Int8 => "int8",
            ElementKind::UInt8 => "uint8",
            ElementKind::Int16 => "int16",
            ElementKind::UInt16 => "uint16",
            ElementKind::Int32 => "int32",
            ElementKind::UInt32 => "uint32",
            ElementKind::Int64 => "int64",
            ElementKind::UInt64 => "uint64",
            ElementKind::Float32 => "float32",
            ElementKind::Float64 => "float64",
            ElementKind::Complex64 => "complex64",
            ElementKind::Complex128 => "complex128",
            ElementKind::Text => "text",
            ElementKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Foreign class for a host element kind. Complex kinds share the class of
/// their real component; the complex flag comes from [`ElementKind::is_complex`].
pub fn class_for_kind(kind: ElementKind) -> Result<ClassId> {
    let class = match kind {
        ElementKind::Bool => ClassId::Logical,
        ElementKind::Int8 => ClassId::Int8,
        ElementKind::UInt8 => ClassId::UInt8,
        ElementKind::Int16 => ClassId::Int16,
        ElementKind::UInt16 => ClassId::UInt16,
        ElementKind::Int32 => ClassId::Int32,
        ElementKind::UInt32 => ClassId::UInt32,
        ElementKind::Int64 => ClassId::Int64,
        ElementKind::UInt64 => ClassId::UInt64,
        ElementKind::Float32 | ElementKind::Complex64 => ClassId::Single,
        ElementKind::Float64 | ElementKind::Complex128 => ClassId::Double,
        ElementKind::Text => ClassId::Char,
        ElementKind::Generic => {
            return Err(MxError::unsupported(
                "generic element kind has no fixed-width mxArray class",
            ))
        }
    };
    Ok(class)
}

/// Host element kind for a foreign class and complex flag.
pub fn kind_for_class(class: ClassId, complex: bool) -> ElementKind {
    match (class, complex) {
        (ClassId::Logical, _) => ElementKind::Bool,
        (ClassId::Char, _) => ElementKind::Text,
        (ClassId::Double, false) => ElementKind::Float64,
        (ClassId::Double, true) => ElementKind::Complex128,
        (ClassId::Single, false) => ElementKind::Float32,
        (ClassId::Single, true) => ElementKind::Complex64,
        (ClassId::Int8, false) => ElementKind::Int8,
        (ClassId::UInt8, false) => ElementKind::UInt8,
        (ClassId::Int16, false) => ElementKind::Int16,
        (ClassId::UInt16, false) => ElementKind::UInt16,
        (ClassId::Int32, false) => ElementKind::Int32,
        (ClassId::UInt32, false) => ElementKind::UInt32,
        (ClassId::Int64, false) => ElementKind::Int64,
        (ClassId::UInt64, false) => ElementKind::UInt64,
        _ => ElementKind::Generic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMERIC_KINDS: [ElementKind; 12] = [
        ElementKind::Int8,
        ElementKind::UInt8,
        ElementKind::Int16,
        ElementKind::UInt16,
        ElementKind::Int32,
        ElementKind::UInt32,
        ElementKind::Int64,
        ElementKind::UInt64,
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::Complex64,
        ElementKind::Complex128,
    ];

    #[test]
    fn numeric_kinds_map_both_ways() {
        for kind in NUMERIC_KINDS {
            let class = class_for_kind(kind).unwrap();
            assert_eq!(kind_for_class(class, kind.is_complex()), kind, "{kind}");
        }
    }

    #[test]
    fn complex_kinds_collapse_to_float_classes() {
        assert_eq!(class_for_kind(ElementKind::Complex64).unwrap(), ClassId::Single);
        assert_eq!(class_for_kind(ElementKind::Complex128).unwrap(), ClassId::Double);
    }

    #[test]
    fn class_ids_match_wire_values() {
        assert_eq!(ClassId::Cell.raw(), 1);
        assert_eq!(ClassId::Struct.raw(), 2);
        assert_eq!(ClassId::Logical.raw(), 3);
        assert_eq!(ClassId::Char.raw(), 4);
        assert_eq!(ClassId::Double.raw(), 6);
        assert_eq!(ClassId::UInt64.raw(), 15);
        for raw in 0..=18 {
            assert_eq!(ClassId::from_raw(raw).unwrap().raw(), raw);
        }
        assert_eq!(ClassId::from_raw(42), None);
    }

    #[test]
    fn generic_kind_is_rejected() {
        assert!(matches!(
            class_for_kind(ElementKind::Generic),
            Err(MxError::UnsupportedType(_))
        ));
    }

    #[test]
    fn non_numeric_classes_are_generic() {
        assert_eq!(kind_for_class(ClassId::Cell, false), ElementKind::Generic);
        assert_eq!(kind_for_class(ClassId::Struct, false), ElementKind::Generic);
        assert_eq!(kind_for_class(ClassId::Int8, true), ElementKind::Generic);
        assert_eq!(kind_for_class(ClassId::Logical, false), ElementKind::Bool);
    }
}
