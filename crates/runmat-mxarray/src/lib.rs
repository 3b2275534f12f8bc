//! Structural marshalling between MATLAB `mxArray` graphs and RunMat host
//! values.
//!
//! [`decode`] walks an mxArray (numeric, logical, char, cell or struct, to
//! any nesting depth) into a [`Value`]; [`encode`] builds a fresh mxArray
//! from a [`Value`]. Both go through the [`MxApi`] trait, implemented by the
//! dynamically loaded libmx in `runmat-matlab-engine` and by the in-process
//! [`MemoryApi`] used for testing.

pub mod api;
pub mod class;
pub mod coerce;
pub mod decode;
pub mod encode;
pub mod error;
pub mod memory;
pub mod shape;
pub mod value;

pub use api::{MxApi, OwnedArray};
pub use class::{class_for_kind, kind_for_class, ClassId, ElementKind, NumericClass};
pub use decode::decode;
pub use encode::{encode, encode_json};
pub use error::{MxError, Result};
pub use memory::{MemHandle, MemStats, MemStorage, MemTree, MemoryApi};
pub use value::{
    CellArray, FieldColumn, LogicalArray, NumericArray, NumericData, StructArray, StructField,
    Value,
};
