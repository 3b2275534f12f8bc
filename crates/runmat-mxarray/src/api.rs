//! The mxArray access surface used by the decoder and encoder.
//!
//! [`MxApi`] mirrors the subset of the libmx C API that marshalling needs.
//! Implementations translate each call into their concrete backend (the
//! dynamically loaded libmx, or the in-process [`MemoryApi`]).
//!
//! Ownership follows libmx: handles returned by constructors and by the
//! engine are owned by the caller and must be destroyed exactly once, while
//! handles returned by [`MxApi::cell`] and [`MxApi::field`] are borrowed from
//! their parent and are released together with it. [`OwnedArray`] ties an
//! owned handle to a scope.
//!
//! [`MemoryApi`]: crate::memory::MemoryApi

use std::fmt;

use crate::class::ClassId;
use crate::error::Result;

pub trait MxApi {
    type Handle: Copy + fmt::Debug;

    /// Dimension vector, always at least two entries.
    fn dimensions(&self, array: Self::Handle) -> Vec<usize>;
    fn number_of_elements(&self, array: Self::Handle) -> usize;
    fn element_size(&self, array: Self::Handle) -> usize;
    fn class_id(&self, array: Self::Handle) -> ClassId;
    fn class_name(&self, array: Self::Handle) -> String;
    fn is_numeric(&self, array: Self::Handle) -> bool;
    fn is_complex(&self, array: Self::Handle) -> bool;
    fn is_sparse(&self, array: Self::Handle) -> bool;

    /// Copy `out.len()` bytes from the real data buffer.
    fn read_real(&self, array: Self::Handle, out: &mut [u8]) -> Result<()>;
    /// Copy `out.len()` bytes from the imaginary data buffer.
    fn read_imag(&self, array: Self::Handle, out: &mut [u8]) -> Result<()>;
    fn write_real(&self, array: Self::Handle, data: &[u8]) -> Result<()>;
    fn write_imag(&self, array: Self::Handle, data: &[u8]) -> Result<()>;

    /// Character data as NUL-terminated UTF-8 into a buffer of `capacity`
    /// bytes. The returned bytes exclude the terminator.
    fn read_string(&self, array: Self::Handle, capacity: usize) -> Result<Vec<u8>>;

    /// Borrowed cell at a linear index, `None` for an uninitialized cell.
    fn cell(&self, array: Self::Handle, index: usize) -> Option<Self::Handle>;
    /// Move `value` into the cell at `index`. The container owns `value`
    /// afterwards, and on failure `value` has already been destroyed.
    fn set_cell(&self, array: Self::Handle, index: usize, value: Self::Handle) -> Result<()>;

    fn number_of_fields(&self, array: Self::Handle) -> Result<usize>;
    fn field_name(&self, array: Self::Handle, field: usize) -> Result<String>;
    /// Borrowed field of element `index`, `None` when uninitialized.
    fn field(&self, array: Self::Handle, index: usize, name: &str) -> Option<Self::Handle>;
    /// Move `value` into field `name` of element `index`, with the same
    /// ownership rules as [`MxApi::set_cell`].
    fn set_field(
        &self,
        array: Self::Handle,
        index: usize,
        name: &str,
        value: Self::Handle,
    ) -> Result<()>;

    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> Result<Self::Handle>;
    fn create_logical(&self, dims: &[usize]) -> Result<Self::Handle>;
    fn create_cell(&self, dims: &[usize]) -> Result<Self::Handle>;
    fn create_struct(&self, dims: &[usize], field_names: &[&str]) -> Result<Self::Handle>;
    fn create_string(&self, text: &str) -> Result<Self::Handle>;

    /// Free an owned array together with everything it contains.
    fn destroy(&self, array: Self::Handle);
}

/// Scoped owner of an mxArray handle; destroys it on drop unless ownership
/// is handed on with [`OwnedArray::into_handle`].
pub struct OwnedArray<'a, A: MxApi + ?Sized> {
    api: &'a A,
    handle: A::Handle,
}

impl<'a, A: MxApi + ?Sized> OwnedArray<'a, A> {
    pub fn new(api: &'a A, handle: A::Handle) -> Self {
        Self { api, handle }
    }

    pub fn handle(&self) -> A::Handle {
        self.handle
    }

    pub fn api(&self) -> &'a A {
        self.api
    }

    /// Release ownership without destroying the array.
    pub fn into_handle(self) -> A::Handle {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }
}

impl<A: MxApi + ?Sized> Drop for OwnedArray<'_, A> {
    fn drop(&mut self) {
        self.api.destroy(self.handle);
    }
}

impl<A: MxApi + ?Sized> fmt::Debug for OwnedArray<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedArray").field("handle", &self.handle).finish()
    }
}
