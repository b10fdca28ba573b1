//! Opaque handle and status types for the intercepted host API
//!
//! Handles are identity keys only. The registry never dereferences a handle's
//! numeric value; it only uses it to correlate otherwise-stateless calls.
//! Each newtype is `repr(transparent)` over a pointer-sized integer so that
//! `size_of` on the handle type matches the size of the host API's opaque
//! pointer, which the argument-classification heuristic depends on.

use std::fmt;
use std::mem;

/// Handle to a device memory buffer (`cl_mem`-shaped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BufferHandle(pub usize);

/// Handle to a program object (`cl_program`-shaped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ProgramHandle(pub usize);

/// Handle to a kernel object (`cl_kernel`-shaped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct KernelHandle(pub usize);

/// Handle to a sampler object (`cl_sampler`-shaped).
///
/// Samplers are not tracked; this type exists so the classification heuristic
/// can compare argument payload lengths against the sampler handle size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SamplerHandle(pub usize);

impl BufferHandle {
    /// Reinterpret a raw argument payload as a buffer handle value, using
    /// native byte order (the payload is the host's in-memory representation
    /// of the handle).
    ///
    /// Returns `None` unless the payload is exactly handle-sized. The caller
    /// must still confirm the resulting handle against the registry: a scalar
    /// argument can alias a live handle's bit pattern.
    pub fn from_payload(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; mem::size_of::<usize>()] = bytes.try_into().ok()?;
        Some(BufferHandle(usize::from_ne_bytes(raw)))
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::Display for ProgramHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Raw status code returned by the underlying host API implementation.
///
/// Propagated verbatim to the caller; the interceptor only inspects success
/// vs. failure to decide whether to update its shadow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct HostStatus(pub i32);

impl HostStatus {
    /// `CL_SUCCESS`
    pub const SUCCESS: HostStatus = HostStatus(0);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Buffer creation flag bitset (`cl_mem_flags`-shaped), recorded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct MemFlags(pub u64);
