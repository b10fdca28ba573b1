//! Shadow object registry
//!
//! The host API is stateful but its calls are stateless: buffers, programs,
//! and kernels are created, mutated, and consumed across calls whose only
//! correlation is an opaque handle. This module maintains the shadow model of
//! that state so a launch can be reconstructed at the moment it happens.
//!
//! The registry is append-only: object destruction is never intercepted, so
//! records are never removed and the table grows for the life of the process.
//! If the host reuses a destroyed handle's numeric value for a new object, new
//! state is silently attributed to the old record. That is a known open risk,
//! not something this module tries to infer its way around.
//!
//! No internal locking: the host is assumed to drive intercepted calls from a
//! single thread. Concurrent access is undefined and out of scope.

use std::collections::HashMap;

use crate::error::{Result, TraceError};
use crate::handles::{BufferHandle, KernelHandle, MemFlags, ProgramHandle};

/// What kind of memory object a buffer record describes.
///
/// Only plain memory buffers are tracked; sub-buffers and images are rejected
/// at the interception boundary before a record could exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    MemoryBuffer,
}

/// Shadow state for one device buffer.
#[derive(Debug, Clone)]
pub struct BufferRecord {
    /// Requested allocation size in bytes.
    pub size: usize,
    /// Host pointer supplied at creation, kept as an identity only. Never
    /// dereferenced for content.
    pub host_ptr: usize,
    /// Creation flags, recorded verbatim.
    pub flags: MemFlags,
    pub kind: BufferKind,
}

/// Shadow state for one program object.
#[derive(Debug, Clone)]
pub struct ProgramRecord {
    /// Source units in their original order, each stored as raw bytes
    /// (embedded NULs are preserved when the creation call gave an explicit
    /// length).
    pub sources: Vec<Vec<u8>>,
    /// Options from the most recent successful build; empty string when the
    /// build supplied none. A rebuild overwrites, no history is kept.
    pub compile_flags: String,
}

/// One argument slot of a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgRecord {
    /// The slot was never bound; it exists only because a later index forced
    /// the argument vector to grow. Behaves like a null binding of length 0.
    Unset,
    /// Bound with a null payload: unallocated global/constant memory, or local
    /// memory sized by `size`.
    Null { size: usize },
    /// Bound with a payload. The bytes are an owned defensive copy; the caller
    /// may reuse or free its original buffer after the binding call returns.
    Value { bytes: Vec<u8> },
}

impl ArgRecord {
    /// Recorded byte length of this slot, mirroring what the binding call
    /// declared.
    pub fn recorded_len(&self) -> usize {
        match self {
            ArgRecord::Unset => 0,
            ArgRecord::Null { size } => *size,
            ArgRecord::Value { bytes } => bytes.len(),
        }
    }
}

/// Shadow state for one kernel object.
///
/// Identity fields (`program`, `entry_point`) are fixed at creation; launch
/// geometry and argument bindings are overwritten in place as later calls
/// arrive. Geometry reflects only the most recent launch.
#[derive(Debug, Clone)]
pub struct KernelRecord {
    pub program: ProgramHandle,
    pub entry_point: String,
    pub work_dim: u32,
    pub global_offset: Vec<usize>,
    pub global_size: Vec<usize>,
    pub local_size: Vec<usize>,
    /// Densified argument slots, indexed by argument position. Binding index
    /// `i` grows the vector to `i + 1`, filling gaps with [`ArgRecord::Unset`].
    pub arguments: Vec<ArgRecord>,
}

/// Process-wide mapping from opaque handles to tracked metadata.
///
/// Every operation here is invoked only after the corresponding real API call
/// reported success; nothing is recorded for failed calls.
#[derive(Debug, Default)]
pub struct Registry {
    buffers: HashMap<BufferHandle, BufferRecord>,
    programs: HashMap<ProgramHandle, ProgramRecord>,
    kernels: HashMap<KernelHandle, KernelRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful buffer allocation.
    pub fn record_buffer_created(
        &mut self,
        handle: BufferHandle,
        size: usize,
        host_ptr: usize,
        flags: MemFlags,
    ) {
        self.buffers.insert(
            handle,
            BufferRecord {
                size,
                host_ptr,
                flags,
                kind: BufferKind::MemoryBuffer,
            },
        );
    }

    /// Record a successful program creation from source.
    ///
    /// `sources` must already be decoded per the creation call's length hints
    /// (the boundary does that); the registry stores the units as given, in
    /// order.
    pub fn record_program_created(&mut self, handle: ProgramHandle, sources: Vec<Vec<u8>>) {
        self.programs.insert(
            handle,
            ProgramRecord {
                sources,
                compile_flags: String::new(),
            },
        );
    }

    /// Record a successful program build. Overwrites any prior flags.
    pub fn record_program_built(
        &mut self,
        handle: ProgramHandle,
        options: Option<&str>,
    ) -> Result<()> {
        let record = self
            .programs
            .get_mut(&handle)
            .ok_or(TraceError::UnknownProgram(handle))?;
        record.compile_flags = options.unwrap_or("").to_string();
        Ok(())
    }

    /// Record a successful kernel instantiation from a program + entry point.
    pub fn record_kernel_created(
        &mut self,
        handle: KernelHandle,
        program: ProgramHandle,
        entry_point: &str,
    ) -> Result<()> {
        if !self.programs.contains_key(&program) {
            return Err(TraceError::UnknownProgram(program));
        }
        self.kernels.insert(
            handle,
            KernelRecord {
                program,
                entry_point: entry_point.to_string(),
                work_dim: 0,
                global_offset: Vec::new(),
                global_size: Vec::new(),
                local_size: Vec::new(),
                arguments: Vec::new(),
            },
        );
        Ok(())
    }

    /// Record a successful argument binding.
    ///
    /// `value` of `None` records a null binding of the declared `size`,
    /// distinct from a zero-length payload. Rebinding an index replaces the
    /// slot wholesale; the previous owned copy is dropped here and plays no
    /// further role.
    pub fn record_argument_bound(
        &mut self,
        kernel: KernelHandle,
        index: usize,
        value: Option<&[u8]>,
        size: usize,
    ) -> Result<()> {
        let record = self
            .kernels
            .get_mut(&kernel)
            .ok_or(TraceError::UnknownKernel(kernel))?;
        if record.arguments.len() <= index {
            record.arguments.resize(index + 1, ArgRecord::Unset);
        }
        record.arguments[index] = match value {
            Some(bytes) => ArgRecord::Value {
                bytes: bytes.to_vec(),
            },
            None => ArgRecord::Null { size },
        };
        Ok(())
    }

    /// Record the geometry of a successful launch, overwriting whatever the
    /// previous launch left behind.
    ///
    /// A missing offset records zero in every dimension. A missing local size
    /// records the global size per dimension, i.e. a single work group, since
    /// the split is otherwise implementation-defined.
    pub fn record_launch_geometry(
        &mut self,
        kernel: KernelHandle,
        work_dim: u32,
        offset: Option<&[usize]>,
        global: &[usize],
        local: Option<&[usize]>,
    ) -> Result<()> {
        let record = self
            .kernels
            .get_mut(&kernel)
            .ok_or(TraceError::UnknownKernel(kernel))?;
        let dims = work_dim as usize;
        record.work_dim = work_dim;
        record.global_size = global[..dims].to_vec();
        record.global_offset = match offset {
            Some(values) => values[..dims].to_vec(),
            None => vec![0; dims],
        };
        record.local_size = match local {
            Some(values) => values[..dims].to_vec(),
            None => record.global_size.clone(),
        };
        Ok(())
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&BufferRecord> {
        self.buffers.get(&handle)
    }

    pub fn program(&self, handle: ProgramHandle) -> Result<&ProgramRecord> {
        self.programs
            .get(&handle)
            .ok_or(TraceError::UnknownProgram(handle))
    }

    pub fn kernel(&self, handle: KernelHandle) -> Result<&KernelRecord> {
        self.kernels
            .get(&handle)
            .ok_or(TraceError::UnknownKernel(handle))
    }
}
