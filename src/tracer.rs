//! Launch recording pipeline
//!
//! The [`Tracer`] owns the shadow registry and the open trace log and wires
//! them together: registry mutations arrive as intercepted calls succeed, and
//! a launch triggers capture + encode + append synchronously, before the
//! intercepted call returns. Capturing immediately matters because the
//! kernel's bindings and its program's source may be mutated by later calls.
//!
//! One `Tracer` per process, constructed by the hooking layer and passed to
//! every entry point as an explicit context (no implicit global). Single
//! logical stream of control: no locking, no async dispatch, no timeouts.

use std::path::Path;

use crate::encoder;
use crate::error::Result;
use crate::handles::{BufferHandle, KernelHandle, MemFlags, ProgramHandle};
use crate::registry::Registry;
use crate::trace_log::TraceLog;

pub struct Tracer {
    registry: Registry,
    log: TraceLog,
}

impl Tracer {
    /// Claim a trace directory under `base` and open the run's log.
    pub fn create(base: impl AsRef<Path>) -> Result<Self> {
        Ok(Tracer {
            registry: Registry::new(),
            log: TraceLog::create(base)?,
        })
    }

    /// Directory holding this run's `log.json` and source dumps.
    pub fn directory(&self) -> &Path {
        self.log.directory()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_buffer_created(
        &mut self,
        handle: BufferHandle,
        size: usize,
        host_ptr: usize,
        flags: MemFlags,
    ) {
        self.registry
            .record_buffer_created(handle, size, host_ptr, flags);
    }

    pub fn record_program_created(&mut self, handle: ProgramHandle, sources: Vec<Vec<u8>>) {
        self.registry.record_program_created(handle, sources);
    }

    pub fn record_program_built(
        &mut self,
        handle: ProgramHandle,
        options: Option<&str>,
    ) -> Result<()> {
        self.registry.record_program_built(handle, options)
    }

    pub fn record_kernel_created(
        &mut self,
        handle: KernelHandle,
        program: ProgramHandle,
        entry_point: &str,
    ) -> Result<()> {
        self.registry
            .record_kernel_created(handle, program, entry_point)
    }

    pub fn record_argument_bound(
        &mut self,
        kernel: KernelHandle,
        index: usize,
        value: Option<&[u8]>,
        size: usize,
    ) -> Result<()> {
        self.registry
            .record_argument_bound(kernel, index, value, size)
    }

    /// Record a successful launch: overwrite the kernel's geometry, then
    /// immediately dump the owning program's current source and append the
    /// encoded record to the log.
    ///
    /// The source is re-read at every launch, so a program rebuilt between
    /// launches shows its new source in later records while earlier records
    /// keep their own immutable dump files.
    pub fn record_launch(
        &mut self,
        kernel: KernelHandle,
        work_dim: u32,
        offset: Option<&[usize]>,
        global: &[usize],
        local: Option<&[usize]>,
    ) -> Result<()> {
        self.registry
            .record_launch_geometry(kernel, work_dim, offset, global, local)?;

        let record = self.registry.kernel(kernel)?;
        let program = self.registry.program(record.program)?;
        let kernel_file = self
            .log
            .dump_kernel_source(&record.entry_point, &program.sources)?;

        let trace = encoder::encode_launch(&self.registry, kernel, kernel_file)?;
        self.log.append(&trace)
    }

    /// Terminate the JSON array and flush the log. Idempotent; also runs from
    /// `Drop` as a backstop, but only an explicit call surfaces I/O errors.
    pub fn shutdown(&mut self) -> Result<()> {
        self.log.close()
    }
}
