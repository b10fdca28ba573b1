//! Interception entry points
//!
//! One entry point per intercepted host API call. Each forwards to the real
//! implementation first and mutates shadow state only when the real call
//! succeeded; a failed call propagates its status verbatim with no tracking
//! side effect. Anything else that goes wrong here is fatal: an unsupported
//! API surface, a handle the registry has never seen, or trace I/O failure
//! all terminate the process rather than produce a trace that silently omits
//! or misrepresents state.
//!
//! Pointer-carrying entry points are `unsafe`: the hooking layer owns
//! validation of the host's raw arguments and guarantees them for the
//! duration of the call.

use std::ffi::CStr;
use std::process;
use std::slice;

use libc::{c_char, c_void};
use tracing::{debug, error};

use crate::error::TraceError;
use crate::forward::Forwarder;
use crate::handles::{BufferHandle, HostStatus, KernelHandle, MemFlags, ProgramHandle};
use crate::tracer::Tracer;

/// Abort the process over an unrecoverable trace failure.
///
/// There is no degraded mode: an incomplete trace plus a crash beats a trace
/// that misrepresents what the host did.
fn fatal(err: TraceError) -> ! {
    error!("fatal: {err}");
    eprintln!("[testigo: fatal: {err}]");
    process::exit(1);
}

/// Entry points for every intercepted call, bound to one [`Tracer`] and one
/// [`Forwarder`] for the life of the process.
pub struct Interceptor<F: Forwarder> {
    forwarder: F,
    tracer: Tracer,
}

impl<F: Forwarder> Interceptor<F> {
    pub fn new(forwarder: F, tracer: Tracer) -> Self {
        Interceptor { forwarder, tracer }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn forwarder_mut(&mut self) -> &mut F {
        &mut self.forwarder
    }

    /// Close the trace log. Call once at process teardown.
    pub fn shutdown(mut self) {
        if let Err(err) = self.tracer.shutdown() {
            fatal(err);
        }
    }

    /// `clCreateBuffer`
    ///
    /// `host_ptr` is recorded as an identity only and never dereferenced, so
    /// this entry point is safe to call with any pointer value.
    pub fn create_buffer(
        &mut self,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        debug!("intercepted create_buffer");
        let (handle, status) = self.forwarder.create_buffer(flags, size, host_ptr);
        if status.is_success() {
            self.tracer
                .record_buffer_created(handle, size, host_ptr as usize, flags);
        }
        (handle, status)
    }

    /// `clCreateProgramWithSource`
    ///
    /// # Safety
    ///
    /// `strings` must point to `count` valid source pointers. `lengths` must
    /// be null or point to `count` length hints. A hint of 0 (or a null
    /// `lengths`) marks that unit NUL-terminated; a nonzero hint means exactly
    /// that many readable bytes, terminator or not.
    pub unsafe fn create_program_with_source(
        &mut self,
        count: u32,
        strings: *const *const c_char,
        lengths: *const usize,
    ) -> (ProgramHandle, HostStatus) {
        debug!("intercepted create_program_with_source");
        let (handle, status) = self
            .forwarder
            .create_program_with_source(count, strings, lengths);
        if status.is_success() {
            let sources = unsafe { decode_source_units(count, strings, lengths) };
            self.tracer.record_program_created(handle, sources);
        }
        (handle, status)
    }

    /// `clBuildProgram`
    ///
    /// # Safety
    ///
    /// `options` must be null or a valid NUL-terminated string.
    pub unsafe fn build_program(
        &mut self,
        program: ProgramHandle,
        options: *const c_char,
    ) -> HostStatus {
        debug!("intercepted build_program");
        let status = self.forwarder.build_program(program, options);
        if status.is_success() {
            let options = (!options.is_null())
                .then(|| unsafe { CStr::from_ptr(options) }.to_string_lossy().into_owned());
            if let Err(err) = self
                .tracer
                .record_program_built(program, options.as_deref())
            {
                fatal(err);
            }
        }
        status
    }

    /// `clCreateKernel`
    ///
    /// # Safety
    ///
    /// `name` must be a valid NUL-terminated string.
    pub unsafe fn create_kernel(
        &mut self,
        program: ProgramHandle,
        name: *const c_char,
    ) -> (KernelHandle, HostStatus) {
        debug!("intercepted create_kernel");
        let (handle, status) = self.forwarder.create_kernel(program, name);
        if status.is_success() {
            let entry_point = unsafe { CStr::from_ptr(name) }.to_string_lossy();
            if let Err(err) = self
                .tracer
                .record_kernel_created(handle, program, &entry_point)
            {
                fatal(err);
            }
        }
        (handle, status)
    }

    /// `clSetKernelArg`
    ///
    /// # Safety
    ///
    /// `value` must be null or point to `size` readable bytes. The bytes are
    /// copied before returning; the host may reuse or free them afterwards.
    pub unsafe fn set_kernel_arg(
        &mut self,
        kernel: KernelHandle,
        index: u32,
        size: usize,
        value: *const c_void,
    ) -> HostStatus {
        debug!("intercepted set_kernel_arg");
        let status = self.forwarder.set_kernel_arg(kernel, index, size, value);
        if status.is_success() {
            let payload = (!value.is_null())
                .then(|| unsafe { slice::from_raw_parts(value as *const u8, size) });
            if let Err(err) = self
                .tracer
                .record_argument_bound(kernel, index as usize, payload, size)
            {
                fatal(err);
            }
        }
        status
    }

    /// `clEnqueueNDRangeKernel`
    ///
    /// On success the launch is captured and encoded synchronously, before
    /// this call returns, because later calls may rebind arguments or rebuild
    /// the program.
    ///
    /// # Safety
    ///
    /// `global_size` must point to `work_dim` values; `global_offset` and
    /// `local_size` must each be null or point to `work_dim` values.
    pub unsafe fn enqueue_nd_range_kernel(
        &mut self,
        kernel: KernelHandle,
        work_dim: u32,
        global_offset: *const usize,
        global_size: *const usize,
        local_size: *const usize,
    ) -> HostStatus {
        debug!("intercepted enqueue_nd_range_kernel");
        let status = self.forwarder.enqueue_nd_range_kernel(
            kernel,
            work_dim,
            global_offset,
            global_size,
            local_size,
        );
        if status.is_success() {
            let dims = work_dim as usize;
            let global = unsafe { slice::from_raw_parts(global_size, dims) };
            let offset = (!global_offset.is_null())
                .then(|| unsafe { slice::from_raw_parts(global_offset, dims) });
            let local = (!local_size.is_null())
                .then(|| unsafe { slice::from_raw_parts(local_size, dims) });
            if let Err(err) = self
                .tracer
                .record_launch(kernel, work_dim, offset, global, local)
            {
                fatal(err);
            }
        }
        status
    }

    /// `clCreateSubBuffer`: deliberately unmodeled, fatal on any attempt.
    pub fn create_sub_buffer(&mut self) -> ! {
        debug!("intercepted create_sub_buffer");
        fatal(TraceError::Unsupported("clCreateSubBuffer"));
    }

    /// `clCreateImage2D`: forwarded, then fatal if the host actually
    /// obtained an image; a failed creation propagates like any host failure.
    pub fn create_image_2d(
        &mut self,
        flags: MemFlags,
        width: usize,
        height: usize,
        row_pitch: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        debug!("intercepted create_image_2d");
        let (image, status) = self
            .forwarder
            .create_image_2d(flags, width, height, row_pitch, host_ptr);
        if status.is_success() {
            fatal(TraceError::Unsupported("clCreateImage2D"));
        }
        (image, status)
    }

    /// `clCreateImage3D`: same fail-fast policy as 2D images.
    #[allow(clippy::too_many_arguments)]
    pub fn create_image_3d(
        &mut self,
        flags: MemFlags,
        width: usize,
        height: usize,
        depth: usize,
        row_pitch: usize,
        slice_pitch: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        debug!("intercepted create_image_3d");
        let (image, status) = self.forwarder.create_image_3d(
            flags,
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
            host_ptr,
        );
        if status.is_success() {
            fatal(TraceError::Unsupported("clCreateImage3D"));
        }
        (image, status)
    }

    /// `clCreateSampler`: deliberately unmodeled, fatal on any attempt.
    pub fn create_sampler(&mut self) -> ! {
        debug!("intercepted create_sampler");
        fatal(TraceError::Unsupported("clCreateSampler"));
    }

    /// `clCreateKernelsInProgram`: deliberately unmodeled, fatal on any
    /// attempt (kernels created this way would bypass entry-point tracking).
    pub fn create_kernels_in_program(&mut self) -> ! {
        debug!("intercepted create_kernels_in_program");
        fatal(TraceError::Unsupported("clCreateKernelsInProgram"));
    }
}

/// Decode the creation call's source units per its length hints.
///
/// # Safety
///
/// Same contract as [`Interceptor::create_program_with_source`].
pub(crate) unsafe fn decode_source_units(
    count: u32,
    strings: *const *const c_char,
    lengths: *const usize,
) -> Vec<Vec<u8>> {
    if count == 0 {
        return Vec::new();
    }
    let pointers = unsafe { slice::from_raw_parts(strings, count as usize) };
    let hints = (!lengths.is_null())
        .then(|| unsafe { slice::from_raw_parts(lengths, count as usize) });

    pointers
        .iter()
        .enumerate()
        .map(|(i, &ptr)| {
            let hint = hints.map_or(0, |h| h[i]);
            if hint == 0 {
                // NUL-terminated; the terminator itself is not stored
                unsafe { CStr::from_ptr(ptr) }.to_bytes().to_vec()
            } else {
                // Exactly `hint` bytes, embedded terminators and all
                unsafe { slice::from_raw_parts(ptr as *const u8, hint) }.to_vec()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    #[test]
    fn test_decode_null_lengths_means_all_nul_terminated() {
        let a = CString::new("first").unwrap();
        let b = CString::new("second").unwrap();
        let pointers = [a.as_ptr(), b.as_ptr()];

        let units = unsafe { decode_source_units(2, pointers.as_ptr(), ptr::null()) };
        assert_eq!(units, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_decode_nonzero_length_takes_exact_bytes_past_terminator() {
        // Embedded NUL: an explicit length must preserve it and keep reading
        let bytes: &[u8] = b"ab\0cd";
        let pointers = [bytes.as_ptr() as *const c_char];
        let hints = [5usize];

        let units = unsafe { decode_source_units(1, pointers.as_ptr(), hints.as_ptr()) };
        assert_eq!(units, vec![b"ab\0cd".to_vec()]);
    }

    #[test]
    fn test_decode_zero_length_hint_falls_back_to_terminator() {
        let a = CString::new("terminated").unwrap();
        let pointers = [a.as_ptr()];
        let hints = [0usize];

        let units = unsafe { decode_source_units(1, pointers.as_ptr(), hints.as_ptr()) };
        assert_eq!(units, vec![b"terminated".to_vec()]);
    }

    #[test]
    fn test_decode_zero_count() {
        let units = unsafe { decode_source_units(0, ptr::null(), ptr::null()) };
        assert!(units.is_empty());
    }
}
