//! Forwarding caller contract
//!
//! The core never performs a real host API call itself; it wraps one. The
//! hooking layer supplies a [`Forwarder`] that issues the genuine call and
//! hands back the native status code and, for allocation-style calls, the
//! native handle. Argument shapes mirror the real API so the forwarder can
//! pass them straight through.
//!
//! Tests substitute a mock forwarder that mints fresh handles.

use libc::{c_char, c_void};

use crate::handles::{BufferHandle, HostStatus, KernelHandle, MemFlags, ProgramHandle};

pub trait Forwarder {
    fn create_buffer(
        &mut self,
        flags: MemFlags,
        size: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus);

    fn create_program_with_source(
        &mut self,
        count: u32,
        strings: *const *const c_char,
        lengths: *const usize,
    ) -> (ProgramHandle, HostStatus);

    fn build_program(&mut self, program: ProgramHandle, options: *const c_char) -> HostStatus;

    fn create_kernel(
        &mut self,
        program: ProgramHandle,
        name: *const c_char,
    ) -> (KernelHandle, HostStatus);

    fn set_kernel_arg(
        &mut self,
        kernel: KernelHandle,
        index: u32,
        size: usize,
        value: *const c_void,
    ) -> HostStatus;

    fn enqueue_nd_range_kernel(
        &mut self,
        kernel: KernelHandle,
        work_dim: u32,
        global_offset: *const usize,
        global_size: *const usize,
        local_size: *const usize,
    ) -> HostStatus;

    // Image creation is forwarded far enough to observe whether the host
    // actually obtained an image; a successful creation is fatal upstream
    // because images are not modeled.

    fn create_image_2d(
        &mut self,
        flags: MemFlags,
        width: usize,
        height: usize,
        row_pitch: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus);

    #[allow(clippy::too_many_arguments)]
    fn create_image_3d(
        &mut self,
        flags: MemFlags,
        width: usize,
        height: usize,
        depth: usize,
        row_pitch: usize,
        slice_pitch: usize,
        host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus);
}
