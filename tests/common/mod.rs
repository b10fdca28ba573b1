//! Shared mock forwarder for integration tests

use libc::{c_char, c_void};

use testigo::forward::Forwarder;
use testigo::handles::{BufferHandle, HostStatus, KernelHandle, MemFlags, ProgramHandle};

/// Mock host API: mints fresh handle values and succeeds unless told not to.
pub struct MockHost {
    next_handle: usize,
    /// Status to return from the next forwarded call instead of success.
    pub fail_next: Option<HostStatus>,
}

impl Default for MockHost {
    fn default() -> Self {
        MockHost {
            // Pointer-looking values, away from small test constants
            next_handle: 0x7f00_0000,
            fail_next: None,
        }
    }
}

impl MockHost {
    fn mint(&mut self) -> usize {
        self.next_handle += 0x10;
        self.next_handle
    }

    fn status(&mut self) -> HostStatus {
        self.fail_next.take().unwrap_or(HostStatus::SUCCESS)
    }
}

impl Forwarder for MockHost {
    fn create_buffer(
        &mut self,
        _flags: MemFlags,
        _size: usize,
        _host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        (BufferHandle(self.mint()), self.status())
    }

    fn create_program_with_source(
        &mut self,
        _count: u32,
        _strings: *const *const c_char,
        _lengths: *const usize,
    ) -> (ProgramHandle, HostStatus) {
        (ProgramHandle(self.mint()), self.status())
    }

    fn build_program(&mut self, _program: ProgramHandle, _options: *const c_char) -> HostStatus {
        self.status()
    }

    fn create_kernel(
        &mut self,
        _program: ProgramHandle,
        _name: *const c_char,
    ) -> (KernelHandle, HostStatus) {
        (KernelHandle(self.mint()), self.status())
    }

    fn set_kernel_arg(
        &mut self,
        _kernel: KernelHandle,
        _index: u32,
        _size: usize,
        _value: *const c_void,
    ) -> HostStatus {
        self.status()
    }

    fn enqueue_nd_range_kernel(
        &mut self,
        _kernel: KernelHandle,
        _work_dim: u32,
        _global_offset: *const usize,
        _global_size: *const usize,
        _local_size: *const usize,
    ) -> HostStatus {
        self.status()
    }

    fn create_image_2d(
        &mut self,
        _flags: MemFlags,
        _width: usize,
        _height: usize,
        _row_pitch: usize,
        _host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        (BufferHandle(self.mint()), self.status())
    }

    fn create_image_3d(
        &mut self,
        _flags: MemFlags,
        _width: usize,
        _height: usize,
        _depth: usize,
        _row_pitch: usize,
        _slice_pitch: usize,
        _host_ptr: *mut c_void,
    ) -> (BufferHandle, HostStatus) {
        (BufferHandle(self.mint()), self.status())
    }
}
