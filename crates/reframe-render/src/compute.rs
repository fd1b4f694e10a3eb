//! The seam between the GPU executor and a concrete compute backend.
//!
//! A [`ComputeDevice`] is the capability handle the caller hands in (a wgpu
//! adapter, or the host emulator). It opens one [`ComputeSession`] per render
//! run: context, built program, kernel and command queue. Device buffers are
//! owned values of the session's `Buffer` type and release their memory when
//! dropped.

use reframe_core::ReframeResult;

use crate::kernel::KernelProgram;

pub trait ComputeDevice: Send + Sync {
    type Session: ComputeSession;

    /// Adapter description for logs.
    fn name(&self) -> String;

    /// Create a context, build `program`, create its kernel and a command queue.
    ///
    /// `lanes` pins the kernel lane count; 0 sizes it per frame.
    fn open_session(&self, program: &KernelProgram, lanes: u32) -> ReframeResult<Self::Session>;
}

pub trait ComputeSession: Send + Sync {
    /// Device memory holding one frame. Dropping it releases the memory.
    type Buffer: Send + 'static;

    /// Allocate a buffer of `pixels.len()` bytes and copy `pixels` into it.
    fn upload(&self, pixels: &[u8]) -> ReframeResult<Self::Buffer>;

    /// Bind `buffer`, `width` and `height` as kernel arguments, enqueue the
    /// kernel and block until it has finished.
    ///
    /// Not reentrant: callers serialize invocations.
    fn execute(&self, buffer: &Self::Buffer, width: u32, height: u32) -> ReframeResult<()>;

    /// Copy the buffer contents back to host memory.
    fn download(&self, buffer: &Self::Buffer) -> ReframeResult<Vec<u8>>;
}
