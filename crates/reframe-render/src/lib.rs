//! # reframe-render
//!
//! The frame transform engine. Applies the per-pixel shader to a sequence of
//! frame images on one thread, on a CPU worker pool, or through a compute
//! kernel on the GPU, and writes one output image per input.

pub mod cancel;
pub mod compute;
pub mod cpu;
pub mod dispatcher;
pub mod emulated;
pub mod gpu;
pub mod gpu_executor;
pub mod image_loader;
pub mod kernel;
pub mod partition;
pub mod shader;
pub mod summary;
pub mod verify;

pub use cancel::CancelToken;
pub use compute::{ComputeDevice, ComputeSession};
pub use dispatcher::Dispatcher;
pub use emulated::{EmulatedDevice, EmulatorStats};
pub use gpu::GpuDevice;
pub use gpu_executor::GpuExecutor;
pub use kernel::KernelProgram;
pub use summary::RenderSummary;
pub use verify::VerifyReport;
