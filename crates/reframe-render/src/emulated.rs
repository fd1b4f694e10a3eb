//! Host-side emulation of a compute device.
//!
//! Runs the kernel's lane mapping on the calling thread, one lane after the
//! other, over packed pixel words laid out exactly like the WGSL storage
//! buffer. Used when no GPU adapter is present, and by tests to observe
//! buffer lifetimes and submission overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use reframe_core::{ReframeError, ReframeResult};

use crate::compute::{ComputeDevice, ComputeSession};
use crate::kernel::{self, KernelProgram};

/// Counters shared by an emulated device and every session it opens.
#[derive(Debug, Default)]
pub struct EmulatorStats {
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    buffers_allocated: AtomicUsize,
    live_buffers: AtomicUsize,
    executions: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl EmulatorStats {
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn buffers_allocated(&self) -> usize {
        self.buffers_allocated.load(Ordering::SeqCst)
    }

    /// Device buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Highest number of kernel executions ever observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

type DispatchFault = fn(u32, u32) -> bool;

/// A compute device backed by the host CPU.
#[derive(Debug, Clone)]
pub struct EmulatedDevice {
    lanes: u32,
    stats: Arc<EmulatorStats>,
    fault: Option<DispatchFault>,
}

impl EmulatedDevice {
    /// `lanes` is the default lane count when a session does not pin one;
    /// 0 sizes the lanes per frame like the GPU does.
    pub fn new(lanes: u32) -> Self {
        Self {
            lanes,
            stats: Arc::new(EmulatorStats::default()),
            fault: None,
        }
    }

    /// Make kernel execution fail for frames whose dimensions match `fault`.
    pub fn with_dispatch_fault(mut self, fault: DispatchFault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn stats(&self) -> Arc<EmulatorStats> {
        self.stats.clone()
    }
}

impl ComputeDevice for EmulatedDevice {
    type Session = EmulatedSession;

    fn name(&self) -> String {
        match self.lanes {
            0 => "host emulator (auto lanes)".to_string(),
            n => format!("host emulator ({} lanes)", n),
        }
    }

    fn open_session(&self, program: &KernelProgram, lanes: u32) -> ReframeResult<EmulatedSession> {
        if program.source().trim().is_empty() {
            return Err(ReframeError::gpu("kernel build failed: empty program source"));
        }
        if !program.declares_entry_point() {
            return Err(ReframeError::gpu(format!(
                "kernel build failed: entry point '{}' not found",
                program.entry_point()
            )));
        }

        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(EmulatedSession {
            lanes: if lanes > 0 { lanes } else { self.lanes },
            stats: self.stats.clone(),
            fault: self.fault,
        })
    }
}

pub struct EmulatedSession {
    lanes: u32,
    stats: Arc<EmulatorStats>,
    fault: Option<DispatchFault>,
}

impl Drop for EmulatedSession {
    fn drop(&mut self) {
        self.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Emulated device memory: one packed little-endian word per pixel.
pub struct EmulatedBuffer {
    words: Mutex<Vec<u32>>,
    stats: Arc<EmulatorStats>,
}

impl Drop for EmulatedBuffer {
    fn drop(&mut self) {
        self.stats.live_buffers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ComputeSession for EmulatedSession {
    type Buffer = EmulatedBuffer;

    fn upload(&self, pixels: &[u8]) -> ReframeResult<EmulatedBuffer> {
        if pixels.is_empty() || pixels.len() % 4 != 0 {
            return Err(ReframeError::InvalidArgument(format!(
                "pixel buffer of {} bytes is not a whole number of RGBA pixels",
                pixels.len()
            )));
        }
        let words = pixels
            .chunks_exact(4)
            .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
            .collect();
        self.stats.buffers_allocated.fetch_add(1, Ordering::SeqCst);
        self.stats.live_buffers.fetch_add(1, Ordering::SeqCst);
        Ok(EmulatedBuffer {
            words: Mutex::new(words),
            stats: self.stats.clone(),
        })
    }

    fn execute(&self, buffer: &EmulatedBuffer, width: u32, height: u32) -> ReframeResult<()> {
        let running = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.run_kernel(buffer, width, height);
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.executions.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn download(&self, buffer: &EmulatedBuffer) -> ReframeResult<Vec<u8>> {
        let words = buffer
            .words
            .lock()
            .map_err(|_| ReframeError::gpu("emulated buffer poisoned"))?;
        Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect())
    }
}

impl EmulatedSession {
    fn run_kernel(&self, buffer: &EmulatedBuffer, width: u32, height: u32) -> ReframeResult<()> {
        if self.fault.is_some_and(|fault| fault(width, height)) {
            return Err(ReframeError::gpu(format!(
                "kernel execution failed for a {}x{} frame",
                width, height
            )));
        }

        let mut words = buffer
            .words
            .lock()
            .map_err(|_| ReframeError::gpu("emulated buffer poisoned"))?;
        let pixel_count = (width as usize) * (height as usize);
        if pixel_count != words.len() {
            return Err(ReframeError::InvalidArgument(format!(
                "{}x{} does not match a device buffer of {} pixels",
                width,
                height,
                words.len()
            )));
        }

        let lanes = kernel::lane_count(pixel_count, self.lanes);
        for lane in 0..lanes {
            for p in kernel::lane_pixels(lane, lanes, pixel_count) {
                words[p] = kernel::shade_word(words[p]);
            }
        }
        Ok(())
    }
}
