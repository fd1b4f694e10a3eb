//! GPU executor.
//!
//! One compute session per run. Workers load, upload, download and write
//! frames concurrently; kernel submission goes through a single submission
//! thread that owns the command queue for the duration of the run.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use reframe_core::{FrameBuffer, FrameRef, GpuConfig, RenderStrategy, ReframeError, ReframeResult};

use crate::cancel::CancelToken;
use crate::compute::{ComputeDevice, ComputeSession};
use crate::cpu::worker_pool;
use crate::image_loader::{load_image, save_image};
use crate::kernel::KernelProgram;
use crate::partition::partition;
use crate::summary::{FrameTally, RenderSummary};

/// A kernel submission: the frame's device buffer travels to the submission
/// thread and back.
struct SubmitRequest<B> {
    frame: u64,
    buffer: B,
    width: u32,
    height: u32,
    /// Signalled when the submission thread picks the request up.
    started: Sender<()>,
    reply: Sender<(B, ReframeResult<()>)>,
}

/// Worker-side handle onto the submission thread.
struct Submitter<B> {
    tx: Sender<SubmitRequest<B>>,
    timeout: Duration,
}

// Derive would demand `B: Clone`; device buffers are never cloned.
impl<B> Clone for Submitter<B> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            timeout: self.timeout,
        }
    }
}

impl<B> Submitter<B> {
    /// Run the kernel over `buffer` and hand it back once the kernel is done.
    ///
    /// The timeout starts when the submission thread begins executing this
    /// request; time spent queued behind other frames is not counted. On
    /// timeout the buffer stays with the submission thread, which drops it
    /// when the late kernel finishes.
    fn submit(&self, frame: u64, buffer: B, width: u32, height: u32) -> ReframeResult<B> {
        let (started, picked_up) = mpsc::channel();
        let (reply, done) = mpsc::channel();
        self.tx
            .send(SubmitRequest {
                frame,
                buffer,
                width,
                height,
                started,
                reply,
            })
            .map_err(|_| ReframeError::gpu("submission thread has stopped"))?;

        picked_up
            .recv()
            .map_err(|_| ReframeError::gpu("submission thread dropped the request"))?;

        match done.recv_timeout(self.timeout) {
            Ok((buffer, Ok(()))) => Ok(buffer),
            Ok((_, Err(e))) => Err(e),
            Err(RecvTimeoutError::Timeout) => Err(ReframeError::gpu(format!(
                "kernel for frame {} did not complete within {:?}",
                frame, self.timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ReframeError::gpu("submission thread dropped the request"))
            }
        }
    }
}

/// Drain submissions one at a time until every worker handle is gone.
fn run_submissions<S: ComputeSession>(session: &S, requests: Receiver<SubmitRequest<S::Buffer>>) {
    for request in requests {
        tracing::trace!("Submitting kernel for frame {}", request.frame);
        let _ = request.started.send(());
        let outcome = session.execute(&request.buffer, request.width, request.height);
        // A worker that timed out no longer listens; the buffer is dropped here.
        let _ = request.reply.send((request.buffer, outcome));
    }
}

/// Runs the pixel kernel on a compute device.
pub struct GpuExecutor<'d, D: ComputeDevice> {
    device: &'d D,
    program: KernelProgram,
    lanes: u32,
    submit_timeout: Duration,
}

impl<'d, D: ComputeDevice> GpuExecutor<'d, D> {
    pub fn new(device: &'d D, config: &GpuConfig) -> Self {
        Self {
            device,
            program: KernelProgram::pixel_shader(),
            lanes: config.lanes,
            submit_timeout: config.submit_timeout(),
        }
    }

    /// Replace the kernel program built at the start of each run.
    pub fn with_program(mut self, program: KernelProgram) -> Self {
        self.program = program;
        self
    }

    /// Render `frames` as `workers` round-robin chunks.
    ///
    /// A session that cannot be opened fails the whole run before any frame
    /// is touched. After that, failures are per frame.
    pub fn render(
        &self,
        frames: &[FrameRef],
        output_dir: &Path,
        workers: usize,
        cancel: &CancelToken,
    ) -> ReframeResult<RenderSummary> {
        let start = Instant::now();
        let chunks = partition(frames, workers)?;

        let session = self
            .device
            .open_session(&self.program, self.lanes)
            .map_err(|e| {
                tracing::error!("GPU setup failed on {}: {}", self.device.name(), e);
                e
            })?;
        tracing::info!(
            "Rendering {} frames in {} chunks on {}",
            frames.len(),
            chunks.len(),
            self.device.name()
        );

        let pool = worker_pool(workers)?;
        let tally = FrameTally::default();
        let (tx, rx) = mpsc::channel::<SubmitRequest<<D::Session as ComputeSession>::Buffer>>();
        let submitter = Submitter {
            tx,
            timeout: self.submit_timeout,
        };

        std::thread::scope(|s| {
            let session = &session;
            s.spawn(move || run_submissions(session, rx));

            pool.install(|| {
                chunks
                    .par_iter()
                    .for_each_with(submitter.clone(), |submitter, chunk| {
                        for frame in chunk {
                            if cancel.is_cancelled() {
                                tally.record_cancelled();
                                continue;
                            }
                            let outcome = render_frame(session, submitter, frame, output_dir);
                            tally.record(frame, outcome);
                        }
                    });
            });

            // Closing the last sender lets the submission thread exit.
            drop(submitter);
        });

        drop(session);
        tracing::debug!("GPU session released");

        Ok(tally.into_summary(RenderStrategy::Gpu, frames.len(), workers, start.elapsed()))
    }
}

fn render_frame<S: ComputeSession>(
    session: &S,
    submitter: &Submitter<S::Buffer>,
    frame: &FrameRef,
    output_dir: &Path,
) -> ReframeResult<()> {
    let src = load_image(&frame.path)?;
    let (width, height) = (src.width, src.height);

    let buffer = session.upload(&src.data)?;
    let buffer = submitter.submit(frame.index(), buffer, width, height)?;
    let pixels = session.download(&buffer)?;
    drop(buffer);

    let out = FrameBuffer::from_rgba(width, height, pixels)?;
    save_image(&out, &frame.output_path(output_dir))
}
