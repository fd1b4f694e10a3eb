//! wgpu compute backend.

use std::borrow::Cow;
use std::sync::{mpsc, Mutex, PoisonError};

use wgpu::util::DeviceExt;
use wgpu::{Adapter, Instance};

use reframe_core::{ReframeError, ReframeResult};

use crate::compute::{ComputeDevice, ComputeSession};
use crate::kernel::{self, KernelProgram};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    lanes: u32,
    _pad: u32,
}

/// A GPU adapter able to run the pixel kernel.
pub struct GpuDevice {
    adapter: Adapter,
    // Keeps the instance alive for as long as the adapter.
    _instance: Instance,
}

impl GpuDevice {
    /// Initializes WGPU, selecting the best available backend (Metal, Vulkan, DX12, etc.)
    pub fn init() -> ReframeResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless compute
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| ReframeError::gpu("failed to find a suitable wgpu adapter"))?;

        Ok(Self::from_adapter(instance, adapter))
    }

    /// Wrap an adapter chosen by the caller.
    pub fn from_adapter(instance: Instance, adapter: Adapter) -> Self {
        Self {
            adapter,
            _instance: instance,
        }
    }
}

impl ComputeDevice for GpuDevice {
    type Session = GpuSession;

    fn name(&self) -> String {
        let info = self.adapter.get_info();
        format!("{} ({:?})", info.name, info.backend)
    }

    fn open_session(&self, program: &KernelProgram, lanes: u32) -> ReframeResult<GpuSession> {
        let (device, queue) = pollster::block_on(self.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Reframe compute device"),
                required_features: wgpu::Features::empty(),
                required_limits: self.adapter.limits(),
            },
            None,
        ))
        .map_err(|e| ReframeError::gpu(format!("failed to create device: {}", e)))?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            tracing::error!("Uncaptured wgpu error: {}", e);
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("reframe_pixel_shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Owned(program.source().to_string())),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reframe_pixel_shader_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("reframe_pixel_shader_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("reframe_pixel_shader_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: program.entry_point(),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ReframeError::gpu(format!("kernel build failed: {}", err)));
        }

        Ok(GpuSession {
            pipeline,
            bind_group_layout,
            queue,
            module,
            device,
            lanes,
            error_scope: Mutex::new(()),
        })
    }
}

/// Compiled kernel plus the device and queue it runs on.
///
/// Fields drop in declaration order, which releases the kernel, then the
/// queue, then the program, then the device context.
pub struct GpuSession {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    queue: wgpu::Queue,
    #[allow(dead_code)]
    module: wgpu::ShaderModule,
    device: wgpu::Device,
    lanes: u32,
    // Error scopes are a stack on the device, shared by every thread.
    error_scope: Mutex<()>,
}

/// One frame's pixels in GPU memory. The memory is freed on drop.
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
    size: u64,
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

impl GpuSession {
    /// Record device work inside a validation scope owned by this call.
    ///
    /// Only command recording and submission run under the scope; waiting
    /// for the device happens after it is popped.
    fn scoped<T>(&self, stage: &str, record: impl FnOnce() -> T) -> ReframeResult<T> {
        let _guard = self.error_scope.lock().unwrap_or_else(PoisonError::into_inner);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = record();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(ReframeError::gpu(format!("{} failed: {}", stage, err))),
            None => Ok(value),
        }
    }
}

impl ComputeSession for GpuSession {
    type Buffer = GpuBuffer;

    fn upload(&self, pixels: &[u8]) -> ReframeResult<GpuBuffer> {
        let size = pixels.len() as u64;
        if size == 0 || size % 4 != 0 {
            return Err(ReframeError::InvalidArgument(format!(
                "pixel buffer of {} bytes is not a whole number of RGBA pixels",
                size
            )));
        }
        let limit = self.device.limits().max_storage_buffer_binding_size as u64;
        if size > limit {
            return Err(ReframeError::gpu(format!(
                "frame of {} bytes exceeds the device storage binding limit of {} bytes",
                size, limit
            )));
        }

        let buffer = self.scoped("upload", || {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("reframe_frame_pixels"),
                contents: pixels,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
        })?;
        Ok(GpuBuffer { buffer, size })
    }

    fn execute(&self, buffer: &GpuBuffer, width: u32, height: u32) -> ReframeResult<()> {
        let pixel_count = (width as usize) * (height as usize);
        if (pixel_count as u64) * 4 != buffer.size {
            return Err(ReframeError::InvalidArgument(format!(
                "{}x{} does not match a device buffer of {} bytes",
                width, height, buffer.size
            )));
        }
        let lanes = kernel::lane_count(pixel_count, self.lanes);

        let submission = self.scoped("kernel execution", || {
            let params = KernelParams {
                width,
                height,
                lanes,
                _pad: 0,
            };
            let params_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("reframe_kernel_params"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("reframe_pixel_shader_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("reframe_pixel_shader_encoder"),
                });
            {
                let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor::default());
                cpass.set_pipeline(&self.pipeline);
                cpass.set_bind_group(0, &bind_group, &[]);
                cpass.dispatch_workgroups(kernel::workgroup_count(lanes), 1, 1);
            }
            self.queue.submit(Some(encoder.finish()))
        })?;

        self.device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submission));
        Ok(())
    }

    fn download(&self, buffer: &GpuBuffer) -> ReframeResult<Vec<u8>> {
        let (readback, submission) = self.scoped("readback", || {
            let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("reframe_frame_readback"),
                size: buffer.size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let mut encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("reframe_readback_encoder"),
                });
            encoder.copy_buffer_to_buffer(&buffer.buffer, 0, &readback, 0, buffer.size);
            let submission = self.queue.submit(Some(encoder.finish()));
            (readback, submission)
        })?;

        let slice = readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = tx.send(v);
        });
        self.device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submission));

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                readback.destroy();
                return Err(ReframeError::gpu(format!("failed to map readback buffer: {}", e)));
            }
            Err(_) => {
                readback.destroy();
                return Err(ReframeError::gpu("readback buffer was never mapped"));
            }
        }

        let data = slice.get_mapped_range().to_vec();
        readback.unmap();
        readback.destroy();
        Ok(data)
    }
}

impl Drop for GpuSession {
    fn drop(&mut self) {
        tracing::debug!("Releasing GPU compute session");
    }
}
