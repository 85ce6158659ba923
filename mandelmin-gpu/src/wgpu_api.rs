//! `ComputeApi` over wgpu.
//!
//! Platforms are wgpu backends that expose at least one adapter, devices are
//! adapters. A context is a logical device with its queue. Scalar kernel
//! arguments are packed into a uniform block at binding 0, buffer arguments
//! follow at bindings 1.. as read-write storage.
//!
//! Every fallible wgpu call runs inside an error scope so validation and
//! allocation failures come back as `GpuError`s instead of reaching the
//! uncaptured-error handler.

use std::borrow::Cow;
use std::sync::Arc;

use mandelmin_core::WorkGeometry;
use wgpu::util::DeviceExt;

use crate::api::{BuildStatus, Compilation, ComputeApi, DeviceClass, DeviceInfo};
use crate::error::{DispatchStep, GpuError};
use crate::kernel::{BoundArgs, KernelSignature};
use crate::lifecycle::ResourceKind;

/// Backends probed, in platform discovery order.
const BACKENDS: [wgpu::Backend; 4] = [
    wgpu::Backend::Vulkan,
    wgpu::Backend::Metal,
    wgpu::Backend::Dx12,
    wgpu::Backend::Gl,
];

/// Uniform blocks are sized in multiples of 16 bytes.
const UNIFORM_ALIGN: usize = 16;

pub struct WgpuApi {
    instance: wgpu::Instance,
}

pub struct WgpuPlatform {
    backend: wgpu::Backend,
}

pub struct WgpuDevice {
    adapter: wgpu::Adapter,
}

pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

pub struct WgpuProgram {
    module: wgpu::ShaderModule,
}

pub struct WgpuKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    has_uniform: bool,
    local_size: [usize; 2],
}

pub struct WgpuQueue {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

pub struct WgpuBuffer {
    storage: wgpu::Buffer,
    len: usize,
}

impl WgpuApi {
    pub fn new() -> Self {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        Self { instance }
    }
}

impl Default for WgpuApi {
    fn default() -> Self {
        Self::new()
    }
}

fn backend_bits(backend: wgpu::Backend) -> wgpu::Backends {
    match backend {
        wgpu::Backend::Vulkan => wgpu::Backends::VULKAN,
        wgpu::Backend::Metal => wgpu::Backends::METAL,
        wgpu::Backend::Dx12 => wgpu::Backends::DX12,
        wgpu::Backend::Gl => wgpu::Backends::GL,
        _ => wgpu::Backends::empty(),
    }
}

/// Software rasterizers report `Cpu`; everything else runs on a GPU.
fn device_class(device_type: wgpu::DeviceType) -> DeviceClass {
    match device_type {
        wgpu::DeviceType::Cpu => DeviceClass::Cpu,
        wgpu::DeviceType::DiscreteGpu
        | wgpu::DeviceType::IntegratedGpu
        | wgpu::DeviceType::VirtualGpu
        | wgpu::DeviceType::Other => DeviceClass::Gpu,
    }
}

fn format_message(message: &wgpu::CompilationMessage) -> String {
    match &message.location {
        Some(loc) => format!(
            "{:?} at {}:{}: {}",
            message.message_type, loc.line_number, loc.line_position, message.message
        ),
        None => format!("{:?}: {}", message.message_type, message.message),
    }
}

fn pop_scope(device: &wgpu::Device) -> Option<wgpu::Error> {
    pollster::block_on(device.pop_error_scope())
}

impl ComputeApi for WgpuApi {
    type Platform = WgpuPlatform;
    type Device = WgpuDevice;
    type Context = WgpuContext;
    type Queue = WgpuQueue;
    type Program = WgpuProgram;
    type Kernel = WgpuKernel;
    type Buffer = WgpuBuffer;

    fn platforms(&self) -> Result<Vec<WgpuPlatform>, GpuError> {
        Ok(BACKENDS
            .iter()
            .copied()
            .filter(|&backend| {
                !self
                    .instance
                    .enumerate_adapters(backend_bits(backend))
                    .is_empty()
            })
            .map(|backend| WgpuPlatform { backend })
            .collect())
    }

    fn platform_name(&self, platform: &WgpuPlatform) -> String {
        format!("{:?}", platform.backend)
    }

    fn devices(
        &self,
        platform: &WgpuPlatform,
        class: DeviceClass,
    ) -> Result<Vec<WgpuDevice>, GpuError> {
        Ok(self
            .instance
            .enumerate_adapters(backend_bits(platform.backend))
            .into_iter()
            .filter(|adapter| device_class(adapter.get_info().device_type) == class)
            .map(|adapter| WgpuDevice { adapter })
            .collect())
    }

    fn device_info(&self, device: &WgpuDevice) -> DeviceInfo {
        let info = device.adapter.get_info();
        DeviceInfo {
            name: info.name,
            class: device_class(info.device_type),
            platform: format!("{:?}", info.backend),
        }
    }

    fn create_context(&self, device: &WgpuDevice) -> Result<WgpuContext, GpuError> {
        let adapter = &device.adapter;
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mandelmin"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|e| GpuError::resource(ResourceKind::Context, e.to_string()))?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            log::error!("Uncaptured GPU error: {e}");
        }));

        Ok(WgpuContext {
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    fn compile_program(
        &self,
        context: &WgpuContext,
        source: &[u8],
    ) -> Result<Compilation<WgpuProgram>, GpuError> {
        let text = std::str::from_utf8(source).map_err(|e| GpuError::Build {
            label: String::new(),
            log: format!("source is not valid UTF-8: {e}"),
        })?;

        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mandelmin_kernel"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(text)),
        });
        let info = pollster::block_on(module.get_compilation_info());
        let scope_error = pop_scope(device);

        let mut log = info
            .messages
            .iter()
            .map(format_message)
            .collect::<Vec<_>>()
            .join("\n");
        let has_errors = info
            .messages
            .iter()
            .any(|m| m.message_type == wgpu::CompilationMessageType::Error);

        let status = match scope_error {
            Some(err) => {
                if !has_errors {
                    if !log.is_empty() {
                        log.push('\n');
                    }
                    log.push_str(&err.to_string());
                }
                BuildStatus::Failure
            }
            None if has_errors => BuildStatus::Failure,
            None => BuildStatus::Success,
        };

        Ok(Compilation {
            program: WgpuProgram { module },
            status,
            log,
        })
    }

    fn create_kernel(
        &self,
        context: &WgpuContext,
        program: &WgpuProgram,
        signature: &KernelSignature,
    ) -> Result<WgpuKernel, GpuError> {
        let device = &context.device;
        let has_uniform = signature.scalar_count() > 0;

        let mut entries = Vec::with_capacity(signature.buffer_count() + 1);
        if has_uniform {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for i in 0..signature.buffer_count() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mandelmin_kernel_layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mandelmin_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(signature.entry_point),
            layout: Some(&pipeline_layout),
            module: &program.module,
            entry_point: Some(signature.entry_point),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(err) = pop_scope(device) {
            return Err(GpuError::resource(
                ResourceKind::Kernel,
                format!("entry point {}: {err}", signature.entry_point),
            ));
        }

        Ok(WgpuKernel {
            pipeline,
            bind_group_layout,
            has_uniform,
            local_size: signature.local_size,
        })
    }

    fn create_queue(&self, context: &WgpuContext) -> Result<WgpuQueue, GpuError> {
        Ok(WgpuQueue {
            device: Arc::clone(&context.device),
            queue: Arc::clone(&context.queue),
        })
    }

    fn create_buffer(&self, context: &WgpuContext, len: usize) -> Result<WgpuBuffer, GpuError> {
        let device = &context.device;
        let size = (len * std::mem::size_of::<u32>()) as u64;
        let max = u64::from(device.limits().max_storage_buffer_binding_size);
        if size > max {
            return Err(GpuError::resource(
                ResourceKind::Buffer,
                format!("{size} bytes exceeds the device storage binding limit of {max}"),
            ));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let storage = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mandelmin_output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let validation = pop_scope(device);
        let oom = pop_scope(device);
        if let Some(err) = validation.or(oom) {
            return Err(GpuError::resource(ResourceKind::Buffer, err.to_string()));
        }

        Ok(WgpuBuffer { storage, len })
    }

    fn enqueue_kernel(
        &self,
        queue: &WgpuQueue,
        kernel: &WgpuKernel,
        args: &BoundArgs<'_, WgpuBuffer>,
        geometry: &WorkGeometry,
    ) -> Result<(), GpuError> {
        if geometry.local != kernel.local_size {
            return Err(GpuError::dispatch(
                DispatchStep::Enqueue,
                format!(
                    "work-group {:?} does not match the kernel's {:?}",
                    geometry.local, kernel.local_size
                ),
            ));
        }
        let [groups_x, groups_y] = geometry.work_groups();
        let max = queue.device.limits().max_compute_workgroups_per_dimension as usize;
        if groups_x > max || groups_y > max {
            return Err(GpuError::dispatch(
                DispatchStep::Enqueue,
                format!("{groups_x}x{groups_y} work-groups exceeds the device limit of {max}"),
            ));
        }

        let device = &queue.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform = kernel.has_uniform.then(|| {
            let mut bytes: Vec<u8> = args.scalar_words().flatten().collect();
            bytes.resize(bytes.len().next_multiple_of(UNIFORM_ALIGN).max(UNIFORM_ALIGN), 0);
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mandelmin_args"),
                contents: &bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let mut entries = Vec::new();
        if let Some(uniform) = &uniform {
            entries.push(wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            });
        }
        for (i, buffer) in args.buffers().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: buffer.storage.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mandelmin_bind_group"),
            layout: &kernel.bind_group_layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mandelmin_dispatch"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("mandelmin_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x as u32, groups_y as u32, 1);
        }
        queue.queue.submit(std::iter::once(encoder.finish()));

        match pop_scope(device) {
            Some(err) => Err(GpuError::dispatch(DispatchStep::Enqueue, err.to_string())),
            None => Ok(()),
        }
    }

    fn read_buffer(
        &self,
        queue: &WgpuQueue,
        buffer: &WgpuBuffer,
        dst: &mut [u32],
    ) -> Result<(), GpuError> {
        if dst.len() > buffer.len {
            return Err(GpuError::dispatch(
                DispatchStep::ReadBack,
                format!("{} elements requested from a buffer of {}", dst.len(), buffer.len),
            ));
        }
        if dst.is_empty() {
            return Ok(());
        }

        let device = &queue.device;
        let size = (dst.len() * std::mem::size_of::<u32>()) as u64;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("mandelmin_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("mandelmin_readback"),
        });
        encoder.copy_buffer_to_buffer(&buffer.storage, 0, &staging, 0, size);
        queue.queue.submit(std::iter::once(encoder.finish()));
        if let Some(err) = pop_scope(device) {
            return Err(GpuError::dispatch(DispatchStep::ReadBack, err.to_string()));
        }

        // Mapping completes only after the copy, and the copy after every
        // earlier submission on this queue.
        let slice = staging.slice(..);
        let (tx, rx) = futures_channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        pollster::block_on(rx)
            .map_err(|_| GpuError::dispatch(DispatchStep::ReadBack, "map channel closed"))?
            .map_err(|e| GpuError::dispatch(DispatchStep::ReadBack, e.to_string()))?;

        {
            let view = slice.get_mapped_range();
            dst.copy_from_slice(bytemuck::cast_slice(&view));
        }
        staging.unmap();
        Ok(())
    }

    fn finish(&self, queue: &WgpuQueue) -> Result<(), GpuError> {
        if queue.device.poll(wgpu::Maintain::Wait).is_queue_empty() {
            Ok(())
        } else {
            Err(GpuError::dispatch(
                DispatchStep::Drain,
                "work still pending after wait",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_adapters_are_cpu_class() {
        assert_eq!(device_class(wgpu::DeviceType::Cpu), DeviceClass::Cpu);
    }

    #[test]
    fn every_other_adapter_type_is_gpu_class() {
        for ty in [
            wgpu::DeviceType::DiscreteGpu,
            wgpu::DeviceType::IntegratedGpu,
            wgpu::DeviceType::VirtualGpu,
            wgpu::DeviceType::Other,
        ] {
            assert_eq!(device_class(ty), DeviceClass::Gpu, "{ty:?}");
        }
    }

    #[test]
    fn probed_backends_map_to_single_flags() {
        for backend in BACKENDS {
            assert_eq!(backend_bits(backend).bits().count_ones(), 1, "{backend:?}");
        }
    }
}
