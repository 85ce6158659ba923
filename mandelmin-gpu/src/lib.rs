//! Single-shot Mandelbrot rendering on a compute device.
//!
//! The pipeline selects a device, compiles the kernel, acquires a context,
//! queue and output buffer, dispatches one 2-D job and reads the pixels
//! back. All of it runs against the [`ComputeApi`] seam; [`WgpuApi`] is the
//! production binding.

mod api;
mod device;
mod dispatch;
mod error;
mod kernel;
mod lifecycle;
mod program;
mod renderer;
mod wgpu_api;

pub use api::{BuildStatus, Compilation, ComputeApi, DeviceClass, DeviceInfo};
pub use device::{DeviceSelector, SelectedDevice};
pub use dispatch::KernelDispatcher;
pub use error::{DispatchStep, ErrorCategory, GpuError};
pub use kernel::{
    ArgBinder, ArgKind, ArgSpec, BoundArgs, KernelArg, KernelSignature, MANDELBROT_KERNEL,
};
pub use lifecycle::{Handles, ResourceKind, Session};
pub use program::{BuiltProgram, KernelSource, ProgramBuilder};
pub use renderer::{render, render_default, GpuRenderResult};
pub use wgpu_api::{
    WgpuApi, WgpuBuffer, WgpuContext, WgpuDevice, WgpuKernel, WgpuPlatform, WgpuProgram,
    WgpuQueue,
};
