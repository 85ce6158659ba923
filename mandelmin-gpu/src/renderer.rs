//! High-level render API.

use std::time::Instant;

use mandelmin_core::{PixelGrid, RenderParameters};

use crate::api::{ComputeApi, DeviceInfo};
use crate::device::DeviceSelector;
use crate::dispatch::KernelDispatcher;
use crate::error::GpuError;
use crate::kernel::MANDELBROT_KERNEL;
use crate::lifecycle::Session;
use crate::program::KernelSource;
use crate::wgpu_api::WgpuApi;

/// Result of a render.
pub struct GpuRenderResult {
    pub grid: PixelGrid,
    pub device: DeviceInfo,
    /// Wall time from device selection to the end of the drain.
    pub compute_time_ms: f64,
}

/// Render one frame on `api` with the kernel in `source`.
///
/// Every handle acquired on the way is released before this returns, on
/// success and on every error path.
pub fn render<A: ComputeApi>(
    api: &A,
    source: &KernelSource,
    params: &RenderParameters,
) -> Result<GpuRenderResult, GpuError> {
    params.validate()?;
    let start = Instant::now();

    let selected = DeviceSelector::new(api).select()?;
    let session = Session::open(
        api,
        &selected.device,
        source,
        &MANDELBROT_KERNEL,
        params.pixel_count(),
    )?;

    let handles = session.handles()?;
    let grid = KernelDispatcher::new(api).dispatch(
        handles.kernel,
        session.signature(),
        handles.queue,
        handles.buffer,
        params,
    )?;
    session.close();

    let compute_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    log::info!(
        "Rendered {}x{} on {} in {:.1} ms",
        params.width,
        params.height,
        selected.info.name,
        compute_time_ms
    );

    Ok(GpuRenderResult {
        grid,
        device: selected.info,
        compute_time_ms,
    })
}

/// Render with the `wgpu` binding and the bundled kernel.
pub fn render_default(params: &RenderParameters) -> Result<GpuRenderResult, GpuError> {
    render(&WgpuApi::new(), &KernelSource::embedded(), params)
}
