//! Kernel dispatch: bind, enqueue, read back, drain.

use mandelmin_core::{PixelGrid, RenderParameters, WorkGeometry};

use crate::api::ComputeApi;
use crate::error::GpuError;
use crate::kernel::{ArgBinder, BoundArgs, KernelArg, KernelSignature};

pub struct KernelDispatcher<'a, A: ComputeApi> {
    api: &'a A,
}

impl<'a, A: ComputeApi> KernelDispatcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Bind the render parameters to the kernel's eight positional arguments.
    pub fn bind_arguments<'b>(
        signature: &'b KernelSignature,
        params: &RenderParameters,
        output: &'b A::Buffer,
    ) -> Result<BoundArgs<'b, A::Buffer>, GpuError> {
        let mut binder = ArgBinder::new(signature);
        binder
            .set(0, KernelArg::Float(params.center.0 as f32))
            .set(1, KernelArg::Float(params.center.1 as f32))
            .set(2, KernelArg::Float(params.magnification as f32))
            .set(3, KernelArg::Float(params.iterations as f32))
            .set_int(4, params.width)
            .set_int(5, params.height)
            .set(6, KernelArg::Buffer(output))
            .set_int(7, params.width);
        binder.finish()
    }

    /// Run the kernel over the parameter grid and return the pixels.
    ///
    /// The global size is padded up to whole work-groups, so work-items past
    /// `width`/`height` are launched; the kernel is responsible for ignoring
    /// them. The read-back is blocking and queued after the dispatch on the
    /// same queue, and the queue is drained before returning, so nothing
    /// submitted here is still in flight when this returns.
    pub fn dispatch(
        &self,
        kernel: &A::Kernel,
        signature: &KernelSignature,
        queue: &A::Queue,
        output: &A::Buffer,
        params: &RenderParameters,
    ) -> Result<PixelGrid, GpuError> {
        let width = params.width as usize;
        let height = params.height as usize;

        let args = Self::bind_arguments(signature, params, output)?;

        let geometry = WorkGeometry::aligned([width, height], signature.local_size);
        log::debug!(
            "Dispatching {} over {:?} (local {:?}, {:?} padding)",
            signature.entry_point,
            geometry.global,
            geometry.local,
            geometry.padding()
        );
        self.api.enqueue_kernel(queue, kernel, &args, &geometry)?;

        let mut grid = PixelGrid::new(width, height);
        self.api.read_buffer(queue, output, grid.as_mut_slice())?;

        self.api.finish(queue)?;
        Ok(grid)
    }
}
