//! Ordered acquisition and release of compute handles.
//!
//! A [`Session`] owns every handle of a run. Handles are pushed onto an
//! ownership stack as they are acquired and released in
//! [`ResourceKind::RELEASE_ORDER`] when the session drops, whether the run
//! finished, failed half-way through acquisition, or unwound. Kinds that were
//! never acquired are skipped.

use std::fmt;

use crate::api::ComputeApi;
use crate::error::GpuError;
use crate::kernel::KernelSignature;
use crate::program::{BuiltProgram, KernelSource, ProgramBuilder};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Context,
    Program,
    Kernel,
    Queue,
    Buffer,
}

impl ResourceKind {
    /// Acquisition order.
    pub const ACQUISITION_ORDER: [ResourceKind; 5] = [
        ResourceKind::Context,
        ResourceKind::Program,
        ResourceKind::Kernel,
        ResourceKind::Queue,
        ResourceKind::Buffer,
    ];

    /// Release order: the kernel first, then the rest last-acquired first.
    /// The context always goes last.
    pub const RELEASE_ORDER: [ResourceKind; 5] = [
        ResourceKind::Kernel,
        ResourceKind::Buffer,
        ResourceKind::Queue,
        ResourceKind::Program,
        ResourceKind::Context,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Context => write!(f, "context"),
            ResourceKind::Program => write!(f, "program"),
            ResourceKind::Kernel => write!(f, "kernel"),
            ResourceKind::Queue => write!(f, "command queue"),
            ResourceKind::Buffer => write!(f, "device buffer"),
        }
    }
}

/// Borrowed view of a fully acquired session.
pub struct Handles<'s, A: ComputeApi> {
    pub context: &'s A::Context,
    pub program: &'s A::Program,
    pub kernel: &'s A::Kernel,
    pub queue: &'s A::Queue,
    pub buffer: &'s A::Buffer,
}

pub struct Session<A: ComputeApi> {
    context: Option<A::Context>,
    program: Option<BuiltProgram<A::Program>>,
    kernel: Option<A::Kernel>,
    queue: Option<A::Queue>,
    buffer: Option<A::Buffer>,
    stack: Vec<ResourceKind>,
    signature: KernelSignature,
}

impl<A: ComputeApi> Session<A> {
    /// Acquire context, program, kernel, queue and an output buffer of
    /// `output_len` elements, in that order.
    ///
    /// If any step fails, everything acquired so far is released (in
    /// release order) before the error is returned.
    pub fn open(
        api: &A,
        device: &A::Device,
        source: &KernelSource,
        signature: &KernelSignature,
        output_len: usize,
    ) -> Result<Self, GpuError> {
        let mut session = Session {
            context: None,
            program: None,
            kernel: None,
            queue: None,
            buffer: None,
            stack: Vec::with_capacity(ResourceKind::ACQUISITION_ORDER.len()),
            signature: *signature,
        };

        // Each handle is stored before its kind is pushed, so the stack never
        // names a handle the session does not hold.
        let context = session.context.insert(api.create_context(device)?);
        push(&mut session.stack, ResourceKind::Context);

        let program = session
            .program
            .insert(ProgramBuilder::new(api).build(context, source)?);
        push(&mut session.stack, ResourceKind::Program);

        session.kernel = Some(api.create_kernel(context, program.get(), signature)?);
        push(&mut session.stack, ResourceKind::Kernel);

        session.queue = Some(api.create_queue(context)?);
        push(&mut session.stack, ResourceKind::Queue);

        session.buffer = Some(api.create_buffer(context, output_len)?);
        push(&mut session.stack, ResourceKind::Buffer);

        Ok(session)
    }

    /// Handles currently held, in acquisition order.
    pub fn held(&self) -> &[ResourceKind] {
        &self.stack
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    /// Borrow every handle. Fails only if the session is not fully acquired.
    pub fn handles(&self) -> Result<Handles<'_, A>, GpuError> {
        fn held<'s, T>(slot: &'s Option<T>, kind: ResourceKind) -> Result<&'s T, GpuError> {
            slot.as_ref()
                .ok_or_else(|| GpuError::resource(kind, "not held by session"))
        }

        Ok(Handles {
            context: held(&self.context, ResourceKind::Context)?,
            program: held(&self.program, ResourceKind::Program)?.get(),
            kernel: held(&self.kernel, ResourceKind::Kernel)?,
            queue: held(&self.queue, ResourceKind::Queue)?,
            buffer: held(&self.buffer, ResourceKind::Buffer)?,
        })
    }

    /// Release everything now instead of at end of scope.
    pub fn close(self) {}

    fn release(&mut self, kind: ResourceKind) {
        match kind {
            ResourceKind::Context => drop(self.context.take()),
            ResourceKind::Program => drop(self.program.take()),
            ResourceKind::Kernel => drop(self.kernel.take()),
            ResourceKind::Queue => drop(self.queue.take()),
            ResourceKind::Buffer => drop(self.buffer.take()),
        }
        log::debug!("Released {kind}");
    }
}

fn push(stack: &mut Vec<ResourceKind>, kind: ResourceKind) {
    log::debug!("Acquired {kind}");
    stack.push(kind);
}

impl<A: ComputeApi> Drop for Session<A> {
    fn drop(&mut self) {
        for kind in ResourceKind::RELEASE_ORDER {
            if let Some(pos) = self.stack.iter().position(|&held| held == kind) {
                self.stack.remove(pos);
                self.release(kind);
            }
        }
    }
}
