//! The compute API seam.
//!
//! `ComputeApi` is the narrow surface the pipeline needs from a compute
//! runtime: platform and device enumeration, handle creation, and the three
//! queue operations (enqueue, blocking read, drain). Every handle type is
//! owned; dropping a handle releases it. The ordering of those drops is the
//! job of [`Session`](crate::Session), not of the implementation.

use std::fmt;

use mandelmin_core::WorkGeometry;

use crate::error::GpuError;
use crate::kernel::{BoundArgs, KernelSignature};

/// Device classes the selector distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Gpu,
    Cpu,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Gpu => write!(f, "GPU"),
            DeviceClass::Cpu => write!(f, "CPU"),
        }
    }
}

/// Descriptive information about a device, for logging and results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub class: DeviceClass,
    pub platform: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.class, self.platform)
    }
}

/// Outcome of submitting source text to the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Failure,
}

/// A program object together with its build status and compiler log.
///
/// A program with `BuildStatus::Failure` is never handed to callers; the
/// [`ProgramBuilder`](crate::ProgramBuilder) drops it and reports the log.
pub struct Compilation<P> {
    pub program: P,
    pub status: BuildStatus,
    pub log: String,
}

pub trait ComputeApi {
    type Platform;
    type Device;
    type Context;
    type Queue;
    type Program;
    type Kernel;
    type Buffer;

    /// Platforms in discovery order.
    fn platforms(&self) -> Result<Vec<Self::Platform>, GpuError>;

    fn platform_name(&self, platform: &Self::Platform) -> String;

    /// Devices of `class` on `platform`. An empty list means none of that
    /// class exist; `Err` means the query itself failed.
    fn devices(
        &self,
        platform: &Self::Platform,
        class: DeviceClass,
    ) -> Result<Vec<Self::Device>, GpuError>;

    fn device_info(&self, device: &Self::Device) -> DeviceInfo;

    fn create_context(&self, device: &Self::Device) -> Result<Self::Context, GpuError>;

    /// Submit source text for compilation with no extra build options.
    fn compile_program(
        &self,
        context: &Self::Context,
        source: &[u8],
    ) -> Result<Compilation<Self::Program>, GpuError>;

    /// Extract the entry point named by `signature` from a built program.
    fn create_kernel(
        &self,
        context: &Self::Context,
        program: &Self::Program,
        signature: &KernelSignature,
    ) -> Result<Self::Kernel, GpuError>;

    fn create_queue(&self, context: &Self::Context) -> Result<Self::Queue, GpuError>;

    /// Allocate a kernel-writable buffer of `len` u32 elements.
    fn create_buffer(&self, context: &Self::Context, len: usize)
        -> Result<Self::Buffer, GpuError>;

    /// Enqueue a 2-D dispatch. Returns once the job is submitted.
    fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        args: &BoundArgs<'_, Self::Buffer>,
        geometry: &WorkGeometry,
    ) -> Result<(), GpuError>;

    /// Blocking read of `buffer` into `dst`, ordered after all prior work on
    /// `queue`.
    fn read_buffer(
        &self,
        queue: &Self::Queue,
        buffer: &Self::Buffer,
        dst: &mut [u32],
    ) -> Result<(), GpuError>;

    /// Wait until every operation submitted to `queue` has completed.
    fn finish(&self, queue: &Self::Queue) -> Result<(), GpuError>;
}
