//! Kernel source loading and program compilation.

use std::borrow::Cow;
use std::path::Path;

use crate::api::{BuildStatus, ComputeApi};
use crate::error::GpuError;

/// Kernel source text. Treated as opaque bytes; only the compiler looks inside.
#[derive(Clone, Debug)]
pub struct KernelSource {
    label: String,
    bytes: Cow<'static, [u8]>,
}

impl KernelSource {
    /// The bundled `draw_mandelbrot` kernel.
    pub fn embedded() -> Self {
        Self {
            label: "mandelbrot.wgsl".to_string(),
            bytes: Cow::Borrowed(include_str!("../shaders/mandelbrot.wgsl").as_bytes()),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GpuError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| GpuError::SourceRead {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            label: path.display().to_string(),
            bytes: Cow::Owned(bytes),
        })
    }

    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: Cow::Owned(bytes.into()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A program that compiled successfully. Only [`ProgramBuilder`] creates these,
/// so kernels are only ever extracted from built programs.
pub struct BuiltProgram<P> {
    program: P,
}

impl<P> BuiltProgram<P> {
    pub fn get(&self) -> &P {
        &self.program
    }
}

pub struct ProgramBuilder<'a, A: ComputeApi> {
    api: &'a A,
}

impl<'a, A: ComputeApi> ProgramBuilder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Compile `source` for the context's device.
    ///
    /// A failed build returns `GpuError::Build` carrying the compiler log; the
    /// half-built program is released before returning.
    pub fn build(
        &self,
        context: &A::Context,
        source: &KernelSource,
    ) -> Result<BuiltProgram<A::Program>, GpuError> {
        log::debug!(
            "Compiling kernel source {} ({} bytes)",
            source.label(),
            source.bytes().len()
        );
        // Bindings that reject a source before producing a program report it
        // as a build error without a label; attach ours.
        let compilation = self
            .api
            .compile_program(context, source.bytes())
            .map_err(|err| match err {
                GpuError::Build { log, .. } => GpuError::Build {
                    label: source.label().to_string(),
                    log,
                },
                other => other,
            })?;

        match compilation.status {
            BuildStatus::Success => {
                if !compilation.log.trim().is_empty() {
                    log::warn!("Compiler output for {}:\n{}", source.label(), compilation.log);
                }
                Ok(BuiltProgram {
                    program: compilation.program,
                })
            }
            BuildStatus::Failure => {
                let log = if compilation.log.trim().is_empty() {
                    "compiler reported failure without a log".to_string()
                } else {
                    compilation.log
                };
                Err(GpuError::Build {
                    label: source.label().to_string(),
                    log,
                })
            }
        }
    }
}
