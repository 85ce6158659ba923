//! GPU error types.

use std::fmt;

use thiserror::Error;

use crate::lifecycle::ResourceKind;

/// Step of a dispatch that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStep {
    BindArguments,
    Enqueue,
    ReadBack,
    Drain,
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStep::BindArguments => write!(f, "argument binding"),
            DispatchStep::Enqueue => write!(f, "kernel enqueue"),
            DispatchStep::ReadBack => write!(f, "buffer read-back"),
            DispatchStep::Drain => write!(f, "queue drain"),
        }
    }
}

/// Coarse failure class, used to decide how a caller reports an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Render parameters were rejected before any device work.
    Input,
    /// No usable platform or device.
    Environment,
    /// Kernel source did not compile.
    Build,
    /// A handle could not be acquired.
    Resource,
    /// Argument binding, enqueue, read-back or drain failed.
    Dispatch,
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("No compute platform found")]
    NoPlatform,

    #[error("No GPU or CPU device on platform {platform}")]
    NoDevice { platform: String },

    #[error("Device query failed on platform {platform}: {message}")]
    DeviceQuery { platform: String, message: String },

    #[error("Failed to read kernel source {path}: {source}")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Kernel source {label} failed to build:\n{log}")]
    Build { label: String, log: String },

    #[error("Failed to acquire {kind}: {message}")]
    Resource { kind: ResourceKind, message: String },

    #[error("Dispatch failed during {step}: {message}")]
    Dispatch { step: DispatchStep, message: String },

    #[error("Invalid render parameters: {0}")]
    Parameters(#[from] mandelmin_core::ConfigError),
}

impl GpuError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GpuError::NoPlatform | GpuError::NoDevice { .. } | GpuError::DeviceQuery { .. } => {
                ErrorCategory::Environment
            }
            GpuError::SourceRead { .. } | GpuError::Build { .. } => ErrorCategory::Build,
            GpuError::Resource { .. } => ErrorCategory::Resource,
            GpuError::Dispatch { .. } => ErrorCategory::Dispatch,
            GpuError::Parameters(_) => ErrorCategory::Input,
        }
    }

    pub(crate) fn resource(kind: ResourceKind, message: impl Into<String>) -> Self {
        GpuError::Resource {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn dispatch(step: DispatchStep, message: impl Into<String>) -> Self {
        GpuError::Dispatch {
            step,
            message: message.into(),
        }
    }

    /// Compiler log for build failures.
    pub fn build_log(&self) -> Option<&str> {
        match self {
            GpuError::Build { log, .. } => Some(log),
            _ => None,
        }
    }
}
