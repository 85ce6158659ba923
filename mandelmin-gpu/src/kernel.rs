//! Kernel signatures and positional argument binding.

use std::fmt;

use crate::error::{DispatchStep, GpuError};

/// Type tag of a kernel argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Float,
    Int,
    Buffer,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKind::Float => write!(f, "float"),
            ArgKind::Int => write!(f, "int"),
            ArgKind::Buffer => write!(f, "buffer"),
        }
    }
}

/// One declared parameter of a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
}

/// The interface an externally supplied kernel must implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelSignature {
    pub entry_point: &'static str,
    pub args: &'static [ArgSpec],
    /// Work-group tile the entry point is declared with.
    pub local_size: [usize; 2],
}

impl KernelSignature {
    pub fn scalar_count(&self) -> usize {
        self.args
            .iter()
            .filter(|a| a.kind != ArgKind::Buffer)
            .count()
    }

    pub fn buffer_count(&self) -> usize {
        self.args.len() - self.scalar_count()
    }
}

/// `draw_mandelbrot(center_x, center_y, magnification, iterations, width,
/// height, output, stride)` with a 256x1 work-group.
///
/// `stride` is the row pitch of `output` in elements and is bound to the
/// width; it stays a separate argument so the kernel can address padded rows.
pub const MANDELBROT_KERNEL: KernelSignature = KernelSignature {
    entry_point: "draw_mandelbrot",
    args: &[
        ArgSpec { name: "center_x", kind: ArgKind::Float },
        ArgSpec { name: "center_y", kind: ArgKind::Float },
        ArgSpec { name: "magnification", kind: ArgKind::Float },
        ArgSpec { name: "iterations", kind: ArgKind::Float },
        ArgSpec { name: "width", kind: ArgKind::Int },
        ArgSpec { name: "height", kind: ArgKind::Int },
        ArgSpec { name: "output", kind: ArgKind::Buffer },
        ArgSpec { name: "stride", kind: ArgKind::Int },
    ],
    local_size: [256, 1],
};

/// A typed argument value.
pub enum KernelArg<'a, B> {
    Float(f32),
    Int(i32),
    Buffer(&'a B),
}

impl<B> KernelArg<'_, B> {
    pub fn kind(&self) -> ArgKind {
        match self {
            KernelArg::Float(_) => ArgKind::Float,
            KernelArg::Int(_) => ArgKind::Int,
            KernelArg::Buffer(_) => ArgKind::Buffer,
        }
    }
}

impl<B> Clone for KernelArg<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for KernelArg<'_, B> {}

impl<B> fmt::Debug for KernelArg<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelArg::Float(v) => write!(f, "Float({v})"),
            KernelArg::Int(v) => write!(f, "Int({v})"),
            KernelArg::Buffer(_) => write!(f, "Buffer"),
        }
    }
}

/// Collects positional arguments for a kernel.
///
/// Binding problems are recorded rather than returned one at a time;
/// [`ArgBinder::finish`] reports all of them in a single error.
pub struct ArgBinder<'a, B> {
    signature: &'a KernelSignature,
    slots: Vec<Option<KernelArg<'a, B>>>,
    errors: Vec<String>,
}

impl<'a, B> ArgBinder<'a, B> {
    pub fn new(signature: &'a KernelSignature) -> Self {
        Self {
            signature,
            slots: vec![None; signature.args.len()],
            errors: Vec::new(),
        }
    }

    /// Bind `arg` at position `index`.
    pub fn set(&mut self, index: usize, arg: KernelArg<'a, B>) -> &mut Self {
        match self.signature.args.get(index) {
            None => self.errors.push(format!(
                "arg {index}: out of range, {} takes {} arguments",
                self.signature.entry_point,
                self.signature.args.len()
            )),
            Some(spec) if spec.kind != arg.kind() => self.errors.push(format!(
                "arg {index} ({}): expected {}, got {}",
                spec.name,
                spec.kind,
                arg.kind()
            )),
            Some(_) => self.slots[index] = Some(arg),
        }
        self
    }

    /// Bind an unsigned value to an `Int` parameter.
    pub fn set_int(&mut self, index: usize, value: u32) -> &mut Self {
        match i32::try_from(value) {
            Ok(v) => self.set(index, KernelArg::Int(v)),
            Err(_) => {
                self.errors
                    .push(format!("arg {index}: {value} does not fit a signed 32-bit int"));
                self
            }
        }
    }

    /// Check every position is bound and return the arguments in order.
    pub fn finish(self) -> Result<BoundArgs<'a, B>, GpuError> {
        let mut errors = self.errors;
        let mut args = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(arg) => args.push(arg),
                None => errors.push(format!(
                    "arg {index} ({}): not bound",
                    self.signature.args[index].name
                )),
            }
        }

        if !errors.is_empty() {
            return Err(GpuError::dispatch(
                DispatchStep::BindArguments,
                errors.join("; "),
            ));
        }
        Ok(BoundArgs { args })
    }
}

/// A complete, type-checked argument list in declaration order.
pub struct BoundArgs<'a, B> {
    args: Vec<KernelArg<'a, B>>,
}

impl<'a, B> BoundArgs<'a, B> {
    pub fn args(&self) -> &[KernelArg<'a, B>] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Scalar arguments in declaration order, as raw little-endian words.
    pub fn scalar_words(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            KernelArg::Float(v) => Some(v.to_le_bytes()),
            KernelArg::Int(v) => Some(v.to_le_bytes()),
            KernelArg::Buffer(_) => None,
        })
    }

    /// Buffer arguments in declaration order.
    pub fn buffers(&self) -> impl Iterator<Item = &'a B> + '_ {
        self.args.iter().filter_map(|arg| match arg {
            KernelArg::Buffer(b) => Some(*b),
            _ => None,
        })
    }

    pub fn float(&self, index: usize) -> Option<f32> {
        match self.args.get(index) {
            Some(KernelArg::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, index: usize) -> Option<i32> {
        match self.args.get(index) {
            Some(KernelArg::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buf;

    #[test]
    fn test_mandelbrot_signature_shape() {
        assert_eq!(MANDELBROT_KERNEL.args.len(), 8);
        assert_eq!(MANDELBROT_KERNEL.scalar_count(), 7);
        assert_eq!(MANDELBROT_KERNEL.buffer_count(), 1);
        assert_eq!(MANDELBROT_KERNEL.args[6].kind, ArgKind::Buffer);
        assert_eq!(MANDELBROT_KERNEL.local_size, [256, 1]);
    }

    fn bind_all<'a>(binder: &mut ArgBinder<'a, Buf>, buf: &'a Buf) {
        binder
            .set(0, KernelArg::Float(-0.5))
            .set(1, KernelArg::Float(0.0))
            .set(2, KernelArg::Float(4.5))
            .set(3, KernelArg::Float(50.0))
            .set_int(4, 1200)
            .set_int(5, 640)
            .set(6, KernelArg::Buffer(buf))
            .set_int(7, 1200);
    }

    #[test]
    fn test_complete_binding_preserves_order() {
        let buf = Buf;
        let mut binder = ArgBinder::new(&MANDELBROT_KERNEL);
        bind_all(&mut binder, &buf);
        let bound = binder.finish().unwrap();

        assert_eq!(bound.len(), 8);
        assert_eq!(bound.float(2), Some(4.5));
        assert_eq!(bound.int(4), Some(1200));
        assert_eq!(bound.int(7), Some(1200));
        assert_eq!(bound.buffers().count(), 1);

        let words: Vec<[u8; 4]> = bound.scalar_words().collect();
        assert_eq!(words.len(), 7);
        assert_eq!(words[0], (-0.5f32).to_le_bytes());
        assert_eq!(words[6], 1200i32.to_le_bytes());
    }

    #[test]
    fn test_errors_are_aggregated() {
        let buf = Buf;
        let mut binder = ArgBinder::new(&MANDELBROT_KERNEL);
        bind_all(&mut binder, &buf);
        binder
            .set(2, KernelArg::Int(3)) // Wrong type
            .set(9, KernelArg::Float(1.0)) // Out of range
            .set_int(5, u32::MAX); // Does not fit i32

        let err = binder.finish().err().unwrap();
        match err {
            GpuError::Dispatch { step, message } => {
                assert_eq!(step, DispatchStep::BindArguments);
                assert!(message.contains("arg 2 (magnification): expected float, got int"));
                assert!(message.contains("arg 9: out of range"));
                assert!(message.contains("arg 5: 4294967295"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let mut binder: ArgBinder<'_, Buf> = ArgBinder::new(&MANDELBROT_KERNEL);
        binder.set(0, KernelArg::Float(0.0));
        let err = binder.finish().err().unwrap();
        let text = err.to_string();
        assert!(text.contains("arg 6 (output): not bound"));
        assert!(text.contains("arg 7 (stride): not bound"));
    }
}
