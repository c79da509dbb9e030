use crate::reassemble;
use crate::types::Size;

/// A pluggable transformation from an NV21 frame to an 8-bit luminance image.
///
/// Contract:
/// - `input` is an NV21 frame of `size` (at least the luma plane is present).
/// - `output` is exactly `size.pixel_count()` bytes; the processor must write
///   all of it. The caller zero-fills it beforehand, so a processor that gives
///   up early leaves black pixels rather than stale ones.
/// - Neither buffer may be retained past the call, and consecutive calls may
///   use different sizes.
pub trait FrameProcessor: Send {
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]);

    fn name(&self) -> &str;
}

impl<P: FrameProcessor + ?Sized> FrameProcessor for Box<P> {
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]) {
        (**self).process(input, size, output)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Copies the luma plane through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl FrameProcessor for Passthrough {
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]) {
        match reassemble::luma(input, size) {
            Some(luma) if luma.len() == output.len() => output.copy_from_slice(luma),
            _ => {
                tracing::warn!(
                    input_len = input.len(),
                    output_len = output.len(),
                    "passthrough input shorter than its luma plane"
                );
                output.fill(0);
            }
        }
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Adapts a closure into a [`FrameProcessor`].
pub struct FnProcessor<F> {
    name: String,
    f: F,
}

impl<F> FnProcessor<F>
where
    F: FnMut(&[u8], Size, &mut [u8]) + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        FnProcessor {
            name: name.into(),
            f,
        }
    }
}

impl<F> FrameProcessor for FnProcessor<F>
where
    F: FnMut(&[u8], Size, &mut [u8]) + Send,
{
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]) {
        (self.f)(input, size, output)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Signature of a native processing entry point:
/// `(input, input_len, width, height, output)`, writing `width * height`
/// bytes to `output`.
pub type NativeProcessFn =
    unsafe extern "C" fn(input: *const u8, input_len: usize, width: i32, height: i32, output: *mut u8);

/// A processor implemented by a foreign library.
pub struct NativeProcessor {
    name: String,
    entry: NativeProcessFn,
}

impl NativeProcessor {
    /// Wrap a native entry point.
    ///
    /// # Safety
    ///
    /// `entry` must read at most `input_len` bytes from `input`, write exactly
    /// `width * height` bytes to `output`, keep no pointer to either buffer
    /// after returning and never unwind across the boundary.
    pub unsafe fn new(name: impl Into<String>, entry: NativeProcessFn) -> Self {
        NativeProcessor {
            name: name.into(),
            entry,
        }
    }
}

impl FrameProcessor for NativeProcessor {
    fn process(&mut self, input: &[u8], size: Size, output: &mut [u8]) {
        let (Ok(width), Ok(height)) = (i32::try_from(size.width), i32::try_from(size.height))
        else {
            tracing::warn!(?size, "frame too large for native processor");
            output.fill(0);
            return;
        };
        if output.len() != size.pixel_count() || input.len() < size.pixel_count() {
            tracing::warn!(
                ?size,
                input_len = input.len(),
                output_len = output.len(),
                "native processor buffers do not match frame size"
            );
            output.fill(0);
            return;
        }
        // SAFETY: lengths checked above; the constructor's contract covers the rest.
        unsafe {
            (self.entry)(input.as_ptr(), input.len(), width, height, output.as_mut_ptr());
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_copies_luma_only() {
        let size = Size::new(2, 2);
        let nv21 = [1, 2, 3, 4, 90, 91];
        let mut out = [0u8; 4];
        Passthrough.process(&nv21, size, &mut out);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn passthrough_zero_fills_on_short_input() {
        let mut out = [7u8; 4];
        Passthrough.process(&[1, 2], Size::new(2, 2), &mut out);
        assert_eq!(out, [0; 4]);
    }

    unsafe extern "C" fn invert(input: *const u8, _len: usize, w: i32, h: i32, output: *mut u8) {
        let n = (w * h) as usize;
        // SAFETY: the caller guarantees both buffers hold `n` bytes.
        let (src, dst) = unsafe {
            (
                std::slice::from_raw_parts(input, n),
                std::slice::from_raw_parts_mut(output, n),
            )
        };
        for (d, s) in dst.iter_mut().zip(src) {
            *d = 255 - s;
        }
    }

    #[test]
    fn native_processor_calls_through() {
        let mut p = unsafe { NativeProcessor::new("invert", invert) };
        let mut out = [0u8; 4];
        p.process(&[0, 10, 20, 255, 0, 0], Size::new(2, 2), &mut out);
        assert_eq!(out, [255, 245, 235, 0]);
        assert_eq!(p.name(), "invert");
    }

    #[test]
    fn native_processor_refuses_mismatched_output() {
        let mut p = unsafe { NativeProcessor::new("invert", invert) };
        let mut out = [5u8; 3];
        p.process(&[0; 6], Size::new(2, 2), &mut out);
        assert_eq!(out, [0; 3]);
    }

    #[test]
    fn boxed_closure_processor() {
        let mut p: Box<dyn FrameProcessor> =
            Box::new(FnProcessor::new("fill", |_: &[u8], _: Size, out: &mut [u8]| {
                out.fill(42)
            }));
        let mut out = [0u8; 3];
        p.process(&[], Size::new(3, 1), &mut out);
        assert_eq!(out, [42; 3]);
        assert_eq!(p.name(), "fill");
    }
}
