use crate::frame::Frame;

/// Callback-based frame delivery.
pub trait CameraStream {
    type Frame: Frame + Send;
    type Error: std::error::Error;

    /// Start streaming. Callback is invoked on a source thread for each frame.
    ///
    /// Frames are handed over by value; dropping one releases its buffer back
    /// to the source.
    fn start<F>(&mut self, callback: F) -> Result<(), Self::Error>
    where
        F: FnMut(Self::Frame) + Send + 'static;

    fn stop(&mut self) -> Result<(), Self::Error>;
}
