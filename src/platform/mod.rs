#[cfg(feature = "gl")]
pub mod gl;
pub mod software;
pub mod synthetic;
