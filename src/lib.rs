pub mod edges;
pub mod error;
pub mod frame;
pub mod mailbox;
pub mod pipeline;
pub mod platform;
pub mod pool;
pub mod presenter;
pub mod process;
pub mod reassemble;
pub mod stream;
pub mod telemetry;
pub mod types;

// Re-exports
pub use error::*;
pub use frame::*;
pub use pipeline::{EdgeToggle, Pipeline, PipelineConfig, PipelineStats};
pub use presenter::{DisplayFrame, FrameSubmitter, Presenter, PresenterConfig, RenderBackend};
pub use process::FrameProcessor;
pub use stream::*;
pub use types::*;
