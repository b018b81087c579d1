//! Runnable pipeline object graph and its factory

pub mod factory;
pub mod pipeline;
pub mod step;

pub use factory::{FactoryError, PipelineFactory, PipelineInfo};
pub use pipeline::{Pipeline, UploadedFile};
pub use step::{InputBinding, OutputBinding, Step};
