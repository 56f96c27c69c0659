// src/config/mod.rs
pub mod credentials;
pub mod pipeline;

pub use credentials::Credentials;
pub use pipeline::{PipelineConfig, ReportConfig, SourcesConfig, SynthesisConfig};
