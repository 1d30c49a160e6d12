
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod train;

pub use config::{Config, Example, LabeledData, RunParams, SimilarityTable};
pub use error::Error;
pub use graph::AssociationGraph;
pub use pipeline::{Pipeline, PipelineReport};
pub use train::{EarlyStopping, RunReport, TrainParams, Trainer};
