//! File I/O, validation, and serialization for the crashspot pipeline.

mod domain;
mod error;
mod reader;
mod settings;
mod writer;

pub use domain::{AccidentDataset, ExperimentName};
pub use error::IoError;
pub use reader::AccidentReader;
pub use settings::Settings;
pub use writer::ResultWriter;
