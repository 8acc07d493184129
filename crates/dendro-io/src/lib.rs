//! CSV training frames in, JSON tree summaries out.

mod domain;
mod error;
mod frame_reader;
mod writer;

pub use domain::{ExperimentName, TrainingFrame};
pub use error::IoError;
pub use frame_reader::FrameReader;
pub use writer::{SummaryWriter, SurveyEntry};
