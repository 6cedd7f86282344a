pub mod batch;
pub mod document;
pub mod handlers;
pub mod upload;

pub use batch::{BatchError, BatchEvaluator};
pub use document::PdfTextReader;
pub use upload::UploadLimits;
