pub mod invoker;
pub mod metrics;
pub mod payload;
pub mod providers;
pub mod upload;

pub use invoker::{GenerationResult, ModelInvoker};
pub use payload::ModelPart;
pub use upload::{TempUpload, UploadForm};
