pub mod errors;
pub mod extract;
pub mod service;

pub use errors::FileError;
pub use service::{FileContext, FileService, QueryAnswer, UploadReceipt, UploadRequest};
