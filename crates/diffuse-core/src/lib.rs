//! Types shared by the image service and the protocol adapter

mod error;
mod types;

pub use error::HttpError;
pub use types::{ErrorBody, GenerateRequest, ImageMetadata, PNG_CONTENT_TYPE};
