pub mod page;
pub mod serve;
pub mod upload;

pub use page::index;
pub use serve::serve_image;
pub use upload::{upload_image, UploadResponse};
