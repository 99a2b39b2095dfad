mod app;
mod json_path;
mod multipart;

pub use app::{TestApp, TestRequest, TestResponse};
pub use json_path::{resolve_path, JsonPath, Step};
pub use multipart::MultipartForm;
