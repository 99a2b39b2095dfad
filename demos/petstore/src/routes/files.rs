use apiweave::prelude::*;
use serde_json::json;

use crate::models::{image_out, image_upload, ImageUpload};
use crate::state::AppState;

async fn upload_image(FileBody(upload): FileBody<ImageUpload>) -> Reply {
    tracing::info!(filename = %upload.image.secure_filename(), size = upload.image.len(), "Image received");
    Reply::new(json!({
        "filename": upload.image.secure_filename(),
        "content_type": upload.image.content_type,
        "size": upload.image.len(),
        "description": upload.description,
    }))
}

pub fn routes() -> RouteGroup<AppState> {
    RouteGroup::new("files").tag("Files").route(
        Route::post("/upload", upload_image)
            .input(image_upload(), Location::Files)
            .output(image_out(), 201),
    )
}
