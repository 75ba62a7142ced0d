use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no image selected")]
    NoImage,
    #[error("cannot create a {width}x{height} render context")]
    RenderContext { width: f32, height: f32 },
    #[error("{0}")]
    Decode(#[source] image::ImageError),
    #[error("{0}")]
    Encode(#[source] image::ImageError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("the save worker stopped before reporting a result")]
    SaveWorker,
}

pub type Result<T> = std::result::Result<T, EditorError>;
