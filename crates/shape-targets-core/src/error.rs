/// Errors raised when wrapping or processing raw image buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image has zero size (width={width}, height={height})")]
    ZeroSize { width: usize, height: usize },
    #[error("image buffer length mismatch (expected {expected} bytes, got {got})")]
    BufferSize { expected: usize, got: usize },
    #[error("image size mismatch ({a_width}x{a_height} vs {b_width}x{b_height})")]
    SizeMismatch {
        a_width: usize,
        a_height: usize,
        b_width: usize,
        b_height: usize,
    },
    #[error("kernel is empty or its offset ({offset}) is outside its width ({width})")]
    InvalidKernel { width: usize, offset: usize },
}
