use thiserror::Error;

/// Recoverable recording error.
///
/// Sticky for the frame: once set it is reported by `Context::error` until the
/// next `Context::draw`, which drops the whole frame and clears it.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RecordError {
    #[error("vertex buffer is full")]
    VerticesFull,
    #[error("uniform buffer is full")]
    UniformsFull,
    #[error("command buffer is full")]
    CommandsFull,
    #[error("matrix stack overflow")]
    StackOverflow,
    #[error("matrix stack underflow")]
    StackUnderflow,
}
