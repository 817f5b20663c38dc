//! Wire-facing error taxonomy (§7).

/// Errors surfaced by `FrameCodec`, `Router`, `ResponseFifo` and `SpiTransport`.
///
/// Variant names are the taxonomy kinds from §7, not implementation details;
/// each carries a short static context string for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Nil input or a buffer too small to hold the frame.
    #[error("arg error: {0}")]
    ArgError(&'static str),

    /// Bad header/tail/type/length while decoding a frame.
    #[error("frame error: {0}")]
    FrameError(&'static str),

    /// A semantically out-of-range field, or a resource exhaustion/safety
    /// rejection surfaced through the frame layer.
    #[error("range error: {0}")]
    RangeError(&'static str),

    /// SPI RX queue full or response FIFO full.
    #[error("overflow: {0}")]
    Overflow(&'static str),

    /// DMA error or peripheral not ready after retry.
    #[error("hardware fault: {0}")]
    HardwareFault(&'static str),
}

impl CoreError {
    /// Short machine-stable tag, useful for metrics/log fields.
    pub const fn tag(&self) -> &'static str {
        match self {
            CoreError::ArgError(_) => "arg_error",
            CoreError::FrameError(_) => "frame_error",
            CoreError::RangeError(_) => "range_error",
            CoreError::Overflow(_) => "overflow",
            CoreError::HardwareFault(_) => "hardware_fault",
        }
    }
}
