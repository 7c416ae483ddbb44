//! HTTP/2 error codes (RFC 7540 §11.4 / IANA "HTTP/2 Error Code" registry).

/// Error code carried in `RST_STREAM` and `GOAWAY` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xA,
    EnhanceYourCalm = 0xB,
    InadequateSecurity = 0xC,
    Http11Required = 0xD,
}

impl ErrorCode {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}
