//! The transport capability this crate consumes, and the wire [`Frame`]
//! value passed across it.
//!
//! The transport device itself — the real CAN/UART driver — is out of
//! scope; only its capability interface is modeled, as a trait the facade
//! calls into during `encode_all`/`encode_cmd`.

use crate::rule::FrameId;

/// Maximum payload this crate backs a frame with, regardless of bus. Classic
/// CAN uses the first 8 bytes; CAN-FD and UART may use up to all 64.
pub const MAX_FRAME_LEN: usize = 64;

/// A stack-owned frame: identifier plus a fixed backing array and an
/// explicit valid length. Never boxed or heap-allocated — the reference
/// implementation's raw per-call heap frame is re-architected as this stack
/// value (see SPEC_FULL.md §9).
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// Wire identifier.
    pub id: FrameId,
    /// Number of valid bytes in `data`.
    pub len: u8,
    /// Backing storage; bytes at `[0, len)` are meaningful.
    pub data: [u8; MAX_FRAME_LEN],
}

impl Frame {
    /// Construct a zeroed frame for `id` with `len` valid bytes.
    #[must_use]
    pub fn zeroed(id: FrameId, len: usize) -> Self {
        Self {
            id,
            len: len as u8,
            data: [0u8; MAX_FRAME_LEN],
        }
    }

    /// The valid payload slice.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The valid payload slice, mutably.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let len = self.len as usize;
        &mut self.data[..len]
    }
}

/// Capability to hand a fully-packed frame off to the bus.
///
/// `send_frame` returns `true` on successful enqueue; a `false` return is
/// logged by the facade as [`crate::error::ErrorCode::SendFailure`] and does
/// not abort the remainder of an `encode_all` call.
pub trait SendFrame {
    /// Enqueue `frame` for transmission.
    fn send_frame(&mut self, frame: &Frame) -> bool;
}

/// Test/demo transport that records every frame it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    /// Every frame passed to [`SendFrame::send_frame`], in order.
    pub sent: Vec<Frame>,
}

impl SendFrame for RecordingTransport {
    fn send_frame(&mut self, frame: &Frame) -> bool {
        self.sent.push(*frame);
        true
    }
}
