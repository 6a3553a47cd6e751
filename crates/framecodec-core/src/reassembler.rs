//! Per-array multi-frame reassembly state machine.
//!
//! Each [`ArrayRule`] owns exactly one [`ArrayState`], mutated only while
//! decoding frames for that array's declared frame ids. State is never
//! shared across parser instances and is not `Sync`.

use tracing::warn;

use crate::error::{ErrorCode, ErrorCollector};
use crate::registry::DataEntry;
use crate::rule::{ArrayRule, FrameId};

/// Mutable reassembly progress for one array rule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArrayState {
    /// Slot index the next accepted frame must fill.
    pub expected_slot: usize,
    /// Byte offset in the host buffer the next accepted frame writes to.
    pub write_cursor: usize,
}

/// Outcome of feeding one frame to the reassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// This array rule does not claim `frame_id`.
    NotClaimed,
    /// Frame accepted in order; array not yet complete.
    Progressed,
    /// Frame accepted in order and completed the array (`loaded` was set).
    Completed,
    /// Frame arrived out of order; state was reset to `(0, 0)`.
    Resynced,
    /// The host entry for this array is missing from the registry.
    NoLink,
    /// The host entry is too small to hold `all_max_len` bytes.
    TooSmall,
}

/// Feed one decoded frame to `rule`'s reassembler, mutating `state` and
/// `entry` (when present) in place.
pub fn ingest(
    rule: &ArrayRule,
    state: &mut ArrayState,
    entry: Option<&mut DataEntry>,
    frame_id: FrameId,
    payload: &[u8],
    collector: &ErrorCollector,
) -> IngestOutcome {
    let Some(slot) = rule.slot_for_frame(frame_id) else {
        return IngestOutcome::NotClaimed;
    };

    let Some(entry) = entry else {
        collector.log(ErrorCode::NoLink);
        return IngestOutcome::NoLink;
    };

    if entry.len() < rule.all_max_len {
        collector.log(ErrorCode::IllegalParserParamValue);
        return IngestOutcome::TooSmall;
    }

    if slot == state.expected_slot {
        let end = state.write_cursor + payload.len();
        entry.addr[state.write_cursor..end].copy_from_slice(payload);
        state.expected_slot += 1;
        state.write_cursor = end;

        if slot == rule.package_num - 1 {
            entry.loaded = true;
            state.expected_slot = 0;
            state.write_cursor = 0;
            IngestOutcome::Completed
        } else {
            IngestOutcome::Progressed
        }
    } else {
        let expected_id = rule.frame_id_for_slot(state.expected_slot);
        warn!(
            array = %rule.array_name,
            got = format_args!("0x{frame_id:X}"),
            expected = ?expected_id.map(|id| format!("0x{id:X}")),
            "array frame arrived out of order, resyncing"
        );
        collector.log(ErrorCode::UnexpectedOrderPackage);
        state.expected_slot = 0;
        state.write_cursor = 0;
        IngestOutcome::Resynced
    }
}
