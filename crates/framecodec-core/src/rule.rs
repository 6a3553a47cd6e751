//! Typed rule model: the in-memory shape every schema table is compiled into.
//!
//! Rules are immutable once admitted by [`crate::validator::Validator`],
//! except for the array reassembler's own runtime counters (see
//! [`crate::reassembler`]).

/// Wire identifier for one frame. Standard CAN is `0..=0x7FF`, extended CAN
/// `0..=0x1FFFFFFF`, UART ids are synthetic and auto-incrementing.
pub type FrameId = u32;

/// A frame declared by the schema, either directly (`frame` table, UART) or
/// implicitly (the first var/array/cmd rule that references a given id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRule {
    /// Wire identifier.
    pub frame_id: FrameId,
    /// Human-readable name, used only for diagnostics.
    pub frame_name: String,
    /// Payload width in bytes (8 for classic CAN, up to 64 for CAN-FD).
    pub data_len: usize,
}

/// The scalar kind a var rule decodes into / encodes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Boolean, stored as a single byte.
    Bool,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// IEEE-754 single precision, optionally stored as a scaled integer.
    Float,
    /// IEEE-754 double precision, optionally stored as a scaled integer.
    Double,
    /// Raw byte array, copied verbatim.
    U8Array,
}

impl VarType {
    /// Parse the schema's string tag (`"u16"`, `"float"`, ...).
    pub fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "bool" => Self::Bool,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "float" => Self::Float,
            "double" => Self::Double,
            "u8_array" => Self::U8Array,
            _ => return None,
        })
    }

    /// Native byte width of the scalar type. `U8Array` has no fixed width.
    #[must_use]
    pub fn native_width(self) -> Option<usize> {
        Some(match self {
            Self::Bool | Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::Float => 4,
            Self::U64 | Self::I64 | Self::Double => 8,
            Self::U8Array => return None,
        })
    }

    /// Whether this type carries an IEEE float representation.
    #[must_use]
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

/// How a var rule's bytes are located within the frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Bit-slice extraction: `byte_index`, inclusive `high_bit`/`low_bit` (0..=7).
    Bit {
        /// Byte offset within the payload.
        byte_index: u8,
        /// Highest bit of the slice, inclusive.
        high_bit: u8,
        /// Lowest bit of the slice, inclusive.
        low_bit: u8,
    },
    /// Big-endian byte-range extraction: inclusive `[byte_lo, byte_hi]`.
    Var {
        /// First byte of the range, inclusive.
        byte_lo: u8,
        /// Last byte of the range, inclusive.
        byte_hi: u8,
    },
}

impl ParserKind {
    /// Infer the parser kind from raw `parser_param` length, as the schema's
    /// `"auto"` tag does: 3 elements is a bit-slice, 2 is a byte range.
    #[must_use]
    pub fn infer(params: &[u8]) -> Option<Self> {
        match params {
            [byte_index, high_bit, low_bit] => Some(Self::Bit {
                byte_index: *byte_index,
                high_bit: *high_bit,
                low_bit: *low_bit,
            }),
            [byte_lo, byte_hi] => Some(Self::Var {
                byte_lo: *byte_lo,
                byte_hi: *byte_hi,
            }),
            _ => None,
        }
    }

    /// Width in bytes this rule occupies.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::Bit { .. } => 1,
            Self::Var { byte_lo, byte_hi } => (byte_hi - byte_lo) as usize + 1,
        }
    }
}

/// A single field extracted from (or packed into) one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRule {
    /// Owning frame id.
    pub frame_id: FrameId,
    /// Name under which this field is registered in the data map.
    pub var_name: String,
    /// Target scalar type.
    pub var_type: VarType,
    /// Extraction form.
    pub parser: ParserKind,
    /// Float/double scale factor, applied as `decoded * var_zoom` on decode
    /// and `raw / var_zoom` on encode. Defaults to `1.0` (bit-identical as
    /// `1_000_000` fixed-point, see [`crate::codec`]).
    pub var_zoom: FixedZoom,
}

/// `var_zoom` stored as a fixed-point ratio to keep [`VarRule`] `Eq`.
///
/// The schema only ever supplies a handful of significant digits, so we keep
/// the originally-parsed `f64` alongside an integer numerator for equality
/// and hashing, and always compute with the `f64`.
#[derive(Debug, Clone, Copy)]
pub struct FixedZoom(pub f64);

impl Default for FixedZoom {
    fn default() -> Self {
        Self(1.0)
    }
}

impl PartialEq for FixedZoom {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for FixedZoom {}

/// A logical multi-frame buffer, correlated by a declared frame-id → slot map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayRule {
    /// Name under which the reassembled buffer is registered.
    pub array_name: String,
    /// Number of frames that make up one complete array.
    pub package_num: usize,
    /// `frame_id -> slot index (0..package_num)`, a permutation of `0..package_num`.
    pub frame_id_map: Vec<(FrameId, usize)>,
    /// Sum of every constituent frame's `data_len`; the minimum host buffer size.
    pub all_max_len: usize,
}

impl ArrayRule {
    /// Inverse lookup used only for diagnostics: which frame id was expected
    /// at a given slot.
    #[must_use]
    pub fn frame_id_for_slot(&self, slot: usize) -> Option<FrameId> {
        self.frame_id_map
            .iter()
            .find(|(_, s)| *s == slot)
            .map(|(id, _)| *id)
    }

    /// Slot index for a given frame id, if this array claims it.
    #[must_use]
    pub fn slot_for_frame(&self, frame_id: FrameId) -> Option<usize> {
        self.frame_id_map
            .iter()
            .find(|(id, _)| *id == frame_id)
            .map(|(_, slot)| slot)
            .copied()
    }
}

/// A named outbound command prototype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdRule {
    /// Frame id the command is sent on.
    pub frame_id: FrameId,
    /// Name used to look the command up at encode time.
    pub cmd_name: String,
    /// Number of leading bytes reserved for `ctrl_data`.
    pub ctrl_len: u8,
    /// Fixed control bytes written at the start of every encoded frame.
    pub ctrl_data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_type_parse_round_trips_known_tags() {
        for tag in [
            "bool", "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "float", "double",
            "u8_array",
        ] {
            assert!(VarType::parse(tag).is_some(), "{tag} should parse");
        }
        assert!(VarType::parse("nonsense").is_none());
    }

    #[test]
    fn parser_kind_infer_disambiguates_by_arity() {
        assert_eq!(
            ParserKind::infer(&[0, 3, 1]),
            Some(ParserKind::Bit {
                byte_index: 0,
                high_bit: 3,
                low_bit: 1,
            })
        );
        assert_eq!(
            ParserKind::infer(&[2, 3]),
            Some(ParserKind::Var {
                byte_lo: 2,
                byte_hi: 3,
            })
        );
        assert_eq!(ParserKind::infer(&[1]), None);
    }

    #[test]
    fn array_rule_slot_lookup_is_bidirectional() {
        let rule = ArrayRule {
            array_name: "img".into(),
            package_num: 3,
            frame_id_map: vec![(0x400, 0), (0x401, 1), (0x402, 2)],
            all_max_len: 24,
        };
        assert_eq!(rule.slot_for_frame(0x401), Some(1));
        assert_eq!(rule.frame_id_for_slot(2), Some(0x402));
        assert_eq!(rule.slot_for_frame(0x999), None);
    }
}
