//! Schema validator: turns schema-document tables into checked, typed rules.
//!
//! All cross-rule bookkeeping (`name_set`, the per-frame byte claim bitmaps)
//! lives only on this short-lived value. [`crate::facade::Parser::new`]
//! constructs one, drains every table through it, and drops it before
//! returning — the state never survives into runtime, per SPEC_FULL.md §4.2.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::warn;

use crate::error::{ErrorCode, ErrorCollector};
use crate::rule::{ArrayRule, CmdRule, FixedZoom, FrameId, FrameRule, ParserKind, VarRule, VarType};
use crate::schema::{parse_hex_id, ArrayTable, CmdTable, FrameTable, VarTable};

/// Which bus this parser instance targets. Governs the default frame
/// payload width and whether frame ids are range-checked against the CAN
/// identifier space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    /// Classic CAN: 8-byte payloads, ids checked against the CAN range.
    Classic {
        /// `true` for 29-bit extended ids, `false` for 11-bit standard ids.
        extended: bool,
    },
    /// CAN-FD: up to 64-byte payloads, ids checked against the CAN range.
    CanFd {
        /// `true` for 29-bit extended ids, `false` for 11-bit standard ids.
        extended: bool,
    },
    /// UART: synthetic, auto-incrementing frame ids with per-frame widths
    /// declared explicitly via the schema's `frame` table.
    Uart,
}

fn canid_in_range(id: FrameId, extended: bool) -> bool {
    if extended {
        id <= 0x1FFF_FFFF
    } else {
        id <= 0x7FF
    }
}

fn is_contiguous_ascending(ids: &[FrameId]) -> bool {
    ids.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Scoped construction-time validator state.
pub struct Validator {
    collector: Rc<ErrorCollector>,
    bus: Bus,
    var_array_names: HashSet<String>,
    cmd_names: HashSet<String>,
    frame_lens: HashMap<FrameId, usize>,
    byte_claim: HashMap<FrameId, Vec<u8>>,
    explicit_frame_ids: HashSet<FrameId>,
    warn_count: usize,
}

impl Validator {
    /// Begin a new validation scope for one parser instance.
    #[must_use]
    pub fn new(collector: Rc<ErrorCollector>, bus: Bus) -> Self {
        Self {
            collector,
            bus,
            var_array_names: HashSet::new(),
            cmd_names: HashSet::new(),
            frame_lens: HashMap::new(),
            byte_claim: HashMap::new(),
            explicit_frame_ids: HashSet::new(),
            warn_count: 0,
        }
    }

    /// Number of non-fatal warnings accumulated (e.g. a non-contiguous
    /// explicit array id list).
    #[must_use]
    pub fn warn_count(&self) -> usize {
        self.warn_count
    }

    fn extended(&self) -> bool {
        match self.bus {
            Bus::Classic { extended } | Bus::CanFd { extended } => extended,
            Bus::Uart => false,
        }
    }

    /// Validate and build one `[[frame]]` table entry (UART only). The caller
    /// assigns `frame_id` by document order, starting at 0.
    pub fn build_frame(&mut self, frame_id: FrameId, table: &FrameTable) -> Option<FrameRule> {
        let fault = self.collector.child();

        if table.frame_name.is_empty() {
            fault.log(ErrorCode::IllegalFrameName);
        }
        if !self.explicit_frame_ids.insert(frame_id) {
            fault.log(ErrorCode::SameFrameId);
        }

        if fault.self_count() != 0 {
            return None;
        }

        self.frame_lens.insert(frame_id, table.data_len);
        self.byte_claim
            .entry(frame_id)
            .or_insert_with(|| vec![0u8; table.data_len]);

        Some(FrameRule {
            frame_id,
            frame_name: table.frame_name.clone(),
            data_len: table.data_len,
        })
    }

    /// Resolve a frame's payload width, creating its claim bitmap lazily for
    /// buses where frames are implied rather than declared (classic CAN /
    /// CAN-FD). Returns `None` for UART frame ids that were never declared.
    fn frame_len(&mut self, frame_id: FrameId) -> Option<usize> {
        match self.bus {
            Bus::Classic { .. } => Some(*self.frame_lens.entry(frame_id).or_insert(8)),
            Bus::CanFd { .. } => Some(*self.frame_lens.entry(frame_id).or_insert(64)),
            Bus::Uart => self.frame_lens.get(&frame_id).copied(),
        }
        .inspect(|len| {
            self.byte_claim
                .entry(frame_id)
                .or_insert_with(|| vec![0u8; *len]);
        })
    }

    fn claim_bit(&mut self, frame_id: FrameId, byte_index: u8, mask: u8) {
        let bitmap = self.byte_claim.get_mut(&frame_id).expect("frame_len claims lazily");
        let existing = bitmap[byte_index as usize];
        if existing & mask != 0 {
            self.collector.log(ErrorCode::DataAreaConflict);
            warn!(
                frame_id = format_args!("0x{frame_id:X}"),
                byte = byte_index,
                conflict = %crate::codec::show_conflict(existing & mask),
                "data area decode/encode claimed twice"
            );
        }
        bitmap[byte_index as usize] |= mask;
    }

    fn claim_range(&mut self, frame_id: FrameId, byte_lo: u8, byte_hi: u8) {
        for byte_index in byte_lo..=byte_hi {
            self.claim_bit(frame_id, byte_index, 0xFF);
        }
    }

    /// Validate and build one `[[var]]` table entry. Returns `None` if the
    /// rule was rejected (never admitted into the parser's rule tables).
    pub fn build_var(&mut self, table: &VarTable) -> Option<VarRule> {
        let fault = self.collector.child();

        if table.var_name.is_empty() {
            fault.log(ErrorCode::IllegalName);
        }

        let Some(var_type) = VarType::parse(&table.var_type) else {
            fault.log(ErrorCode::IllegalVarType);
            return None;
        };

        let parser_tag = table.parser_type.as_deref().unwrap_or("auto");
        let parser = match parser_tag {
            "bit" => match table.parser_param.as_slice() {
                &[byte_index, high_bit, low_bit] => Some(ParserKind::Bit { byte_index, high_bit, low_bit }),
                _ => {
                    fault.log(ErrorCode::IllegalParserParamSize);
                    None
                }
            },
            "var" => match table.parser_param.as_slice() {
                &[byte_lo, byte_hi] => Some(ParserKind::Var { byte_lo, byte_hi }),
                _ => {
                    fault.log(ErrorCode::IllegalParserParamSize);
                    None
                }
            },
            _ => ParserKind::infer(&table.parser_param).or_else(|| {
                fault.log(ErrorCode::IllegalParserParamSize);
                None
            }),
        };
        let Some(parser) = parser else { return None };

        if matches!(parser, ParserKind::Bit { .. }) && var_type == VarType::U8Array {
            fault.log(ErrorCode::IllegalParserParamValue);
        }

        let Ok(frame_id) = parse_hex_id(&table.can_id) else {
            fault.log(ErrorCode::IllegalParserParamValue);
            return None;
        };
        if !matches!(self.bus, Bus::Uart) && !canid_in_range(frame_id, self.extended()) {
            fault.log(ErrorCode::CanIdIllegalValue);
        }
        let Some(data_len) = self.frame_len(frame_id) else {
            fault.log(ErrorCode::NoFrameId);
            return None;
        };

        match parser {
            ParserKind::Bit { byte_index, high_bit, low_bit } => {
                if byte_index as usize >= data_len || low_bit > high_bit || high_bit > 7 {
                    fault.log(ErrorCode::IllegalParserParamValue);
                }
            }
            ParserKind::Var { byte_lo, byte_hi } => {
                if byte_lo > byte_hi || byte_hi as usize >= data_len {
                    fault.log(ErrorCode::IllegalParserParamValue);
                }
            }
        }

        let var_zoom = match table.var_zoom {
            Some(zoom) => {
                if !var_type.is_float() {
                    self.warn_count += 1;
                    warn!(var_name = %table.var_name, "var_zoom specified for non-float var_type, ignoring");
                }
                FixedZoom(zoom)
            }
            None => FixedZoom::default(),
        };

        if !self.var_array_names.insert(table.var_name.clone()) {
            fault.log(ErrorCode::SameName);
        }

        if fault.self_count() != 0 {
            return None;
        }

        match parser {
            ParserKind::Bit { byte_index, high_bit, low_bit } => {
                self.claim_bit(frame_id, byte_index, crate::codec::bit_mask(high_bit, low_bit));
            }
            ParserKind::Var { byte_lo, byte_hi } => {
                self.claim_range(frame_id, byte_lo, byte_hi);
            }
        }

        Some(VarRule {
            frame_id,
            var_name: table.var_name.clone(),
            var_type,
            parser,
            var_zoom,
        })
    }

    /// Validate and build one `[[array]]` table entry.
    pub fn build_array(&mut self, table: &ArrayTable) -> Option<ArrayRule> {
        let fault = self.collector.child();

        if table.array_name.is_empty() {
            fault.log(ErrorCode::IllegalName);
        }
        if !self.var_array_names.insert(table.array_name.clone()) {
            fault.log(ErrorCode::SameName);
        }

        let mut ids = Vec::with_capacity(table.can_id.len());
        for raw in &table.can_id {
            match parse_hex_id(raw) {
                Ok(id) => ids.push(id),
                Err(_) => {
                    fault.log(ErrorCode::IllegalParserParamValue);
                    return None;
                }
            }
        }
        let package_num = table.can_package_num;

        let frame_id_map = if ids.len() == package_num {
            let mut seen = HashSet::new();
            let mut map = Vec::with_capacity(package_num);
            for (slot, id) in ids.iter().enumerate() {
                if !seen.insert(*id) {
                    fault.log(ErrorCode::ArraySameCanId);
                }
                map.push((*id, slot));
            }
            if !is_contiguous_ascending(&ids) {
                self.warn_count += 1;
                warn!(array = %table.array_name, "explicit array id list is not strictly increasing by 1");
            }
            map
        } else if package_num > 2 && ids.len() == 2 {
            let (lo, hi) = (ids[0], ids[1]);
            if hi >= lo && (hi - lo + 1) as usize == package_num {
                (lo..=hi).enumerate().map(|(slot, id)| (id, slot)).collect()
            } else {
                fault.log(ErrorCode::IllegalParserParamValue);
                return None;
            }
        } else {
            fault.log(ErrorCode::IllegalParserParamValue);
            return None;
        };

        if !matches!(self.bus, Bus::Uart) {
            for (id, _) in &frame_id_map {
                if !canid_in_range(*id, self.extended()) {
                    fault.log(ErrorCode::CanIdIllegalValue);
                }
            }
        }

        let mut all_max_len = 0usize;
        for (id, _) in &frame_id_map {
            match self.frame_len(*id) {
                Some(len) => all_max_len += len,
                None => {
                    fault.log(ErrorCode::NoFrameId);
                    return None;
                }
            }
        }

        if fault.self_count() != 0 {
            return None;
        }

        for (id, _) in &frame_id_map {
            let len = self.frame_lens[id];
            if len > 0 {
                self.claim_range(*id, 0, (len - 1) as u8);
            }
        }

        Some(ArrayRule {
            array_name: table.array_name.clone(),
            package_num,
            frame_id_map,
            all_max_len,
        })
    }

    /// Validate and build one `[[cmd]]` table entry.
    pub fn build_cmd(&mut self, table: &CmdTable) -> Option<CmdRule> {
        let fault = self.collector.child();

        if table.cmd_name.is_empty() {
            fault.log(ErrorCode::IllegalName);
        }
        if !self.cmd_names.insert(table.cmd_name.clone()) {
            fault.log(ErrorCode::SameName);
        }

        let mut ctrl_data = Vec::with_capacity(table.ctrl_data.len());
        for raw in &table.ctrl_data {
            match parse_hex_id(raw) {
                Ok(v) if v <= 0xFF => ctrl_data.push(v as u8),
                _ => fault.log(ErrorCode::CtrlDataOverflow),
            }
        }
        if ctrl_data.len() > table.ctrl_len as usize {
            fault.log(ErrorCode::CtrlDataOverflow);
        }

        let Ok(frame_id) = parse_hex_id(&table.can_id) else {
            fault.log(ErrorCode::IllegalParserParamValue);
            return None;
        };
        if !matches!(self.bus, Bus::Uart) && !canid_in_range(frame_id, self.extended()) {
            fault.log(ErrorCode::CanIdIllegalValue);
        }
        let Some(data_len) = self.frame_len(frame_id) else {
            fault.log(ErrorCode::NoFrameId);
            return None;
        };
        if table.ctrl_len as usize > data_len {
            fault.log(ErrorCode::CtrlDataOverflow);
        }

        if fault.self_count() != 0 {
            return None;
        }

        Some(CmdRule {
            frame_id,
            cmd_name: table.cmd_name.clone(),
            ctrl_len: table.ctrl_len,
            ctrl_data,
        })
    }
}
