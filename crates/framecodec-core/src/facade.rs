//! The public entry point: [`Parser`] turns one [`SchemaDocument`] into a
//! working codec instance, and `decode`/`encode_cmd`/`encode_all` are the
//! only calls a host application needs at runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::codec;
use crate::error::{ErrorCode, ErrorCollector};
use crate::reassembler::{self, ArrayState, IngestOutcome};
use crate::registry::{DataEntry, DataRegistry};
use crate::rule::{ArrayRule, CmdRule, FrameId, FrameRule, VarRule};
use crate::schema::SchemaDocument;
use crate::transport::{Frame, SendFrame};
use crate::validator::{Bus, Validator};

/// Result of one [`Parser::decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOutcome {
    /// Every entry in the registry was `loaded` once this call finished. The
    /// registry is cleared back to all-unloaded before this returns `true`,
    /// so callers see each completed cycle exactly once (edge-trigger).
    pub all_loaded: bool,
    /// A decode-time fault (`NoLink`, reassembler desync, ...) was logged.
    pub error: bool,
}

/// Which CAN framing a caller is asking [`Parser::encode_cmd`] to build.
///
/// A parser instance is fixed to one bus at construction (classic CAN or
/// CAN-FD); asking it to encode the other kind is a caller error, not a
/// recoverable one — it returns `false` and logs [`ErrorCode::MixUse`]
/// rather than silently building the wrong frame width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// 8-byte classic CAN payload.
    Classic,
    /// Up to 64-byte CAN-FD payload.
    CanFd,
}

/// A fully validated, ready-to-run codec instance for one schema document.
///
/// Construction (`Parser::new`) is the only place faults are produced; every
/// admitted rule is guaranteed internally consistent from then on.
pub struct Parser {
    bus: Bus,
    instance_name: String,
    vars: Vec<VarRule>,
    arrays: Vec<ArrayRule>,
    cmds: Vec<CmdRule>,
    frames: Vec<FrameRule>,
    array_states: RefCell<HashMap<String, ArrayState>>,
    collector: Rc<ErrorCollector>,
}

impl Parser {
    /// Validate `schema` and build a parser instance. Returns the parser
    /// alongside the total number of faults logged while admitting rules —
    /// a non-zero count does not prevent construction, it only means some
    /// declared rules were dropped.
    #[must_use]
    pub fn new(
        error_node: &Rc<ErrorCollector>,
        schema: &SchemaDocument,
        instance_name: impl Into<String>,
    ) -> (Self, usize) {
        let instance_name = instance_name.into();
        let bus = if !schema.frame.is_empty() {
            Bus::Uart
        } else if schema.canfd_enable {
            Bus::CanFd { extended: schema.extended_frame }
        } else {
            Bus::Classic { extended: schema.extended_frame }
        };

        let mut validator = Validator::new(Rc::clone(error_node), bus);

        let frames: Vec<FrameRule> = schema
            .frame
            .iter()
            .enumerate()
            .filter_map(|(index, table)| validator.build_frame(index as FrameId, table))
            .collect();

        let vars: Vec<VarRule> = schema.var.iter().filter_map(|table| validator.build_var(table)).collect();
        let arrays: Vec<ArrayRule> = schema.array.iter().filter_map(|table| validator.build_array(table)).collect();
        let cmds: Vec<CmdRule> = schema.cmd.iter().filter_map(|table| validator.build_cmd(table)).collect();

        let array_states = arrays.iter().map(|a| (a.array_name.clone(), ArrayState::default())).collect();

        let fault_count = error_node.all_count();
        info!(
            instance = %instance_name,
            vars = vars.len(),
            arrays = arrays.len(),
            cmds = cmds.len(),
            faults = fault_count,
            warnings = validator.warn_count(),
            "parser instance constructed"
        );

        (
            Self {
                bus,
                instance_name,
                vars,
                arrays,
                cmds,
                frames,
                array_states: RefCell::new(array_states),
                collector: Rc::clone(error_node),
            },
            fault_count,
        )
    }

    /// Every frame id this instance needs delivered to [`Self::decode`], for
    /// wiring a transport's receive filter.
    #[must_use]
    pub fn receive_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self
            .vars
            .iter()
            .map(|v| v.frame_id)
            .chain(self.arrays.iter().flat_map(|a| a.frame_id_map.iter().map(|(id, _)| *id)))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Register one host-owned [`DataEntry`] per admitted var and array
    /// rule, sized correctly, and return the populated registry.
    #[must_use]
    pub fn build_registry(&self) -> DataRegistry {
        let mut registry = DataRegistry::new();
        for rule in &self.vars {
            let width = rule.parser.width();
            registry.register(rule.var_name.clone(), DataEntry::for_var(rule.var_type, width));
        }
        for rule in &self.arrays {
            registry.register(rule.array_name.clone(), DataEntry::for_array(rule.all_max_len));
        }
        registry
    }

    /// Feed one received frame through every var and array rule that claims
    /// `frame_id`, writing decoded values into `data`.
    ///
    /// `all_loaded` is edge-triggered: once every registered entry reports
    /// `loaded == true`, this call clears every entry's `loaded` flag back
    /// to `false` before returning, so a caller observes each completed
    /// cycle exactly once.
    pub fn decode(&self, data: &mut DataRegistry, frame_id: FrameId, payload: &[u8]) -> DecodeOutcome {
        let mut error = false;

        for rule in self.vars.iter().filter(|r| r.frame_id == frame_id) {
            let Some(entry) = data.get_mut(&rule.var_name) else {
                self.collector.log(ErrorCode::NoLink);
                error = true;
                continue;
            };
            if !codec::unpack(rule, payload, entry, &self.collector) {
                error = true;
            }
        }

        for rule in &self.arrays {
            if rule.slot_for_frame(frame_id).is_none() {
                continue;
            }
            let mut states = self.array_states.borrow_mut();
            let state = states.entry(rule.array_name.clone()).or_default();
            let entry = data.get_mut(&rule.array_name);
            let outcome = reassembler::ingest(rule, state, entry, frame_id, payload, &self.collector);
            match outcome {
                IngestOutcome::Completed => {
                    debug!(array = %rule.array_name, "array reassembled");
                }
                IngestOutcome::Resynced | IngestOutcome::NoLink | IngestOutcome::TooSmall => {
                    warn!(array = %rule.array_name, outcome = ?outcome, "array ingest did not progress");
                    error = true;
                }
                IngestOutcome::Progressed | IngestOutcome::NotClaimed => {}
            }
        }

        let all_loaded = data.all_loaded();
        if all_loaded {
            data.clear_all_loaded();
        }

        DecodeOutcome { all_loaded, error }
    }

    fn frame_len(&self, frame_id: FrameId) -> usize {
        match self.bus {
            Bus::Uart => self
                .frames
                .iter()
                .find(|f| f.frame_id == frame_id)
                .map_or(0, |f| f.data_len),
            Bus::Classic { .. } => 8,
            Bus::CanFd { .. } => 64,
        }
    }

    /// Build an outbound frame for the named command, writing `ctrl_data`
    /// followed by `payload`. Returns `false` (logging
    /// [`ErrorCode::NoLink`]) if `cmd_name` is not a registered command, or
    /// (logging [`ErrorCode::MixUse`], without looking the command up) if
    /// `requested` does not match the bus this instance was built for.
    /// Returns `false` (logging [`ErrorCode::IllegalParserParamValue`]) if
    /// `ctrl_len + payload.len()` overflows the frame's data length; the
    /// ctrl data and whatever of `payload` fits are still packed.
    pub fn encode_cmd(&self, cmd_name: &str, payload: &[u8], out: &mut Frame, requested: FrameKind) -> bool {
        let mismatched = matches!(
            (requested, self.bus),
            (FrameKind::Classic, Bus::CanFd { .. }) | (FrameKind::CanFd, Bus::Classic { .. })
        );
        if mismatched {
            self.collector.log(ErrorCode::MixUse);
            return false;
        }

        let Some(rule) = self.cmds.iter().find(|c| c.cmd_name == cmd_name) else {
            self.collector.log(ErrorCode::NoLink);
            return false;
        };
        let data_len = self.frame_len(rule.frame_id);
        *out = Frame::zeroed(rule.frame_id, data_len);
        let body = out.payload_mut();
        body[..rule.ctrl_data.len()].copy_from_slice(&rule.ctrl_data);
        let tail_start = rule.ctrl_len as usize;
        let wanted_end = tail_start + payload.len();
        let tail_end = wanted_end.min(body.len());
        body[tail_start..tail_end].copy_from_slice(&payload[..tail_end - tail_start]);

        if wanted_end > body.len() {
            self.collector.log(ErrorCode::IllegalParserParamValue);
            return false;
        }
        true
    }

    /// Pack every registered var rule's current value into its frame and
    /// hand each resulting frame to `transport`, then do the same for every
    /// array rule, splitting its reassembled buffer back into one frame per
    /// declared slot. One frame is built and sent per distinct frame id that
    /// at least one var rule targets; encode failures for individual rules
    /// are logged but do not prevent the rest of the frame from being sent.
    pub fn encode_all(&self, data: &DataRegistry, transport: &mut impl SendFrame) -> bool {
        let mut by_frame: HashMap<FrameId, Frame> = HashMap::new();
        for rule in &self.vars {
            let frame = by_frame
                .entry(rule.frame_id)
                .or_insert_with(|| Frame::zeroed(rule.frame_id, self.frame_len(rule.frame_id)));
            let Some(entry) = data.get(&rule.var_name) else {
                self.collector.log(ErrorCode::NoLink);
                continue;
            };
            codec::pack(rule, entry, frame.payload_mut(), &self.collector);
        }

        let mut all_sent = true;
        for frame in by_frame.values() {
            if !transport.send_frame(frame) {
                self.collector.log(ErrorCode::SendFailure);
                all_sent = false;
            }
        }

        for rule in &self.arrays {
            let Some(entry) = data.get(&rule.array_name) else {
                self.collector.log(ErrorCode::NoLink);
                all_sent = false;
                continue;
            };
            if entry.addr.len() != rule.all_max_len {
                self.collector.log(ErrorCode::IllegalParserParamValue);
                all_sent = false;
                continue;
            }

            let mut cursor = 0;
            for slot in 0..rule.package_num {
                let Some(frame_id) = rule.frame_id_for_slot(slot) else {
                    continue;
                };
                let frame_len = self.frame_len(frame_id);
                let mut frame = Frame::zeroed(frame_id, frame_len);
                frame.payload_mut().copy_from_slice(&entry.addr[cursor..cursor + frame_len]);
                cursor += frame_len;

                if !transport.send_frame(&frame) {
                    self.collector.log(ErrorCode::SendFailure);
                    all_sent = false;
                }
            }
        }

        all_sent
    }

    /// Instance name this parser was constructed with (diagnostics only).
    #[must_use]
    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }
}
