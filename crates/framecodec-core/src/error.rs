//! Error types and the fault-accumulation tree for the framecodec engine.
//!
//! Two different failure channels coexist here, deliberately:
//!
//! - [`SchemaError`] is a `thiserror`-derived, `Result`-returning error for
//!   failures that make a schema document unusable at all (bad TOML, a
//!   missing required key). These abort [`crate::schema::SchemaDocument`]
//!   parsing outright.
//! - [`ErrorCode`] plus [`ErrorCollector`] is a pure accumulate-and-report
//!   structure: individual rule faults never abort construction, they are
//!   logged and counted so the parser can still admit every healthy rule.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

/// Failures that prevent a schema document from being parsed at all.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document text was not valid TOML.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// A hex identifier string did not match `/0x[0-9a-fA-F]+/`.
    #[error("malformed hex identifier {0:?}")]
    MalformedHexId(String),
}

/// Closed enumeration of every fault the validator and runtime can log.
///
/// Named after the taxonomy of the reference C++ parser this engine is
/// modeled on, flattened into idiomatic Rust casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `var_name` / `array_name` / `cmd_name` was empty.
    IllegalName,
    /// `var_type` string did not match a known [`crate::rule::VarType`].
    IllegalVarType,
    /// `parser_param` had the wrong number of elements for its form.
    IllegalParserParamSize,
    /// `parser_param` elements were out of range for their form.
    IllegalParserParamValue,
    /// A `frame` table had an empty `frame_name`.
    IllegalFrameName,
    /// Two var/array rules claimed the same name.
    SameName,
    /// Two frame rules claimed the same `frame_id`.
    SameFrameId,
    /// Two slots of the same array claimed the same frame id.
    ArraySameCanId,
    /// `ctrl_data` overflowed `ctrl_len` or a byte did not fit in 8 bits.
    CtrlDataOverflow,
    /// Two rules claimed overlapping bits within the same frame (diagnostic only).
    DataAreaConflict,
    /// A `double` var rule had a width outside `{2,4,8}`.
    DoubleSimplify,
    /// A `float` var rule had a width outside `{2,4}`.
    FloatSimplify,
    /// `transport.send_frame` returned `false`.
    SendFailure,
    /// A var/array name was absent from the host data registry.
    NoLink,
    /// Destination buffer too small to hold the decoded value.
    SizeOverflow,
    /// Source buffer width did not match the target type's native width.
    SizeMismatch,
    /// An array frame arrived out of its declared slot order.
    UnexpectedOrderPackage,
    /// A frame rule referenced no frame id at all.
    NoFrameId,
    /// Encode call mixed classic CAN and CAN-FD framing.
    MixUse,
    /// A frame id fell outside the bus's addressable identifier range.
    CanIdIllegalValue,
}

/// A node in the parent/child fault-counter tree.
///
/// Each parser instance owns one root collector; sub-checks (e.g. one per
/// rule under construction) can spawn linked children via [`Self::child`]
/// so a single rule's fault count can be inspected in isolation before it
/// is admitted into the rule tables.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    counts: RefCell<HashMap<ErrorCode, usize>>,
    children: RefCell<Vec<Rc<ErrorCollector>>>,
}

impl ErrorCollector {
    /// Create a fresh root collector.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Spawn a linked child collector whose counts roll up into `all_count`.
    #[must_use]
    pub fn child(self: &Rc<Self>) -> Rc<Self> {
        let child = Rc::new(Self::default());
        self.children.borrow_mut().push(Rc::clone(&child));
        child
    }

    /// Record one occurrence of `code` against this node.
    pub fn log(&self, code: ErrorCode) {
        *self.counts.borrow_mut().entry(code).or_insert(0) += 1;
    }

    /// Number of faults logged directly against this node (not children).
    #[must_use]
    pub fn self_count(&self) -> usize {
        self.counts.borrow().values().sum()
    }

    /// Number of faults logged against this node and every descendant.
    #[must_use]
    pub fn all_count(&self) -> usize {
        self.self_count()
            + self
                .children
                .borrow()
                .iter()
                .map(|c| c.all_count())
                .sum::<usize>()
    }
}
