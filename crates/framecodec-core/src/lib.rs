//! # framecodec-core
//!
//! Declarative, schema-driven codec for fixed-size CAN / CAN-FD / UART
//! frames. A schema document (TOML) declares named fields, multi-frame
//! arrays, and outbound command prototypes against a bus's frame ids; this
//! crate validates that document once at construction time and then runs
//! pure pack/unpack/reassembly logic against it at wire speed.
//!
//! ## Quick start
//!
//! ```
//! use framecodec_core::{ErrorCollector, Parser, SchemaDocument};
//!
//! let doc = SchemaDocument::parse(r#"
//!     [[var]]
//!     can_id = "0x100"
//!     var_name = "speed"
//!     var_type = "u16"
//!     parser_param = [0, 1]
//! "#).unwrap();
//!
//! let faults = ErrorCollector::new();
//! let (parser, fault_count) = Parser::new(&faults, &doc, "demo");
//! assert_eq!(fault_count, 0);
//!
//! let mut data = parser.build_registry();
//! parser.decode(&mut data, 0x100, &[0x27, 0x10, 0, 0, 0, 0, 0, 0]);
//! assert_eq!(data.get("speed").unwrap().addr, [0x10, 0x27]);
//! ```
//!
//! ## Module structure
//!
//! - [`schema`]: the TOML document shape an author writes
//! - [`rule`]: the typed, checked rule model a document compiles into
//! - [`validator`]: schema table → rule compilation and cross-rule checks
//! - [`codec`]: bit/byte pack and unpack primitives
//! - [`reassembler`]: multi-frame array reassembly state machine
//! - [`registry`]: host-owned storage the codec reads from and writes into
//! - [`transport`]: the `Frame` wire value and the outbound send capability
//! - [`facade`]: [`Parser`], the crate's single public entry point
//! - [`error`]: schema-level errors and the fault-accumulation tree

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod codec;
pub mod error;
pub mod facade;
pub mod reassembler;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod transport;
pub mod validator;

pub use error::{ErrorCode, ErrorCollector, SchemaError};
pub use facade::{DecodeOutcome, FrameKind, Parser};
pub use reassembler::{ArrayState, IngestOutcome};
pub use registry::{DataEntry, DataRegistry};
pub use rule::{ArrayRule, CmdRule, FixedZoom, FrameId, FrameRule, ParserKind, VarRule, VarType};
pub use schema::{parse_hex_id, ArrayTable, CmdTable, FrameTable, SchemaDocument, VarTable};
pub use transport::{Frame, RecordingTransport, SendFrame, MAX_FRAME_LEN};
pub use validator::{Bus, Validator};
