//! The external schema document: a TOML tree of `var`/`array`/`cmd`/`frame`
//! tables, deserialized with `serde`.
//!
//! This module owns only the *document* shape — the raw strings and
//! integers a configuration author writes. [`crate::validator::Validator`]
//! turns a [`SchemaDocument`] into the typed, checked rules in
//! [`crate::rule`].

use serde::Deserialize;

use crate::error::SchemaError;

/// Top-level schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    /// Whether this bus is CAN-FD (payloads up to 64 bytes) rather than
    /// classic CAN (payloads fixed at 8 bytes).
    #[serde(default)]
    pub canfd_enable: bool,
    /// Whether frame ids are 29-bit extended CAN ids rather than 11-bit
    /// standard ids.
    #[serde(default)]
    pub extended_frame: bool,
    /// Scalar field rules.
    #[serde(default)]
    pub var: Vec<VarTable>,
    /// Multi-frame array rules.
    #[serde(default)]
    pub array: Vec<ArrayTable>,
    /// Named outbound command prototypes.
    #[serde(default)]
    pub cmd: Vec<CmdTable>,
    /// Explicit frame declarations (UART; CAN frames are implied by var/array/cmd).
    #[serde(default)]
    pub frame: Vec<FrameTable>,
}

impl SchemaDocument {
    /// Parse a document from TOML source text.
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        Ok(toml::from_str(source)?)
    }
}

/// One `[[var]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct VarTable {
    /// Hex frame id string, e.g. `"0x100"`.
    pub can_id: String,
    /// Field name, must be globally unique.
    pub var_name: String,
    /// `var_type` tag, see [`crate::rule::VarType::parse`].
    pub var_type: String,
    /// `"auto"` (default), `"bit"`, or `"var"`.
    #[serde(default)]
    pub parser_type: Option<String>,
    /// 2 elements for `var` form, 3 for `bit` form.
    pub parser_param: Vec<u8>,
    /// Float/double scale factor; ignored (with a warning) for other types.
    #[serde(default)]
    pub var_zoom: Option<f64>,
}

/// One `[[array]]` table. CAN documents use `can_id`/`can_package_num`; UART
/// documents use `frame_id`/`package_num`. Both deserialize into this one
/// shape via field aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct ArrayTable {
    /// Array name, must be globally unique.
    pub array_name: String,
    /// Number of frames that make up one complete array.
    #[serde(alias = "package_num")]
    pub can_package_num: usize,
    /// Either exactly `can_package_num` ids (explicit slot order) or exactly
    /// two ids `[lo, hi]` (contiguous range), as hex strings.
    #[serde(alias = "frame_id")]
    pub can_id: Vec<String>,
}

/// One `[[cmd]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdTable {
    /// Hex frame id string this command is sent on.
    pub can_id: String,
    /// Command name, must be globally unique.
    pub cmd_name: String,
    /// Number of leading payload bytes reserved for `ctrl_data`.
    pub ctrl_len: u8,
    /// Fixed control bytes, as hex strings.
    pub ctrl_data: Vec<String>,
}

/// One `[[frame]]` table (UART only). Frame ids are assigned in document
/// order starting at 0.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameTable {
    /// Human-readable name.
    pub frame_name: String,
    /// Payload width in bytes.
    pub data_len: usize,
}

/// Parse a `"0x..."` hex string into a frame id, per §6.2.
pub fn parse_hex_id(raw: &str) -> Result<u32, SchemaError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| SchemaError::MalformedHexId(raw.to_string()))?;
    u32::from_str_radix(digits, 16).map_err(|_| SchemaError::MalformedHexId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_id_accepts_lowercase_and_uppercase() {
        assert_eq!(parse_hex_id("0x100").unwrap(), 0x100);
        assert_eq!(parse_hex_id("0X1FF").unwrap(), 0x1FF);
    }

    #[test]
    fn parse_hex_id_rejects_missing_prefix() {
        assert!(parse_hex_id("100").is_err());
    }

    #[test]
    fn parse_document_with_every_table_kind() {
        let toml_src = r#"
            canfd_enable = false
            extended_frame = false

            [[var]]
            can_id = "0x100"
            var_name = "speed"
            var_type = "u16"
            parser_param = [2, 3]

            [[array]]
            array_name = "img"
            can_package_num = 3
            can_id = ["0x400", "0x401", "0x402"]

            [[cmd]]
            can_id = "0x500"
            cmd_name = "PING"
            ctrl_len = 2
            ctrl_data = ["0xAA", "0x55"]
        "#;

        let doc = SchemaDocument::parse(toml_src).unwrap();
        assert_eq!(doc.var.len(), 1);
        assert_eq!(doc.array.len(), 1);
        assert_eq!(doc.cmd.len(), 1);
        assert_eq!(doc.array[0].can_package_num, 3);
    }
}
