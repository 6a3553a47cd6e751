// End-to-end scenarios against the public `Parser` facade.

use framecodec_core::{ErrorCollector, Frame, FrameKind, Parser, SchemaDocument};

fn parser_for(doc_src: &str) -> (Parser, usize) {
    let doc = SchemaDocument::parse(doc_src).expect("schema should parse");
    let faults = ErrorCollector::new();
    Parser::new(&faults, &doc, "integration")
}

// ============================================================================
// Scalar decode scenarios
// ============================================================================

#[test]
fn classic_can_single_u16_var() {
    let (parser, faults) = parser_for(
        r#"
        canfd_enable = false

        [[var]]
        can_id = "0x100"
        var_name = "speed"
        var_type = "u16"
        parser_param = [2, 3]
        "#,
    );
    assert_eq!(faults, 0);

    let mut data = parser.build_registry();
    let outcome = parser.decode(&mut data, 0x100, &[0x00, 0x00, 0x12, 0x34, 0x00, 0x00, 0x00, 0x00]);

    // sole registered var: this frame completes the cycle, and `decode`
    // itself clears `loaded` back to false before returning (edge-trigger).
    assert!(outcome.all_loaded);
    assert!(!outcome.error);
    let entry = data.get("speed").unwrap();
    assert!(!entry.loaded);
    assert_eq!(u16::from_ne_bytes(entry.addr[..2].try_into().unwrap()), 0x1234);
}

#[test]
fn bit_slice_var_extracts_middle_bits() {
    let (parser, faults) = parser_for(
        r#"
        [[var]]
        can_id = "0x200"
        var_name = "flags"
        var_type = "u8"
        parser_param = [0, 3, 1]
        "#,
    );
    assert_eq!(faults, 0);

    let mut data = parser.build_registry();
    parser.decode(&mut data, 0x200, &[0b0000_1010, 0, 0, 0, 0, 0, 0, 0]);

    assert_eq!(data.get("flags").unwrap().addr[0], 5);
}

#[test]
fn scaled_float_var_applies_var_zoom() {
    let (parser, faults) = parser_for(
        r#"
        [[var]]
        can_id = "0x300"
        var_name = "temp"
        var_type = "float"
        parser_param = [0, 1]
        var_zoom = 0.01
        "#,
    );
    assert_eq!(faults, 0);

    let mut data = parser.build_registry();
    parser.decode(&mut data, 0x300, &[0x00, 0x64, 0, 0, 0, 0, 0, 0]);

    let value = f32::from_ne_bytes(data.get("temp").unwrap().addr[..4].try_into().unwrap());
    assert!((value - 1.0).abs() < 1e-6);
}

// ============================================================================
// Array reassembly scenario
// ============================================================================

#[test]
fn three_frame_array_completes_in_order_and_resyncs_on_skip() {
    let (parser, faults) = parser_for(
        r#"
        [[array]]
        array_name = "img"
        can_package_num = 3
        can_id = ["0x400", "0x401", "0x402"]
        "#,
    );
    assert_eq!(faults, 0);

    let mut data = parser.build_registry();
    parser.decode(&mut data, 0x400, &[1; 8]);
    parser.decode(&mut data, 0x401, &[2; 8]);
    let outcome = parser.decode(&mut data, 0x402, &[3; 8]);

    // sole registered entry: completing it triggers the edge-trigger clear,
    // so `loaded` is already back to false by the time `decode` returns.
    assert!(outcome.all_loaded);
    let entry = data.get("img").unwrap();
    assert!(!entry.loaded);
    let expected: Vec<u8> = [1u8; 8].into_iter().chain([2u8; 8]).chain([3u8; 8]).collect();
    assert_eq!(entry.addr, expected);

    // Fresh cycle, skip the middle frame: 0x402 must resync, not complete.
    let mut data = parser.build_registry();
    parser.decode(&mut data, 0x400, &[9; 8]);
    let outcome = parser.decode(&mut data, 0x402, &[9; 8]);
    assert!(!outcome.all_loaded);
    assert!(!data.get("img").unwrap().loaded);
}

// ============================================================================
// Command encode scenario
// ============================================================================

#[test]
fn command_encode_lays_out_ctrl_data_then_payload() {
    let (parser, faults) = parser_for(
        r#"
        [[cmd]]
        can_id = "0x500"
        cmd_name = "PING"
        ctrl_len = 2
        ctrl_data = ["0xAA", "0x55"]
        "#,
    );
    assert_eq!(faults, 0);

    let mut frame = Frame::zeroed(0, 8);
    let sent = parser.encode_cmd("PING", &[0x01, 0x02], &mut frame, FrameKind::Classic);

    assert!(sent);
    assert_eq!(frame.id, 0x500);
    assert_eq!(frame.payload(), &[0xAA, 0x55, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00]);
}

// ============================================================================
// Mix-use guard
// ============================================================================

#[test]
fn canfd_parser_refuses_a_classic_encode_request() {
    let (parser, faults) = parser_for(
        r#"
        canfd_enable = true

        [[cmd]]
        can_id = "0x500"
        cmd_name = "PING"
        ctrl_len = 2
        ctrl_data = ["0xAA", "0x55"]
        "#,
    );
    assert_eq!(faults, 0);

    let mut frame = Frame::zeroed(0, 64);
    let sent = parser.encode_cmd("PING", &[0x01, 0x02], &mut frame, FrameKind::Classic);
    assert!(!sent);
}

// ============================================================================
// Validator cross-rule checks
// ============================================================================

#[test]
fn duplicate_var_name_is_rejected_but_parser_remains_usable() {
    let (parser, faults) = parser_for(
        r#"
        [[var]]
        can_id = "0x100"
        var_name = "speed"
        var_type = "u16"
        parser_param = [0, 1]

        [[var]]
        can_id = "0x101"
        var_name = "speed"
        var_type = "u8"
        parser_param = [0, 0]

        [[var]]
        can_id = "0x102"
        var_name = "rpm"
        var_type = "u8"
        parser_param = [0, 0]
        "#,
    );
    assert_eq!(faults, 1);

    let mut data = parser.build_registry();
    assert!(data.get("rpm").is_some());
    parser.decode(&mut data, 0x102, &[7, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(data.get("rpm").unwrap().addr[0], 7);
}

#[test]
fn can_id_outside_standard_range_is_rejected() {
    let (_parser, faults) = parser_for(
        r#"
        canfd_enable = false
        extended_frame = false

        [[var]]
        can_id = "0x800"
        var_name = "oob"
        var_type = "u8"
        parser_param = [0, 0]
        "#,
    );
    assert_eq!(faults, 1);
}

#[test]
fn uart_schema_validates_frame_ids_against_declared_frames() {
    let (parser, faults) = parser_for(
        r#"
        [[frame]]
        frame_name = "status"
        data_len = 16

        [[var]]
        can_id = "0x0"
        var_name = "mode"
        var_type = "u8"
        parser_param = [0, 0]
        "#,
    );
    assert_eq!(faults, 0);

    let mut data = parser.build_registry();
    parser.decode(&mut data, 0, &[3; 16]);
    assert_eq!(data.get("mode").unwrap().addr[0], 3);
}
