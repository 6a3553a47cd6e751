//! Performance benchmarks for the framecodec pack/unpack primitives.
//!
//! Run with: `cargo bench -p framecodec-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use framecodec_core::{
    codec, ArrayRule, ArrayState, DataEntry, ErrorCollector, FixedZoom, ParserKind, VarRule, VarType,
};

// ============================================================================
// Scalar var decode/encode
// ============================================================================

fn bench_unpack_u32(c: &mut Criterion) {
    let rule = VarRule {
        frame_id: 0x100,
        var_name: "v".into(),
        var_type: VarType::U32,
        parser: ParserKind::Var { byte_lo: 0, byte_hi: 3 },
        var_zoom: FixedZoom::default(),
    };
    let payload = [0xDEu8, 0xAD, 0xBE, 0xEF, 0, 0, 0, 0];
    let collector = ErrorCollector::new();

    c.bench_function("unpack_u32", |b| {
        b.iter(|| {
            let mut dest = DataEntry::for_var(VarType::U32, 4);
            black_box(codec::unpack(&rule, black_box(&payload), &mut dest, &collector));
        })
    });
}

fn bench_pack_u32(c: &mut Criterion) {
    let rule = VarRule {
        frame_id: 0x100,
        var_name: "v".into(),
        var_type: VarType::U32,
        parser: ParserKind::Var { byte_lo: 0, byte_hi: 3 },
        var_zoom: FixedZoom::default(),
    };
    let mut src = DataEntry::for_var(VarType::U32, 4);
    src.addr.copy_from_slice(&0xDEAD_BEEFu32.to_ne_bytes());
    let collector = ErrorCollector::new();

    c.bench_function("pack_u32", |b| {
        b.iter(|| {
            let mut frame = [0u8; 8];
            black_box(codec::pack(&rule, black_box(&src), &mut frame, &collector));
        })
    });
}

fn bench_unpack_bit_slice(c: &mut Criterion) {
    let rule = VarRule {
        frame_id: 0x200,
        var_name: "v".into(),
        var_type: VarType::U8,
        parser: ParserKind::Bit { byte_index: 0, high_bit: 3, low_bit: 1 },
        var_zoom: FixedZoom::default(),
    };
    let payload = [0b0000_1010u8, 0, 0, 0, 0, 0, 0, 0];
    let collector = ErrorCollector::new();

    c.bench_function("unpack_bit_slice", |b| {
        b.iter(|| {
            let mut dest = DataEntry::for_var(VarType::U8, 1);
            black_box(codec::unpack(&rule, black_box(&payload), &mut dest, &collector));
        })
    });
}

// ============================================================================
// Whole-frame decode, one full 8-byte classic CAN frame of mixed var rules
// ============================================================================

fn bench_decode_whole_frame(c: &mut Criterion) {
    let rules = vec![
        VarRule {
            frame_id: 0x100,
            var_name: "a".into(),
            var_type: VarType::U16,
            parser: ParserKind::Var { byte_lo: 0, byte_hi: 1 },
            var_zoom: FixedZoom::default(),
        },
        VarRule {
            frame_id: 0x100,
            var_name: "b".into(),
            var_type: VarType::U8,
            parser: ParserKind::Bit { byte_index: 2, high_bit: 3, low_bit: 1 },
            var_zoom: FixedZoom::default(),
        },
        VarRule {
            frame_id: 0x100,
            var_name: "c".into(),
            var_type: VarType::Float,
            parser: ParserKind::Var { byte_lo: 3, byte_hi: 4 },
            var_zoom: FixedZoom(0.01),
        },
    ];
    let payload = [0xAAu8, 0xBB, 0b0000_1010, 0x00, 0x64, 0, 0, 0];
    let collector = ErrorCollector::new();

    c.bench_function("decode_whole_frame_3_vars", |b| {
        b.iter(|| {
            for rule in &rules {
                let mut dest = DataEntry::for_var(rule.var_type, rule.parser.width());
                black_box(codec::unpack(rule, black_box(&payload), &mut dest, &collector));
            }
        })
    });
}

// ============================================================================
// Array reassembly throughput across package sizes
// ============================================================================

fn bench_array_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_reassembly");

    for package_num in [2usize, 4, 8, 16] {
        let frame_id_map: Vec<(u32, usize)> = (0..package_num).map(|i| (0x400 + i as u32, i)).collect();
        let rule = ArrayRule {
            array_name: "img".into(),
            package_num,
            frame_id_map: frame_id_map.clone(),
            all_max_len: package_num * 8,
        };
        let collector = ErrorCollector::new();

        group.throughput(Throughput::Elements(package_num as u64));
        group.bench_with_input(BenchmarkId::from_parameter(package_num), &package_num, |b, _| {
            b.iter(|| {
                let mut state = ArrayState::default();
                let mut entry = DataEntry::for_array(package_num * 8);
                for (id, _) in &frame_id_map {
                    black_box(framecodec_core::reassembler::ingest(
                        &rule,
                        &mut state,
                        Some(&mut entry),
                        *id,
                        black_box(&[0xAAu8; 8]),
                        &collector,
                    ));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_unpack_u32,
    bench_pack_u32,
    bench_unpack_bit_slice,
    bench_decode_whole_frame,
    bench_array_reassembly,
);
criterion_main!(benches);
