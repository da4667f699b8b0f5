//! Codec round-trip coverage for the standard opcode table.
//!
//! For every opcode and every rule-accepted argument tuple, decoding the
//! encoded operand must reproduce the tuple field-wise; for the derived
//! layouts it must reproduce the parameter count.

use proptest::prelude::*;
use rain_spec::{OpMetaRegistry, OperandLayout, Resolved};

fn op(registry: &OpMetaRegistry, name: &str) -> rain_spec::OpMeta {
    match registry.find(name) {
        Some(Resolved::Op(meta)) => meta.clone(),
        other => panic!("expected opcode {name}, got {other:?}"),
    }
}

// ============================================================================
// Property: decode . encode == id over accepted tuples
// ============================================================================

proptest! {
    #[test]
    fn prop_call_roundtrip(inputs in 0i64..=7, outputs in 1i64..=3, source in 1i64..=7) {
        let registry = OpMetaRegistry::standard();
        let call = op(&registry, "CALL");
        // input_size is tied to the parameter count.
        let operand = call.codec.encode(&[inputs, outputs, source], inputs as usize).unwrap();
        prop_assert_eq!(call.codec.decode(operand), vec![inputs, outputs, source]);
    }

    #[test]
    fn prop_context_roundtrip(column in 0i64..=255, row in 0i64..=255) {
        let registry = OpMetaRegistry::standard();
        let context = op(&registry, "CONTEXT");
        let operand = context.codec.encode(&[column, row], 0).unwrap();
        prop_assert_eq!(operand as i64, (column << 8) | row);
        prop_assert_eq!(context.codec.decode(operand), vec![column, row]);
    }

    #[test]
    fn prop_loop_n_roundtrip(n in 0i64..=15, source in 1i64..=15) {
        let registry = OpMetaRegistry::standard();
        let loop_n = op(&registry, "LOOP_N");
        let operand = loop_n.codec.encode(&[n, source], 0).unwrap();
        prop_assert_eq!(loop_n.codec.decode(operand), vec![n, source]);
    }

    #[test]
    fn prop_state_roundtrip(kind in 0i64..=1, index in 0i64..=127) {
        let registry = OpMetaRegistry::standard();
        let state = op(&registry, "STATE");
        let operand = state.codec.encode(&[kind, index], 0).unwrap();
        prop_assert_eq!(operand as i64, (index << 1) | kind);
        prop_assert_eq!(state.codec.decode(operand), vec![kind, index]);
    }

    #[test]
    fn prop_select_lte_roundtrip(logic in 0i64..=1, mode in 0i64..=2, length in 1i64..=31) {
        let registry = OpMetaRegistry::standard();
        let select_lte = op(&registry, "SELECT_LTE");
        let operand = select_lte
            .codec
            .encode(&[logic, mode, length], length as usize + 1)
            .unwrap();
        prop_assert_eq!(select_lte.codec.decode(operand), vec![logic, mode, length]);
    }

    #[test]
    fn prop_scale_by_roundtrip(scale in -128i64..=127) {
        let registry = OpMetaRegistry::standard();
        let scale_by = op(&registry, "SCALE_BY");
        let operand = scale_by.codec.encode(&[scale], 1).unwrap();
        prop_assert_eq!(scale_by.codec.decode(operand), vec![scale]);
    }

    #[test]
    fn prop_reducer_operand_is_param_count(count in 2usize..=64) {
        let registry = OpMetaRegistry::standard();
        for name in ["ADD", "MUL", "MIN", "ANY", "EVERY"] {
            let meta = op(&registry, name);
            let operand = meta.codec.encode(&[], count).unwrap();
            prop_assert_eq!(operand as usize, count);
            prop_assert_eq!(meta.codec.decode(operand), vec![count as i64]);
        }
    }
}

// ============================================================================
// Exhaustive checks for the small field spaces
// ============================================================================

#[test]
fn test_update_times_exhaustive() {
    let registry = OpMetaRegistry::standard();
    let meta = op(&registry, "UPDATE_TIMES_FOR_TIER_RANGE");
    for start in 0..=8 {
        for end in 0..=8 {
            let operand = meta.codec.encode(&[start, end], 2).unwrap();
            assert_eq!(meta.codec.decode(operand), vec![start, end]);
        }
    }
}

#[test]
fn test_batch_decode_reconstructs_param_count() {
    let registry = OpMetaRegistry::standard();
    let batch = op(&registry, "IERC1155_BALANCE_OF_BATCH");
    for count in [3usize, 5, 7, 21] {
        assert!(batch.params.accepts(count));
        let operand = batch.codec.encode(&[], count).unwrap();
        assert_eq!(operand as usize, (count - 1) / 2);
        // PairCount decode yields the encoder's input, the param count.
        assert_eq!(batch.codec.decode(operand), vec![count as i64]);
    }
    assert!(!batch.params.accepts(4));
    assert!(!batch.params.accepts(1));
}

#[test]
fn test_itierv2_report_param_counts() {
    let registry = OpMetaRegistry::standard();
    let report = op(&registry, "ITIERV2_REPORT");
    for count in [2usize, 3, 10] {
        assert!(report.params.accepts(count));
        let operand = report.codec.encode(&[], count).unwrap();
        assert_eq!(operand as usize, count - 2);
    }
    assert!(!report.params.accepts(4));
}

// ============================================================================
// Table-wide sanity
// ============================================================================

#[test]
fn test_zero_codecs_have_no_rules() {
    let registry = OpMetaRegistry::standard();
    for meta in registry.ops() {
        if meta.codec.is_zero() {
            assert!(meta.codec.arg_rules().is_empty(), "{}", meta.name);
            assert_eq!(meta.codec.encode(&[], 2).unwrap(), 0, "{}", meta.name);
        }
    }
}

#[test]
fn test_every_field_fits_sixteen_bits() {
    let registry = OpMetaRegistry::standard();
    for meta in registry.ops() {
        if let OperandLayout::Fields(fields) = meta.codec.layout() {
            for field in fields {
                assert!(field.shift + field.bits <= 16, "{}.{}", meta.name, field.name);
            }
        }
    }
}
