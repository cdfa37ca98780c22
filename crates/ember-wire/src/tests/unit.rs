//! Unit tests for varint encoding and structural bookkeeping.

use rstest::rstest;

use crate::context::StructuralContext;
use crate::errors::StructuralError;
use crate::token::Token;
use crate::varint::{MAX_VARINT_LEN, VarintWriteError, varint_bytes, write_varint};

#[rstest]
#[case(0, &[0x00])]
#[case(1, &[0x01])]
#[case(127, &[0x7F])]
#[case(128, &[0x80, 0x01])]
#[case(300, &[0xAC, 0x02])]
#[case(16_384, &[0x80, 0x80, 0x01])]
fn varint_encodes_reference_vectors(#[case] value: u64, #[case] expected: &[u8]) {
    assert_eq!(varint_bytes(value), expected);
}

#[rstest]
fn varint_covers_the_full_u64_range() {
    let bytes = varint_bytes(u64::MAX);
    assert_eq!(bytes.len(), MAX_VARINT_LEN);
    let mut expected = vec![0xFF; 9];
    expected.push(0x01);
    assert_eq!(bytes, expected);
}

#[rstest]
fn negative_varint_is_rejected_before_writing(#[values(-1, -300, i64::MIN)] value: i64) {
    let mut sink = Vec::new();
    let error = write_varint(value, &mut sink).expect_err("negative value must be rejected");
    assert!(matches!(
        error,
        VarintWriteError::Encoding(encoding) if encoding.value == value
    ));
    assert!(sink.is_empty(), "no bytes may be written for a rejected value");
}

#[rstest]
fn writing_a_non_negative_varint_succeeds() {
    let mut sink = Vec::new();
    write_varint(300, &mut sink).expect("non-negative value encodes");
    assert_eq!(sink, [0xAC, 0x02]);
}

#[rstest]
fn well_formed_traversal_reaches_the_final_state() {
    let mut context = StructuralContext::enforcing();
    // Plus[1, 2]: a three-part node (head plus two arguments).
    context.enter_new_node(3, false).expect("open function node");
    for _ in 0..3 {
        context.record_part().expect("emit part");
    }
    assert!(context.is_final_state());
}

#[rstest]
fn omitting_the_final_child_leaves_a_non_final_state() {
    let mut context = StructuralContext::enforcing();
    context.enter_new_node(3, false).expect("open function node");
    context.record_part().expect("emit head");
    context.record_part().expect("emit first argument");
    assert!(!context.is_final_state());
}

#[rstest]
fn extra_parts_beyond_the_declared_structure_fail() {
    let mut context = StructuralContext::enforcing();
    context.record_part().expect("emit the single top-level part");
    assert!(context.is_final_state());
    let error = context.record_part().expect_err("root is already consumed");
    assert_eq!(error, StructuralError::NoOpenNode);
}

#[rstest]
fn zero_length_nodes_close_themselves() {
    let mut context = StructuralContext::enforcing();
    context
        .enter_new_node(0, false)
        .expect("open empty function node");
    assert!(context.is_final_state());
}

#[rstest]
fn association_flag_tracks_the_top_frame() {
    let mut context = StructuralContext::enforcing();
    assert!(!context.is_association_context());
    context.enter_new_node(1, true).expect("open association");
    assert!(context.is_association_context());
    // Opening a rule frame hides the association until the rule completes.
    context.enter_new_node(2, false).expect("open rule node");
    assert!(!context.is_association_context());
}

#[rstest]
fn permissive_context_accepts_everything() {
    let mut context = StructuralContext::permissive();
    context.record_part().expect("no bookkeeping");
    context.record_part().expect("no bookkeeping");
    assert!(context.is_final_state());
    assert!(context.is_association_context());
}

#[rstest]
fn rule_token_outside_an_association_writes_nothing() {
    let mut context = StructuralContext::enforcing();
    let mut sink = Vec::new();
    let error = Token::Rule
        .encode(&mut sink, &mut context)
        .expect_err("rule requires an association frame");
    assert!(matches!(
        error,
        crate::SerializeError::Structural(StructuralError::RuleOutsideAssociation)
    ));
    assert!(sink.is_empty());
}
