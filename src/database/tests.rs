use super::*;

#[test]
fn record_ids_order_numerically() {
    let mut ids = vec![RecordId::new(10), RecordId::new(2), RecordId::new(7)];
    ids.sort();

    assert_eq!(
        ids.iter().map(|id| id.get()).collect::<Vec<_>>(),
        vec![2, 7, 10]
    );
    assert_eq!(RecordId::new(42).to_string(), "42");
}

#[test]
fn record_id_serializes_as_plain_number() {
    let json = serde_json::to_string(&RecordId::new(9)).expect("should serialize record id");
    assert_eq!(json, "9");

    let parsed: RecordId = serde_json::from_str("13").expect("should parse record id");
    assert_eq!(parsed, RecordId::new(13));
}
