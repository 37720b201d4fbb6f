// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Golden bytes and determinism properties for the columnar codec.
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use serde_json::json;
use trellis_tabular::{CanonicalColumnarCodec, Table, TabularCodec};

#[test]
fn golden_single_column() {
    let table = Table::from_json(&json!({"a": [1]})).unwrap();
    let bytes = CanonicalColumnarCodec.encode(&table).unwrap();
    // { "data": [[1]], "rows": 1, "format": "trellis-columnar/1", "columns": ["a"] }
    // keys sorted by encoded bytes: shorter text heads first.
    let expected = concat!(
        "a4",
        "6464617461", "818101",
        "64726f7773", "01",
        "66666f726d6174", "72", "7472656c6c69732d636f6c756d6e61722f31",
        "67636f6c756d6e73", "816161",
    );
    assert_eq!(hex::encode(bytes), expected);
}

#[test]
fn empty_table_round_trips() {
    let codec = CanonicalColumnarCodec;
    let bytes = codec.encode(&Table::new()).unwrap();
    assert!(codec.decode(&bytes).unwrap().is_empty());
}

proptest! {
    #[test]
    fn encoding_is_deterministic_for_integer_columns(cells in prop::collection::vec(any::<i64>(), 0..32)) {
        let values: Vec<_> = cells.iter().map(|n| json!(n)).collect();
        let first = Table::from_columns([("n", values.clone())]).unwrap();
        let second = Table::from_columns([("n", values)]).unwrap();
        let codec = CanonicalColumnarCodec;
        let a = codec.encode(&first).unwrap();
        prop_assert_eq!(&a, &codec.encode(&second).unwrap());
        prop_assert_eq!(codec.decode(&a).unwrap(), first);
    }
}
