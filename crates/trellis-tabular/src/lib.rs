// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tabular payloads for Trellis charts.
//!
//! Chart specs may embed data anywhere: a `datasets` map, an inline `data`
//! value, or a caller-supplied table. Before a chart reaches the wire every
//! such payload is shaped into a [`Table`] and encoded by a
//! [`TabularCodec`] into a byte string that travels next to the spec.
//!
//! The default codec ([`CanonicalColumnarCodec`]) writes canonical CBOR, so
//! equal tables always produce equal bytes and hash to equal widget ids.
#![forbid(unsafe_code)]

pub mod canonical;
pub mod codec;
pub mod table;

pub use canonical::{decode_value, encode_value, CanonError};
pub use codec::{CanonicalColumnarCodec, CodecError, TabularCodec, COLUMNAR_FORMAT};
pub use table::{Column, Table, TableError, SCALAR_COLUMN};
