//! Bencode node tree and codec ([BEP-3]).
//!
//! The storage engine only consumes decoded trees and produces trees to be
//! encoded; this module is the codec that sits on that boundary.
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` |
//! | Byte String | `<length>:<data>` | `4:spam` |
//! | List | `l<items>e` | `l4:spami42ee` |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` |
//!
//! # Examples
//!
//! ```
//! use piecemeal::bencode::{decode, encode, Value};
//!
//! let value = decode(b"d4:name4:spam6:lengthi42ee").unwrap();
//! assert_eq!(value.get(b"name").and_then(Value::as_str), Some("spam"));
//! assert_eq!(value.get(b"length").and_then(Value::as_integer), Some(42));
//!
//! let rebuilt = Value::dict()
//!     .with("length", 42i64)
//!     .with("name", "spam")
//!     .build();
//! assert_eq!(encode(&rebuilt).unwrap(), b"d6:lengthi42e4:name4:spame");
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use error::BencodeError;
pub use value::{DictBuilder, Value};
