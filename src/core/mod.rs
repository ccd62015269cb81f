//! Core data types for record matching.
//!
//! - [`Record`]: a JSON object mapping field names to values
//! - [`BlockKey`]: the partition key records are stored and looked up under
//!
//! ## Absent values
//!
//! A field set to `null` is *present but absent*: it is passed to similarity
//! functions like any other value. A field that does not exist on a record is
//! *missing*, and any rule referencing it fails with
//! [`MatchError::MissingField`](crate::matching::MatchError::MissingField).

pub mod key;
pub mod record;
