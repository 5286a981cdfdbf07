//! # ObjBox Flat
//!
//! Object builder and table reader used to serialize entities for ObjBox.
//!
//! The builder follows the classic "start / add fields / end / finish"
//! protocol. A finished object is a self-describing byte sequence that the
//! engine stores opaquely and that [`FlatTable`] reads back.
//!
//! ## Usage
//!
//! ```
//! use objbox_flat::{FlatBuilder, FlatTable};
//!
//! let mut builder = FlatBuilder::with_capacity(256);
//! builder.start_object(7).unwrap();
//! builder.add_field(1, "write docs").unwrap();
//! builder.add_field(2, true).unwrap();
//! let object = builder.end_object().unwrap();
//! builder.finish(object).unwrap();
//!
//! let table = FlatTable::parse(builder.finished_bytes().unwrap()).unwrap();
//! assert_eq!(table.id(), 7);
//! assert_eq!(table.get_text(1).unwrap(), "write docs");
//!
//! // Ready for the next object; the allocation is kept.
//! builder.reset();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod error;
mod table;
mod value;

pub use builder::{FlatBuilder, ObjectRef, DEFAULT_CAPACITY};
pub use error::{FlatError, FlatResult};
pub use table::FlatTable;
pub use value::FieldValue;
