//! # ObjBox
//!
//! Typed object boxes over the ObjBox engine.
//!
//! An [`ObjectBox`] owns an open engine store. For every registered entity
//! type it hands out an [`EntityBox`], which offers:
//!
//! - `put` / `put_all` / `get` / `get_all` / `contains` / `count` /
//!   `remove` / `remove_all`, each in its own transaction
//! - `put_async`, which queues the object for a background batch commit
//!
//! Entity types are mapped to the engine by implementing [`EntityBinding`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use objbox::{Config, ObjectBox};
//!
//! let ob = ObjectBox::builder()
//!     .register::<Task>()
//!     .config(Config::default())
//!     .build()?;
//!
//! let tasks = ob.box_for::<Task>()?;
//! let mut task = Task::new("write docs");
//! let id = tasks.put(&mut task)?;     // assigns and writes back the ID
//! assert_eq!(tasks.get(id)?, Some(task));
//!
//! tasks.put_async(&mut Task::new("later"))?;
//! ob.await_async_completion()?;
//! assert_eq!(tasks.count()?, 2);
//! ```
//!
//! ## Object IDs
//!
//! An ID of `0` means "not yet stored": the engine assigns the next ID of the
//! type and the box writes it back into the object. A non-zero ID is an
//! upsert. `u64::MAX` is reserved and rejected.

#![warn(missing_docs)]

mod binding;
mod builder_pool;
mod config;
mod cursor;
mod entity_box;
mod error;
mod store;
mod transaction;
mod types;

#[cfg(test)]
mod test_support;

pub use binding::EntityBinding;
pub use config::Config;
pub use entity_box::EntityBox;
pub use error::{ObxError, ObxResult};
pub use store::{ObjectBox, ObjectBoxBuilder};
pub use types::EntityTypeId;

/// The object builder and reader used by [`EntityBinding`] implementations.
pub use objbox_flat as flat;
