//! Entity binding trait.

use crate::error::ObxResult;
use crate::types::EntityTypeId;
use objbox_flat::FlatBuilder;

/// Trait for types that can be stored in an [`EntityBox`](crate::EntityBox).
///
/// Usually generated per entity type. Implementors map their fields to
/// builder slots and back:
///
/// - `flatten` starts the object with the given ID and adds every field;
///   the box ends and finishes the object afterwards
/// - `load` reads an object back from the bytes `flatten` produced
///
/// # Example
///
/// ```
/// use objbox::{EntityBinding, EntityTypeId, ObxResult};
/// use objbox::flat::{FlatBuilder, FlatTable};
///
/// struct Note {
///     id: u64,
///     text: String,
/// }
///
/// impl EntityBinding for Note {
///     const ENTITY_TYPE_ID: EntityTypeId = EntityTypeId(1);
///     const ENTITY_NAME: &'static str = "Note";
///
///     fn id(&self) -> ObxResult<u64> {
///         Ok(self.id)
///     }
///
///     fn set_id(&mut self, id: u64) {
///         self.id = id;
///     }
///
///     fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
///         builder.start_object(id)?;
///         builder.add_field(1, self.text.as_str())?;
///         Ok(())
///     }
///
///     fn load(bytes: &[u8]) -> ObxResult<Self> {
///         let table = FlatTable::parse(bytes)?;
///         Ok(Note {
///             id: table.id(),
///             text: table.get_text(1)?.to_string(),
///         })
///     }
/// }
/// ```
pub trait EntityBinding: Sized + Send + Sync + 'static {
    /// Entity type identifier registered with the store.
    const ENTITY_TYPE_ID: EntityTypeId;

    /// Entity name registered with the store.
    const ENTITY_NAME: &'static str;

    /// Returns the object's ID; `0` means not yet assigned.
    fn id(&self) -> ObxResult<u64>;

    /// Writes an assigned ID back into the object.
    fn set_id(&mut self, id: u64);

    /// Starts an object with `id` in `builder` and adds the object's fields.
    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()>;

    /// Reads an object from its stored bytes.
    fn load(bytes: &[u8]) -> ObxResult<Self>;
}
