//! Entity used by the unit tests.

use crate::binding::EntityBinding;
use crate::error::{ObxError, ObxResult};
use crate::store::StoreCore;
use crate::types::EntityTypeId;
use objbox_flat::{FlatBuilder, FlatTable};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Note {
    pub(crate) id: u64,
    pub(crate) text: String,
}

impl Note {
    pub(crate) const TYPE: EntityTypeId = EntityTypeId(1);

    pub(crate) fn new(text: &str) -> Self {
        Self {
            id: 0,
            text: text.to_string(),
        }
    }
}

impl EntityBinding for Note {
    const ENTITY_TYPE_ID: EntityTypeId = Self::TYPE;
    const ENTITY_NAME: &'static str = "Note";

    fn id(&self) -> ObxResult<u64> {
        Ok(self.id)
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
        builder.start_object(id)?;
        if self.text.is_empty() {
            return Err(ObxError::binding("note text must not be empty"));
        }
        builder.add_field(1, self.text.as_str())?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            text: table.get_text(1)?.to_string(),
        })
    }
}

pub(crate) fn register_note(store: &StoreCore) {
    store.register(Note::TYPE, Note::ENTITY_NAME).unwrap();
}
