//! Benchmark utilities.

use objbox::flat::{FlatBuilder, FlatTable};
use objbox::{EntityBinding, EntityTypeId, ObjectBox, ObxResult};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Entity used by the benchmarks.
#[derive(Debug, Clone)]
pub struct Record {
    /// Object ID.
    pub id: u64,
    /// Random text payload.
    pub payload: String,
    /// Random counter.
    pub counter: i64,
}

impl EntityBinding for Record {
    const ENTITY_TYPE_ID: EntityTypeId = EntityTypeId(1);
    const ENTITY_NAME: &'static str = "Record";

    fn id(&self) -> ObxResult<u64> {
        Ok(self.id)
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
        builder.start_object(id)?;
        builder.add_field(1, self.payload.as_str())?;
        builder.add_field(2, self.counter)?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            payload: table.get_text(1)?.to_string(),
            counter: table.get_i64(2)?,
        })
    }
}

/// Generate a record with a random payload of the specified size.
pub fn random_record(size: usize) -> Record {
    let mut rng = rand::thread_rng();
    Record {
        id: 0,
        payload: (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(size)
            .map(char::from)
            .collect(),
        counter: rng.gen(),
    }
}

/// Generate a batch of new records.
pub fn random_records(count: usize, size: usize) -> Vec<Record> {
    (0..count).map(|_| random_record(size)).collect()
}

/// Open a store with the record type registered.
pub fn open_store() -> ObxResult<ObjectBox> {
    ObjectBox::builder().register::<Record>().build()
}
