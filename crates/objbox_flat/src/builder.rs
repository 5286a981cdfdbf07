//! Object builder.

use crate::error::{FlatError, FlatResult};
use crate::value::FieldValue;
use ciborium::Value as Cbor;

/// Capacity hint for a builder sized for a typical small object.
pub const DEFAULT_CAPACITY: usize = 256;

/// Handle to an ended object, consumed by [`FlatBuilder::finish`].
///
/// A handle is only valid for the builder generation that produced it;
/// finishing it after a [`FlatBuilder::reset`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ObjectRef {
    generation: u64,
}

#[derive(Debug)]
enum State {
    Empty,
    Building { id: u64, fields: Vec<(u16, FieldValue)> },
    Ended { id: u64, fields: Vec<(u16, FieldValue)> },
    Finished,
}

/// A reusable builder producing the byte form of one object at a time.
///
/// The protocol is `start_object` → `add_field`* → `end_object` → `finish`,
/// after which [`finished_bytes`](Self::finished_bytes) yields the result.
/// [`reset`](Self::reset) returns the builder to its empty state while
/// keeping the allocated buffer, so a long-lived builder amortizes its
/// allocation across objects.
#[derive(Debug)]
pub struct FlatBuilder {
    buffer: Vec<u8>,
    state: State,
    generation: u64,
}

impl Default for FlatBuilder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl FlatBuilder {
    /// Creates a builder with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with the given initial buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            state: State::Empty,
            generation: 0,
        }
    }

    /// Returns the capacity of the underlying buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Returns true if no object is in progress or finished.
    pub fn is_empty(&self) -> bool {
        matches!(self.state, State::Empty)
    }

    /// Starts a new object with the given ID.
    pub fn start_object(&mut self, id: u64) -> FlatResult<()> {
        match self.state {
            State::Empty => {
                self.state = State::Building {
                    id,
                    fields: Vec::new(),
                };
                Ok(())
            }
            _ => Err(FlatError::invalid_state(
                "start_object called while another object is in progress",
            )),
        }
    }

    /// Adds a field to the object in progress.
    pub fn add_field(&mut self, slot: u16, value: impl Into<FieldValue>) -> FlatResult<()> {
        match &mut self.state {
            State::Building { fields, .. } => {
                if fields.iter().any(|(s, _)| *s == slot) {
                    return Err(FlatError::DuplicateSlot { slot });
                }
                fields.push((slot, value.into()));
                Ok(())
            }
            _ => Err(FlatError::invalid_state(
                "add_field called outside start_object/end_object",
            )),
        }
    }

    /// Ends the object in progress.
    pub fn end_object(&mut self) -> FlatResult<ObjectRef> {
        match std::mem::replace(&mut self.state, State::Empty) {
            State::Building { id, fields } => {
                self.state = State::Ended { id, fields };
                Ok(ObjectRef {
                    generation: self.generation,
                })
            }
            other => {
                self.state = other;
                Err(FlatError::invalid_state("end_object called without start_object"))
            }
        }
    }

    /// Finishes the ended object, encoding it into the builder's buffer.
    pub fn finish(&mut self, object: ObjectRef) -> FlatResult<()> {
        if object.generation != self.generation {
            return Err(FlatError::invalid_state(
                "object handle belongs to a previous builder generation",
            ));
        }

        let (id, mut fields) = match std::mem::replace(&mut self.state, State::Empty) {
            State::Ended { id, fields } => (id, fields),
            other => {
                self.state = other;
                return Err(FlatError::invalid_state("finish called before end_object"));
            }
        };

        fields.sort_by_key(|(slot, _)| *slot);
        let table = Cbor::Array(vec![
            Cbor::Integer(id.into()),
            Cbor::Map(
                fields
                    .iter()
                    .map(|(slot, value)| (Cbor::Integer((*slot).into()), value.to_cbor()))
                    .collect(),
            ),
        ]);

        self.buffer.clear();
        if let Err(e) = ciborium::ser::into_writer(&table, &mut self.buffer) {
            self.buffer.clear();
            return Err(FlatError::encoding_failed(e.to_string()));
        }

        self.state = State::Finished;
        Ok(())
    }

    /// Returns the bytes of the finished object.
    pub fn finished_bytes(&self) -> FlatResult<&[u8]> {
        match self.state {
            State::Finished => Ok(&self.buffer),
            _ => Err(FlatError::invalid_state("no finished object")),
        }
    }

    /// Clears the builder for the next object, keeping its allocation.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Empty;
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::FlatTable;
    use proptest::prelude::*;

    fn build(builder: &mut FlatBuilder, id: u64, name: &str) {
        builder.start_object(id).unwrap();
        builder.add_field(1, name).unwrap();
        let object = builder.end_object().unwrap();
        builder.finish(object).unwrap();
    }

    #[test]
    fn build_and_read_back() {
        let mut builder = FlatBuilder::new();
        builder.start_object(42).unwrap();
        builder.add_field(2, 7i64).unwrap();
        builder.add_field(1, "alice").unwrap();
        let object = builder.end_object().unwrap();
        builder.finish(object).unwrap();

        let table = FlatTable::parse(builder.finished_bytes().unwrap()).unwrap();
        assert_eq!(table.id(), 42);
        assert_eq!(table.get_text(1).unwrap(), "alice");
        assert_eq!(table.get_i64(2).unwrap(), 7);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut builder = FlatBuilder::with_capacity(DEFAULT_CAPACITY);
        build(&mut builder, 1, "first");
        let capacity = builder.capacity();

        builder.reset();
        assert!(builder.is_empty());
        assert!(builder.capacity() >= capacity);
        assert!(builder.finished_bytes().is_err());
    }

    #[test]
    fn reused_builder_does_not_leak_fields() {
        let mut builder = FlatBuilder::new();
        builder.start_object(1).unwrap();
        builder.add_field(1, "first").unwrap();
        builder.add_field(9, "extra").unwrap();
        let object = builder.end_object().unwrap();
        builder.finish(object).unwrap();
        builder.reset();

        build(&mut builder, 2, "second");
        let table = FlatTable::parse(builder.finished_bytes().unwrap()).unwrap();
        assert_eq!(table.id(), 2);
        assert!(table.get_text(9).is_err());
    }

    #[test]
    fn nested_start_rejected() {
        let mut builder = FlatBuilder::new();
        builder.start_object(1).unwrap();
        assert!(matches!(
            builder.start_object(2),
            Err(FlatError::InvalidState { .. })
        ));
    }

    #[test]
    fn duplicate_slot_rejected() {
        let mut builder = FlatBuilder::new();
        builder.start_object(1).unwrap();
        builder.add_field(3, 1i64).unwrap();
        assert_eq!(
            builder.add_field(3, 2i64),
            Err(FlatError::DuplicateSlot { slot: 3 })
        );
    }

    #[test]
    fn finish_requires_end() {
        let mut builder = FlatBuilder::new();
        builder.start_object(1).unwrap();
        builder.add_field(1, "x").unwrap();
        let stale = ObjectRef { generation: 0 };
        assert!(builder.finish(stale).is_err());
        // still building, so ending works afterwards
        assert!(builder.end_object().is_ok());
    }

    #[test]
    fn stale_handle_rejected_after_reset() {
        let mut builder = FlatBuilder::new();
        builder.start_object(1).unwrap();
        let stale = builder.end_object().unwrap();
        builder.reset();
        builder.start_object(2).unwrap();
        let _ = builder.end_object().unwrap();
        assert!(builder.finish(stale).is_err());
    }

    #[test]
    fn add_field_without_start_rejected() {
        let mut builder = FlatBuilder::new();
        assert!(builder.add_field(1, true).is_err());
    }

    proptest! {
        #[test]
        fn text_and_int_fields_survive(id in 1u64.., name in ".*", n in any::<i64>()) {
            let mut builder = FlatBuilder::new();
            builder.start_object(id).unwrap();
            builder.add_field(1, name.as_str()).unwrap();
            builder.add_field(2, n).unwrap();
            let object = builder.end_object().unwrap();
            builder.finish(object).unwrap();

            let table = FlatTable::parse(builder.finished_bytes().unwrap()).unwrap();
            prop_assert_eq!(table.id(), id);
            prop_assert_eq!(table.get_text(1).unwrap(), name.as_str());
            prop_assert_eq!(table.get_i64(2).unwrap(), n);
        }
    }
}
