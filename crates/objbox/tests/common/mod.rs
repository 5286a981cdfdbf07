//! Shared entity and store setup for the integration tests.

#![allow(dead_code)]

use objbox::flat::{FlatBuilder, FlatTable};
use objbox::{Config, EntityBinding, EntityBox, EntityTypeId, ObjectBox, ObxError, ObxResult};
use std::sync::{Arc, Barrier};

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub priority: i64,
    pub done: bool,
}

impl Task {
    pub fn new(text: impl Into<String>, priority: i64) -> Self {
        Self {
            id: 0,
            text: text.into(),
            priority,
            done: false,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }
}

impl EntityBinding for Task {
    const ENTITY_TYPE_ID: EntityTypeId = EntityTypeId(1);
    const ENTITY_NAME: &'static str = "Task";

    fn id(&self) -> ObxResult<u64> {
        Ok(self.id)
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
        if self.priority < 0 {
            return Err(ObxError::binding("priority must not be negative"));
        }
        builder.start_object(id)?;
        builder.add_field(1, self.text.as_str())?;
        builder.add_field(2, self.priority)?;
        builder.add_field(3, self.done)?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            text: table.get_text(1)?.to_string(),
            priority: table.get_i64(2)?,
            done: table.get_bool(3)?,
        })
    }
}

/// A second entity type, to check that boxes do not see each other's objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

impl EntityBinding for Tag {
    const ENTITY_TYPE_ID: EntityTypeId = EntityTypeId(2);
    const ENTITY_NAME: &'static str = "Tag";

    fn id(&self) -> ObxResult<u64> {
        Ok(self.id)
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
        builder.start_object(id)?;
        builder.add_field(1, self.name.as_str())?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            name: table.get_text(1)?.to_string(),
        })
    }
}

/// Two rendezvous points a `Gated` object waits on while being flattened.
pub struct Gate {
    pub entered: Barrier,
    pub release: Barrier,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }
}

/// An entity whose flatten can block, holding its write transaction open.
pub struct Gated {
    pub id: u64,
    pub label: String,
    pub gate: Option<Arc<Gate>>,
}

impl Gated {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: 0,
            label: label.into(),
            gate: None,
        }
    }

    pub fn gated(label: impl Into<String>, gate: &Arc<Gate>) -> Self {
        Self {
            gate: Some(Arc::clone(gate)),
            ..Self::new(label)
        }
    }
}

impl EntityBinding for Gated {
    const ENTITY_TYPE_ID: EntityTypeId = EntityTypeId(3);
    const ENTITY_NAME: &'static str = "Gated";

    fn id(&self) -> ObxResult<u64> {
        Ok(self.id)
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn flatten(&self, builder: &mut FlatBuilder, id: u64) -> ObxResult<()> {
        if let Some(gate) = &self.gate {
            gate.entered.wait();
            gate.release.wait();
        }
        builder.start_object(id)?;
        builder.add_field(1, self.label.as_str())?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            label: table.get_text(1)?.to_string(),
            gate: None,
        })
    }
}

pub fn open_store(config: Config) -> ObjectBox {
    ObjectBox::builder()
        .register::<Task>()
        .register::<Tag>()
        .register::<Gated>()
        .config(config)
        .build()
        .expect("store opens")
}

pub fn open_tasks() -> (ObjectBox, EntityBox<Task>) {
    let ob = open_store(Config::default());
    let tasks = ob.box_for::<Task>().expect("task box opens");
    (ob, tasks)
}
