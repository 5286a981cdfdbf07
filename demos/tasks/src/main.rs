//! ObjBox Example - Task List
//!
//! This example demonstrates core ObjBox functionality:
//! - Opening a store and registering an entity type
//! - Mapping an entity to the object builder
//! - Put / get / remove, batch puts and async puts
//! - Filtering using native Rust iterators
//!
//! Run with: cargo run -p objbox_tasks_demo
//! Set `RUST_LOG=objbox=debug` to see store and box lifecycle events.

use objbox::flat::{FlatBuilder, FlatTable};
use objbox::{Config, EntityBinding, EntityTypeId, ObjectBox, ObxResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A task on the list.
#[derive(Debug, Clone, PartialEq)]
struct Task {
    id: u64,
    title: String,
    priority: i64,
    completed: bool,
}

impl Task {
    fn new(title: &str, priority: i64) -> Self {
        Self {
            id: 0,
            title: title.to_string(),
            priority,
            completed: false,
        }
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
        builder.start_object(id)?;
        builder.add_field(1, self.title.as_str())?;
        builder.add_field(2, self.priority)?;
        builder.add_field(3, self.completed)?;
        Ok(())
    }

    fn load(bytes: &[u8]) -> ObxResult<Self> {
        let table = FlatTable::parse(bytes)?;
        Ok(Self {
            id: table.id(),
            title: table.get_text(1)?.to_string(),
            priority: table.get_i64(2)?,
            completed: table.get_bool(3)?,
        })
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ob = ObjectBox::builder()
        .register::<Task>()
        .config(Config::new().async_queue_capacity(256))
        .build()?;
    let tasks = ob.box_for::<Task>()?;

    println!("=== ObjBox Task List ===\n");

    // Single put: the ID is assigned and written back.
    let mut groceries = Task::new("Buy groceries", 2);
    let id = tasks.put(&mut groceries)?;
    println!("Added task #{id}: {}", groceries.title);

    // Batch put in one transaction.
    let mut batch = vec![
        Task::new("Write report", 1),
        Task::new("Call plumber", 3),
        Task::new("Book flights", 2),
    ];
    let ids = tasks.put_all(&mut batch)?;
    println!("Added {} tasks in one batch: {ids:?}", ids.len());

    // Async puts are queued and committed in the background.
    for i in 1..=5 {
        tasks.put_async(&mut Task::new(&format!("Read chapter {i}"), 3))?;
    }
    ob.await_async_completion()?;
    info!(count = tasks.count()?, "async puts committed");

    // Update: a non-zero ID replaces the stored object.
    groceries.completed = true;
    tasks.put(&mut groceries)?;

    // Filtering is plain Rust over get_all.
    let mut open: Vec<Task> = tasks
        .get_all()?
        .into_iter()
        .filter(|t| !t.completed)
        .collect();
    open.sort_by_key(|t| (t.priority, t.id));

    println!("\nOpen tasks by priority:");
    for task in &open {
        println!("  [P{}] #{} {}", task.priority, task.id, task.title);
    }

    tasks.remove(id)?;
    println!("\nRemoved #{id}; {} tasks left", tasks.count()?);
    if tasks.get(id)?.is_none() {
        println!("#{id} is gone");
    }

    tasks.remove_all()?;
    println!("Cleared list; {} tasks left", tasks.count()?);

    ob.close()?;
    Ok(())
}
