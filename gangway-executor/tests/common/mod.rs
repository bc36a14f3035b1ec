//! Common test utilities for integration tests.

#![allow(dead_code)]

use gangway_core::error::{GangwayError, Result};
use gangway_core::event::Event;
use gangway_core::message::{Message, headers};
use gangway_core::process::{
    Attributes, Context, MemoryProcessManager, ProcessManager, ProcessManagerService, Task,
};
use gangway_core::types::{ActorId, TaskId};
use gangway_executor::actor::{Actor, ERROR, FireContext, INPUT, OUTPUT};
use gangway_executor::director::{Director, DirectorConfig, DirectorHandle};
use gangway_executor::model::Model;
use gangway_executor::observability::{TracingConfig, init_tracing};
use gangway_executor::task::{TaskActorConfig, TaskBasedActor, TaskProcessor};
use parking_lot::Mutex;
use std::sync::Arc;

/// Upper bound on cycles a test run may take.
pub const MAX_CYCLES: usize = 500;

/// A sink that records every message it receives.
pub struct Recorder {
    id: ActorId,
    received: Mutex<Vec<Message>>,
}

impl Recorder {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ActorId::new(name),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn received(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.received.lock().len()
    }
}

impl Actor for Recorder {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        if let Some(message) = ctx.token() {
            self.received.lock().push(message.clone());
        }
        Ok(())
    }
}

/// A source that fires once and sends its messages on `output`.
pub struct Emitter {
    id: ActorId,
    messages: Vec<Message>,
}

impl Emitter {
    pub fn new(name: &str, messages: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            id: ActorId::new(name),
            messages,
        })
    }

    pub fn texts(name: &str, count: usize) -> Arc<Self> {
        Self::new(name, (0..count).map(|i| Message::text(i.to_string())).collect())
    }
}

impl Actor for Emitter {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn initialize(&self, director: &DirectorHandle) -> Result<()> {
        director.fire_at_current_time(&self.id)
    }

    fn fire(&self, ctx: &FireContext<'_>) -> Result<()> {
        for message in &self.messages {
            ctx.send(OUTPUT, message.clone())?;
        }
        Ok(())
    }

    fn postfire(&self, _ctx: &FireContext<'_>) -> Result<bool> {
        Ok(false)
    }
}

/// Install a quiet subscriber; `GANGWAY_LOG_LEVEL` raises verbosity.
pub fn init_logging() {
    let filter = std::env::var("GANGWAY_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    // Another test may have installed it already.
    let _ = init_tracing(TracingConfig::builder().log_filter(filter).build());
}

/// Drive a director until it reports completion.
pub async fn drive(director: &Director) -> Result<usize> {
    init_logging();
    for cycle in 0..MAX_CYCLES {
        director.fire().await?;
        if !director.postfire() {
            return Ok(cycle + 1);
        }
    }
    panic!("director did not finish within {MAX_CYCLES} cycles");
}

/// How a [`ScriptedProcessor`] behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record the task; the test reports the outcome.
    Manual,
    /// Finish the task inside `process`.
    Finish,
    /// Fail inside `process`.
    FailProcess,
    /// Fail while preparing task attributes.
    FailPrepare,
}

/// Processor whose behaviour is chosen per test.
pub struct ScriptedProcessor {
    mode: Mode,
    tasks: Mutex<Vec<(Task, Arc<dyn ProcessManager>)>>,
    started: Mutex<Vec<TaskId>>,
    errors: Mutex<Vec<(TaskId, String)>>,
    replayed: Mutex<Vec<TaskId>>,
    restarted: Mutex<Vec<TaskId>>,
}

impl ScriptedProcessor {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            tasks: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            replayed: Mutex::new(Vec::new()),
            restarted: Mutex::new(Vec::new()),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Task and manager of the n-th processed task.
    pub fn handle(&self, index: usize) -> (TaskId, Arc<dyn ProcessManager>) {
        let tasks = self.tasks.lock();
        let (task, manager) = &tasks[index];
        (task.id, Arc::clone(manager))
    }

    pub fn errors(&self) -> Vec<(TaskId, String)> {
        self.errors.lock().clone()
    }

    pub fn started(&self) -> Vec<TaskId> {
        self.started.lock().clone()
    }

    pub fn replayed(&self) -> Vec<TaskId> {
        self.replayed.lock().clone()
    }

    pub fn restarted(&self) -> Vec<TaskId> {
        self.restarted.lock().clone()
    }
}

impl TaskProcessor for ScriptedProcessor {
    fn process(&self, task: &Task, manager: &Arc<dyn ProcessManager>) -> Result<()> {
        self.tasks.lock().push((task.clone(), Arc::clone(manager)));
        match self.mode {
            Mode::Finish => {
                manager.notify_started(Some(task.id))?;
                manager.notify_finished(Some(task.id))
            }
            Mode::FailProcess => Err(GangwayError::TaskProcessing {
                task: task.id,
                cause: "backend unavailable".into(),
            }),
            Mode::Manual | Mode::FailPrepare => Ok(()),
        }
    }

    fn add_task_attributes(
        &self,
        _message: &Message,
        _context: &Context,
        attributes: &mut Attributes,
    ) -> Result<()> {
        if self.mode == Mode::FailPrepare {
            return Err(GangwayError::InvalidMessage {
                actor: ActorId::new("flow.task"),
                cause: "missing order number".into(),
            });
        }
        attributes.insert("orderType".into(), "standard".into());
        Ok(())
    }

    fn on_task_started(&self, task: &Task) {
        self.started.lock().push(task.id);
    }

    fn on_task_error(&self, task: &Task, error: &str) {
        self.errors.lock().push((task.id, error.to_string()));
    }

    fn before_restart(&self, task: &Task, _context: &Context) {
        self.replayed.lock().push(task.id);
    }

    fn on_restart(&self, task: &Task, _context: &Context) {
        self.restarted.lock().push(task.id);
    }
}

/// A task-based actor wired to output and error recorders.
pub struct TaskFixture {
    pub service: Arc<ProcessManagerService>,
    pub actor: Arc<TaskBasedActor<ScriptedProcessor>>,
    pub out: Arc<Recorder>,
    pub err: Arc<Recorder>,
    pub director: Director,
}

impl TaskFixture {
    pub const ACTOR: &'static str = "flow.task";

    pub fn new(config: TaskActorConfig, mode: Mode) -> Self {
        Self::with_service(config, mode, ProcessManagerService::in_memory())
    }

    pub fn with_service(
        config: TaskActorConfig,
        mode: Mode,
        service: ProcessManagerService,
    ) -> Self {
        init_logging();
        let service = Arc::new(service);
        let actor = Arc::new(TaskBasedActor::new(
            ActorId::new(Self::ACTOR),
            config,
            ScriptedProcessor::new(mode),
            Arc::clone(&service),
        ));
        let out = Recorder::new("flow.out");
        let err = Recorder::new("flow.err");
        let model = Model::builder("flow")
            .actor(actor.clone())
            .actor(out.clone())
            .actor(err.clone())
            .connect(actor.id().port(OUTPUT), out.id().port(INPUT))
            .connect(actor.id().port(ERROR), err.id().port(INPUT))
            .build()
            .unwrap();
        let director = Director::new(model, DirectorConfig::default().with_dispatch_timeout_ms(20));
        Self {
            service,
            actor,
            out,
            err,
            director,
        }
    }

    /// Start a request and build a message belonging to it.
    pub fn start_request(&self) -> (Arc<MemoryProcessManager>, Message) {
        let manager = self
            .service
            .start_request("order-1", Attributes::new())
            .unwrap();
        let message = Message::for_context(manager.request().root)
            .with_header(headers::REQUEST_ID, manager.request_id().as_u64().to_string());
        (manager, message)
    }

    /// Queue a message for the task actor's input.
    pub fn deliver(&self, message: Message) {
        let from = ActorId::new("test.feed").port(OUTPUT);
        self.director
            .handle()
            .enqueue_event(Event::send(from, self.actor.id().port(INPUT), message))
            .unwrap();
    }

    /// Run one cycle per queued message.
    pub async fn fire_once(&self) {
        self.director.fire().await.unwrap();
    }
}
