//! Integration tests for task-based actors.
//!
//! Tests verify that:
//! - A task keeps the director alive until it reports an outcome
//! - Racing outcomes produce exactly one effect
//! - Failures are routed by the configured strategy
//! - Restarted requests resume at the right task
//! - A finishing actor waits for its pending tasks

mod common;

use common::{Mode, TaskFixture, drive};
use gangway_core::message::headers;
use gangway_core::error::{GangwayError, Result};
use gangway_core::process::{
    Attributes, ProcessManager, ProcessManagerService, ProcessPersister, Status, Task, attributes,
};
use gangway_executor::actor::Actor;
use gangway_executor::task::{ErrorControlStrategy, TaskActorConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[tokio::test]
async fn finished_task_forwards_the_message() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Finish);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message.clone());

    drive(&fixture.director).await.unwrap();

    let out = fixture.out.received();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id(), message.id());
    assert_eq!(fixture.err.count(), 0);

    let task = &fixture.actor.processor().tasks()[0];
    assert_eq!(fixture.actor.processor().started(), vec![task.id]);
    assert_eq!(manager.store().task_status(task.id).unwrap(), Status::Finished);
    assert_eq!(manager.subscriber_count(task.id), 0);
    assert!(fixture.actor.pending().is_empty());
    fixture.director.wrapup().await.unwrap();
}

#[tokio::test]
async fn task_records_attributes_and_entries() {
    let config = TaskActorConfig::new()
        .with_task_type("quote")
        .with_result_type("price")
        .with_result_tag("final");
    let fixture = TaskFixture::new(config, Mode::Finish);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message);
    drive(&fixture.director).await.unwrap();

    let task = &fixture.actor.processor().tasks()[0];
    assert_eq!(task.task_type, "quote");
    assert_eq!(task.initiator, "actor:/flow.task");
    assert_eq!(task.parent_context, manager.request().root);
    let attrs = &task.attributes;
    assert_eq!(attrs[attributes::CREATOR], "flow.task");
    assert_eq!(attrs[attributes::REFERENCE_ID], "order-1");
    assert_eq!(attrs[attributes::REQUEST_ID], manager.request_id().as_u64().to_string());
    assert_eq!(attrs[attributes::RESULT_TYPE], "price");
    assert_eq!(attrs["orderType"], "standard");

    let context = manager.store().context(task.context).unwrap();
    assert_eq!(context.entries[attributes::RESULT_TAG], "final");
}

#[tokio::test]
async fn task_type_defaults_to_actor_name() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    assert_eq!(fixture.actor.task_type(), "task");
    assert_eq!(fixture.actor.initiator(), "actor:/flow.task");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_task_keeps_the_director_alive() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (_manager, message) = fixture.start_request();
    fixture.deliver(message);

    // Deliver, then spin on an empty queue with the task outstanding.
    assert!(fixture.director.fire().await.unwrap());
    assert!(fixture.director.fire().await.unwrap());
    assert!(fixture.director.postfire());
    assert_eq!(fixture.director.handle().liveness().busy_task_count(), 1);

    let (task, manager) = fixture.actor.processor().handle(0);
    thread::spawn(move || manager.notify_finished(Some(task)).unwrap())
        .join()
        .unwrap();

    drive(&fixture.director).await.unwrap();
    assert_eq!(fixture.out.count(), 1);
    assert_eq!(fixture.director.handle().liveness().busy_task_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_outcomes_have_a_single_effect() {
    for _ in 0..20 {
        let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
        fixture.director.initialize().unwrap();
        let (_manager, message) = fixture.start_request();
        fixture.deliver(message);
        fixture.fire_once().await;

        let (task, manager) = fixture.actor.processor().handle(0);
        let barrier = Arc::new(Barrier::new(3));
        let racers: Vec<_> = (0..3)
            .map(|i| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match i {
                        0 => manager.notify_finished(Some(task)),
                        1 => manager.notify_error(Some(task), "lost connection".into()),
                        _ => manager.notify_timed_out(Some(task)),
                    }
                    .unwrap();
                })
            })
            .collect();
        for racer in racers {
            racer.join().unwrap();
        }

        drive(&fixture.director).await.unwrap();
        assert_eq!(fixture.out.count() + fixture.err.count(), 1);
        assert_eq!(fixture.director.handle().liveness().busy_task_count(), 0);
        assert!(fixture.actor.pending().is_empty());
        fixture.director.wrapup().await.unwrap();
    }
}

#[tokio::test]
async fn error_via_error_port_emits_an_error_message() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (_manager, message) = fixture.start_request();
    fixture.deliver(message.clone());
    fixture.fire_once().await;

    let (task, manager) = fixture.actor.processor().handle(0);
    manager
        .notify_error(Some(task), "lost connection".into())
        .unwrap();
    drive(&fixture.director).await.unwrap();

    let errors = fixture.err.received();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].caused_by(), Some(message.id()));
    assert_eq!(errors[0].header(headers::ERROR_CODE), Some("TASK_ERROR"));
    let text = errors[0].header(headers::ERROR_MESSAGE).unwrap();
    assert!(text.contains("lost connection"));
    assert!(text.contains(&task.to_string()));
    assert_eq!(
        fixture.actor.processor().errors(),
        vec![(task, "lost connection".to_string())]
    );
    assert_eq!(fixture.out.count(), 0);
}

#[tokio::test]
async fn timeout_is_routed_with_its_own_code() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (_manager, message) = fixture.start_request();
    fixture.deliver(message);
    fixture.fire_once().await;

    let (task, manager) = fixture.actor.processor().handle(0);
    manager.notify_timed_out(Some(task)).unwrap();
    drive(&fixture.director).await.unwrap();

    let errors = fixture.err.received();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].header(headers::ERROR_CODE), Some("TASK_TIMEOUT"));
    assert!(fixture.actor.processor().errors().is_empty());
}

#[tokio::test]
async fn continue_strategies_forward_the_original() {
    for (strategy, on_output) in [
        (ErrorControlStrategy::ContinueViaOutput, true),
        (ErrorControlStrategy::ContinueViaErrorPort, false),
    ] {
        let fixture = TaskFixture::new(
            TaskActorConfig::new().with_error_strategy(strategy),
            Mode::Manual,
        );
        fixture.director.initialize().unwrap();
        let (_manager, message) = fixture.start_request();
        fixture.deliver(message.clone());
        fixture.fire_once().await;

        let (task, manager) = fixture.actor.processor().handle(0);
        manager.notify_error(Some(task), "rejected".into()).unwrap();
        drive(&fixture.director).await.unwrap();

        let (hit, miss) = if on_output {
            (&fixture.out, &fixture.err)
        } else {
            (&fixture.err, &fixture.out)
        };
        let received = hit.received();
        assert_eq!(received.len(), 1, "{strategy}");
        assert_eq!(received[0].id(), message.id());
        assert!(!received[0].has_header(headers::ERROR_CODE));
        assert_eq!(miss.count(), 0);
    }
}

#[tokio::test]
async fn process_failure_is_reported_on_the_task() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::FailProcess);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message);
    drive(&fixture.director).await.unwrap();

    let task = fixture.actor.processor().tasks()[0].id;
    assert_eq!(manager.store().task_status(task).unwrap(), Status::Error);
    let errors = fixture.err.received();
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0]
            .header(headers::ERROR_MESSAGE)
            .unwrap()
            .contains("backend unavailable")
    );
}

#[tokio::test]
async fn preparation_failure_is_attached_to_the_created_task() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::FailPrepare);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message);
    drive(&fixture.director).await.unwrap();

    // process never ran, yet the task exists and carries the failure
    assert_eq!(fixture.actor.processor().task_count(), 0);
    let tasks = manager.store().tasks_of(manager.request().root).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(manager.store().task_status(tasks[0].id).unwrap(), Status::Error);

    let errors = fixture.err.received();
    assert_eq!(errors.len(), 1);
    let text = errors[0].header(headers::ERROR_MESSAGE).unwrap();
    assert!(text.contains("ACTOR_EXECUTION_FATAL"));
    assert!(text.contains("missing order number"));
}

/// Persister whose sessions open but whose writes always fail.
struct RejectingPersister;

impl ProcessPersister for RejectingPersister {
    fn open(&self, _transactional: bool) -> Result<bool> {
        Ok(true)
    }

    fn persist_task(&self, task: &Task) -> Result<()> {
        Err(GangwayError::Persistence {
            task: task.id,
            cause: "store is read-only".into(),
        })
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn persist_failure_is_routed_and_releases_the_task() {
    let fixture = TaskFixture::with_service(
        TaskActorConfig::new(),
        Mode::Finish,
        ProcessManagerService::new(Arc::new(RejectingPersister)),
    );
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message);
    drive(&fixture.director).await.unwrap();

    // the task never reached the processor
    assert_eq!(fixture.actor.processor().task_count(), 0);
    let tasks = manager.store().tasks_of(manager.request().root).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(manager.store().task_status(tasks[0].id).unwrap(), Status::Error);

    assert_eq!(fixture.out.count(), 0);
    let errors = fixture.err.received();
    assert_eq!(errors.len(), 1);
    let text = errors[0].header(headers::ERROR_MESSAGE).unwrap();
    assert!(text.contains("ACTOR_EXECUTION_FATAL"));
    assert!(text.contains("store is read-only"));
    assert_eq!(fixture.director.handle().liveness().busy_task_count(), 0);
    assert!(fixture.actor.pending().is_empty());
}

#[tokio::test]
async fn condition_tags_gate_processing() {
    let fixture = TaskFixture::new(
        TaskActorConfig::new().with_condition_tags("urgent, vip"),
        Mode::Finish,
    );
    fixture.director.initialize().unwrap();
    let (_manager, plain) = fixture.start_request();
    let (_manager, tagged) = fixture.start_request();
    let tagged = tagged.with_header("vip", "yes");
    fixture.deliver(plain.clone());
    fixture.deliver(tagged);
    drive(&fixture.director).await.unwrap();

    assert_eq!(fixture.actor.processor().task_count(), 1);
    let out = fixture.out.received();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].id(), plain.id());
}

#[tokio::test]
async fn cancelled_task_only_stops_listening() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (_manager, message) = fixture.start_request();
    fixture.deliver(message);
    fixture.fire_once().await;

    let (task, manager) = fixture.actor.processor().handle(0);
    manager.notify_cancelled(Some(task)).unwrap();
    // A late outcome is ignored.
    manager.notify_finished(Some(task)).unwrap();
    drive(&fixture.director).await.unwrap();

    assert_eq!(fixture.out.count() + fixture.err.count(), 0);
    assert!(fixture.actor.pending().is_empty());
    assert_eq!(fixture.director.handle().liveness().busy_task_count(), 0);
}

#[tokio::test]
async fn stopped_request_interrupts_pending_tasks() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    fixture.deliver(message);
    fixture.fire_once().await;

    manager.stop().unwrap();
    drive(&fixture.director).await.unwrap();

    let task = fixture.actor.processor().tasks()[0].id;
    assert_eq!(manager.store().task_status(task).unwrap(), Status::Interrupted);
    assert_eq!(fixture.out.count() + fixture.err.count(), 0);
    assert!(fixture.actor.pending().is_empty());
}

#[tokio::test]
async fn restart_resumes_at_the_most_recent_restarted_task() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    let root = manager.request().root;
    let initiator = fixture.actor.initiator().to_string();

    let t1 = manager.create_task(root, &initiator, "task", Attributes::new()).unwrap();
    manager.notify_finished(Some(t1.id)).unwrap();
    let t2 = manager.create_task(root, &initiator, "task", Attributes::new()).unwrap();
    manager.notify_cancelled(Some(t2.id)).unwrap();
    let t3 = manager.create_task(root, &initiator, "task", Attributes::new()).unwrap();
    manager.restart(t3.id).unwrap();
    assert!(manager.is_restarting().unwrap());

    fixture.deliver(message);
    fixture.fire_once().await;

    let processor = fixture.actor.processor();
    assert_eq!(processor.restarted(), vec![t3.id]);
    assert!(processor.replayed().is_empty());
    assert_eq!(manager.store().task_status(t3.id).unwrap(), Status::Cancelled);
    assert!(!manager.is_restarting().unwrap());

    // New work started for the resumed task.
    assert_eq!(processor.task_count(), 1);
    let (task, manager) = processor.handle(0);
    assert_ne!(task, t3.id);
    manager.notify_finished(Some(task)).unwrap();
    drive(&fixture.director).await.unwrap();
    assert_eq!(fixture.out.count(), 1);
}

#[tokio::test]
async fn restart_replays_a_finished_task() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (manager, message) = fixture.start_request();
    let root = manager.request().root;
    let initiator = fixture.actor.initiator().to_string();

    let t1 = manager.create_task(root, &initiator, "task", Attributes::new()).unwrap();
    manager.notify_finished(Some(t1.id)).unwrap();
    let cancelled = manager.create_task(root, &initiator, "task", Attributes::new()).unwrap();
    manager.notify_cancelled(Some(cancelled.id)).unwrap();
    let later = manager
        .create_task(root, "actor:/flow.later", "later", Attributes::new())
        .unwrap();
    manager.restart(later.id).unwrap();

    fixture.deliver(message.clone());
    drive(&fixture.director).await.unwrap();

    let processor = fixture.actor.processor();
    assert_eq!(processor.replayed(), vec![t1.id]);
    assert_eq!(processor.task_count(), 0);
    let out = fixture.out.received();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id(), message.id());
    // Downstream actors keep resuming.
    assert!(manager.is_restarting().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn quiescing_waits_for_every_pending_task() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    for _ in 0..2 {
        let (_manager, message) = fixture.start_request();
        fixture.deliver(message);
        fixture.fire_once().await;
    }
    assert_eq!(fixture.actor.pending().len(), 2);

    let drained = Arc::new(AtomicBool::new(false));
    let waiter = {
        let actor = Arc::clone(&fixture.actor);
        let drained = Arc::clone(&drained);
        thread::spawn(move || {
            let result = actor.pending().wait_until_drained(Duration::from_millis(10));
            drained.store(true, Ordering::SeqCst);
            result
        })
    };

    let processor = fixture.actor.processor();
    thread::sleep(Duration::from_millis(50));
    assert!(!drained.load(Ordering::SeqCst));

    let (first, manager) = processor.handle(0);
    manager.notify_finished(Some(first)).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert!(!drained.load(Ordering::SeqCst));

    let (second, manager) = processor.handle(1);
    manager.notify_finished(Some(second)).unwrap();
    assert!(waiter.join().unwrap());
    assert!(drained.load(Ordering::SeqCst));
}

#[tokio::test]
async fn finishing_actor_becomes_inactive() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Finish);
    fixture.director.initialize().unwrap();
    fixture.actor.request_finish();

    let (_manager, first) = fixture.start_request();
    let (_manager, second) = fixture.start_request();
    fixture.deliver(first);
    fixture.deliver(second);
    drive(&fixture.director).await.unwrap();

    assert!(fixture.director.handle().is_actor_inactive(fixture.actor.id()));
    assert_eq!(fixture.actor.processor().task_count(), 1);
    assert_eq!(fixture.out.count(), 1);
}

#[tokio::test]
async fn wrapup_releases_a_blocked_quiesce() {
    let fixture = TaskFixture::new(TaskActorConfig::new(), Mode::Manual);
    fixture.director.initialize().unwrap();
    let (_manager, message) = fixture.start_request();
    fixture.deliver(message);
    fixture.fire_once().await;

    let waiter = {
        let actor = Arc::clone(&fixture.actor);
        thread::spawn(move || actor.pending().wait_until_drained(Duration::from_millis(10)))
    };
    thread::sleep(Duration::from_millis(20));
    fixture.actor.wrapup().unwrap();
    assert!(!waiter.join().unwrap());
}
