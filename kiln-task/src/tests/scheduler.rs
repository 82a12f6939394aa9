use super::{
    RecordingArch, assert_queue_consistent, idle_entry, ids, ready, resumed, scheduler,
    switch_log,
};
use crate::config::SchedulerConfig;
use crate::error::TaskError;
use crate::manager::TaskManager;
use crate::scheduler::Scheduler;
use crate::task::TaskId;

#[test]
fn bootstrap_task_is_the_only_ready_task() {
    let scheduler = scheduler();

    assert_eq!(ready(&scheduler), ids(&[1]));
    assert_eq!(scheduler.current_id(), TaskId::new(1));
    scheduler.with_manager(|manager| {
        assert_eq!(manager.task_count(), 1);
        assert!(!manager.task(TaskId::new(1)).unwrap().is_halted());
    });
}

#[test]
fn new_task_is_registered_but_not_ready() {
    let scheduler = scheduler();

    let id = scheduler.new_task(idle_entry, 0);

    assert_eq!(id, TaskId::new(2));
    assert_eq!(ready(&scheduler), ids(&[1]));
    scheduler.with_manager(|manager| assert!(manager.contains(id)));
}

#[test]
fn ids_are_assigned_in_order_and_never_reused() {
    let mut manager = TaskManager::new(SchedulerConfig::new().with_stack_bytes(1024));

    let created: Vec<u64> = (0..5).map(|_| manager.new_task().id().as_u64()).collect();

    assert_eq!(created, vec![2, 3, 4, 5, 6]);
    assert_eq!(manager.task_count(), 6);
}

#[test]
fn switching_alone_resumes_the_same_task() {
    let scheduler = scheduler();

    scheduler.switch_task(false);

    assert_eq!(switch_log(&scheduler), vec![(TaskId::new(1), TaskId::new(1))]);
    assert_eq!(ready(&scheduler), ids(&[1]));
}

#[test]
fn round_robin_runs_every_task_once_in_creation_order() {
    let scheduler = scheduler();
    for _ in 0..4 {
        scheduler.spawn(idle_entry, 0);
    }

    for _ in 0..10 {
        scheduler.switch_task(false);
    }

    assert_eq!(
        resumed(&scheduler),
        ids(&[2, 3, 4, 5, 1, 2, 3, 4, 5, 1])
    );
    assert_eq!(scheduler.current_id(), TaskId::new(1));
}

#[test]
fn switch_saves_the_running_task_and_resumes_the_new_front() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    scheduler.switch_task(false);
    scheduler.switch_task(false);

    assert_eq!(
        switch_log(&scheduler),
        vec![
            (TaskId::new(1), TaskId::new(2)),
            (TaskId::new(2), TaskId::new(3)),
        ]
    );
}

#[test]
fn sleeping_task_is_skipped_until_woken() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    // Task 2 gets the processor and puts itself to sleep.
    scheduler.switch_task(false);
    scheduler.current().sleep();
    assert_eq!(ready(&scheduler), ids(&[3, 1]));

    for _ in 0..3 {
        scheduler.switch_task(false);
    }
    assert_eq!(resumed(&scheduler)[2..], ids(&[1, 3, 1]));

    scheduler.wakeup(TaskId::new(2)).unwrap();
    scheduler.switch_task(false);
    scheduler.switch_task(false);
    assert_eq!(resumed(&scheduler)[5..], ids(&[3, 2]));
}

#[test]
fn sleeping_another_task_needs_no_switch() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    scheduler.sleep(TaskId::new(2)).unwrap();

    assert_eq!(scheduler.arch().switch_count(), 0);
    assert_eq!(ready(&scheduler), ids(&[1, 3]));

    for _ in 0..3 {
        scheduler.switch_task(false);
    }
    assert_eq!(resumed(&scheduler), ids(&[3, 1, 3]));

    scheduler.wakeup(TaskId::new(2)).unwrap();
    scheduler.switch_task(false);
    scheduler.switch_task(false);
    assert_eq!(resumed(&scheduler)[3..], ids(&[1, 2]));
}

#[test]
fn sleeping_the_running_task_switches_away_from_it() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);

    scheduler.sleep(TaskId::new(1)).unwrap();

    assert_eq!(switch_log(&scheduler), vec![(TaskId::new(1), TaskId::new(2))]);
    assert_eq!(ready(&scheduler), ids(&[2]));
}

#[test]
fn sleep_then_wakeup_moves_the_task_to_the_back() {
    for position in 1..4u64 {
        let scheduler = scheduler();
        for _ in 0..3 {
            scheduler.spawn(idle_entry, 0);
        }
        let id = TaskId::new(position + 1);

        scheduler.sleep(id).unwrap();
        scheduler.wakeup(id).unwrap();

        let queue = ready(&scheduler);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.last(), Some(&id));
    }
}

#[test]
fn sleep_then_wakeup_of_the_running_task_moves_it_to_the_back() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    scheduler.sleep(TaskId::new(1)).unwrap();
    scheduler.wakeup(TaskId::new(1)).unwrap();

    assert_eq!(ready(&scheduler), ids(&[2, 3, 1]));
}

#[test]
fn wakeup_of_a_ready_task_changes_nothing() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);
    let before = ready(&scheduler);

    scheduler.wakeup(TaskId::new(1)).unwrap();
    scheduler.wakeup(TaskId::new(2)).unwrap();
    scheduler.task(TaskId::new(3)).unwrap().wakeup();

    assert_eq!(ready(&scheduler), before);
    assert_eq!(scheduler.arch().switch_count(), 0);
}

#[test]
fn sleep_of_a_sleeping_task_changes_nothing() {
    let scheduler = scheduler();
    let id = scheduler.new_task(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);
    let before = ready(&scheduler);

    scheduler.sleep(id).unwrap();
    scheduler.task(id).unwrap().sleep().sleep();

    assert_eq!(ready(&scheduler), before);
    assert_eq!(scheduler.arch().switch_count(), 0);
}

#[test]
fn unknown_ids_are_reported() {
    let scheduler = scheduler();
    let missing = TaskId::new(42);

    assert_eq!(scheduler.sleep(missing), Err(TaskError::NoSuchTask(missing)));
    assert_eq!(scheduler.wakeup(missing), Err(TaskError::NoSuchTask(missing)));
    assert!(scheduler.task(missing).is_none());
    assert_eq!(ready(&scheduler), ids(&[1]));
}

#[test]
fn no_such_task_names_the_id() {
    let error = TaskError::NoSuchTask(TaskId::new(9));

    assert_eq!(format!("{}", error), "no such task: 9");
}

#[test]
fn last_ready_task_cannot_sleep() {
    let scheduler = scheduler();

    scheduler.current().sleep();

    assert_eq!(scheduler.arch().switch_count(), 0);
    assert_eq!(ready(&scheduler), ids(&[1]));
}

#[test]
fn halted_task_is_never_scheduled_again() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    // Task 2 runs and its entry function returns.
    scheduler.switch_task(false);
    scheduler.exit(TaskId::new(2));
    assert_eq!(resumed(&scheduler), ids(&[2, 3]));

    let halted = TaskId::new(2);
    assert!(scheduler.task(halted).unwrap().is_halted());
    assert_eq!(scheduler.wakeup(halted), Ok(()));
    scheduler.task(halted).unwrap().wakeup();
    assert_eq!(scheduler.sleep(halted), Ok(()));

    for _ in 0..6 {
        scheduler.switch_task(false);
    }
    assert!(!resumed(&scheduler)[2..].contains(&halted));
    scheduler.with_manager(|manager| {
        assert!(!manager.is_ready(halted));
        assert_eq!(manager.task_count(), 3);
    });
}

#[test]
fn halting_a_waiting_task_just_drops_it_from_the_queue() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    scheduler.spawn(idle_entry, 0);

    scheduler.exit(TaskId::new(3));

    assert_eq!(scheduler.arch().switch_count(), 0);
    assert_eq!(ready(&scheduler), ids(&[1, 2]));
}

#[test]
fn returning_last_ready_task_is_left_behind_once_another_wakes() {
    let scheduler = scheduler();
    scheduler.spawn(idle_entry, 0);
    let halted = TaskId::new(2);

    // Task 1 sleeps, task 2 runs alone and its entry function returns.
    scheduler.sleep(TaskId::new(1)).unwrap();
    scheduler.exit(halted);

    assert_eq!(scheduler.current_id(), halted);
    assert!(ready(&scheduler).is_empty());
    scheduler.switch_task(false);
    assert_eq!(resumed(&scheduler), ids(&[2]));

    scheduler.wakeup(TaskId::new(1)).unwrap();
    for _ in 0..4 {
        scheduler.switch_task(false);
    }

    assert_eq!(resumed(&scheduler), ids(&[2, 1, 1, 1, 1]));
    assert_eq!(ready(&scheduler), ids(&[1]));
    scheduler.with_manager(|manager| assert!(!manager.is_ready(halted)));
}

#[test]
fn tiny_stack_size_still_spawns() {
    let scheduler = Scheduler::new(
        RecordingArch::new(),
        SchedulerConfig::new().with_stack_bytes(64),
    );

    let id = scheduler.spawn(idle_entry, 0);
    scheduler.switch_task(false);

    assert_eq!(resumed(&scheduler), vec![id]);
    assert_eq!(ready(&scheduler), ids(&[2, 1]));
}

#[test]
fn queue_stays_consistent_under_arbitrary_operations() {
    let scheduler = scheduler();
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    let mut switches = 0;
    for _ in 0..2000 {
        let count = scheduler.with_manager(|manager| manager.task_count() as u64);
        let target = TaskId::new(next() % (count + 1) + 1);

        match next() % 9 {
            0 if count < 12 => {
                scheduler.spawn(idle_entry, 0);
            }
            1 => {
                let _ = scheduler.sleep(target);
            }
            2 | 3 => {
                let _ = scheduler.wakeup(target);
            }
            4 => {
                scheduler.with_manager(|manager| {
                    manager.new_task();
                });
            }
            5 => {
                scheduler.current().sleep();
            }
            6 if next() % 4 == 0 => {
                scheduler.exit(target);
            }
            _ => scheduler.switch_task(false),
        }

        assert_queue_consistent(&scheduler);

        let log = switch_log(&scheduler);
        for &(_, resumed_id) in &log[switches..] {
            let halted = scheduler
                .task(resumed_id)
                .is_some_and(|task| task.is_halted());
            assert!(!halted, "halted task {} was resumed", resumed_id);
        }
        switches = log.len();
    }
}
