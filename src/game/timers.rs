//! Cooperative timers driven by the frame clock.
//!
//! Nothing runs in the background: the owning scene calls [`Timers::advance`]
//! once per frame and dispatches the returned actions itself. Every task
//! belongs to an owner so tearing the owner down cancels its tasks.

use super::{
    particles::EmitterId,
    world::EntityId
};

pub type TaskId = u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskOwner {
    Scene,
    Body(EntityId),
    Emitter(EmitterId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerAction {
    SpawnParticle(EmitterId),
    AgeParticles(EmitterId),
    DestroyBody(EntityId),
}

#[derive(Debug, Clone)]
struct ScheduledTask {
    id: TaskId,
    owner: TaskOwner,
    action: TimerAction,
    due_ms: f64,
    /// `None` for one-shot tasks.
    interval_ms: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FiredTask {
    pub task: TaskId,
    pub owner: TaskOwner,
    pub action: TimerAction,
}

#[derive(Debug, Default)]
pub struct Timers {
    now_ms: f64,
    next_task_id: TaskId,
    tasks: Vec<ScheduledTask>,
}

/// Shortest accepted interval, keeps a zero interval from looping forever.
const MIN_INTERVAL_MS: f64 = 1.0;

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn schedule_interval(&mut self, owner: TaskOwner, interval_ms: f64, action: TimerAction) -> TaskId {
        let interval_ms = interval_ms.max(MIN_INTERVAL_MS);
        self.push(owner, action, self.now_ms + interval_ms, Some(interval_ms))
    }

    pub fn schedule_once(&mut self, owner: TaskOwner, delay_ms: f64, action: TimerAction) -> TaskId {
        self.push(owner, action, self.now_ms + delay_ms.max(0.0), None)
    }

    fn push(&mut self, owner: TaskOwner, action: TimerAction, due_ms: f64, interval_ms: Option<f64>) -> TaskId {
        let id = self.next_task_id;
        self.next_task_id += 1;
        log::debug!("Scheduled task {id} for {owner:?}: {action:?}");
        self.tasks.push(ScheduledTask { id, owner, action, due_ms, interval_ms });
        id
    }

    /// Cancelling an unknown or already cancelled task is a no-op.
    pub fn cancel(&mut self, task: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != task);
        before != self.tasks.len()
    }

    pub fn cancel_owner(&mut self, owner: TaskOwner) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.owner != owner);
        let cancelled = before - self.tasks.len();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} tasks of {owner:?}");
        }
        cancelled
    }

    pub fn is_scheduled(&self, task: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == task)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Moves the clock to `now_ms` and returns every firing that became due,
    /// ordered by due time. A task fires at most once per call: an interval
    /// that fell behind by more than one period skips the missed periods and
    /// is rescheduled one interval after `now_ms`.
    pub fn advance(&mut self, now_ms: f64) -> Vec<FiredTask> {
        if now_ms < self.now_ms {
            log::warn!("Timer clock went backwards ({} -> {now_ms}), ignoring", self.now_ms);
            return vec![];
        }
        self.now_ms = now_ms;

        let mut fired: Vec<(f64, FiredTask)> = vec![];
        for task in self.tasks.iter_mut().filter(|t| t.due_ms <= now_ms) {
            fired.push((task.due_ms, FiredTask { task: task.id, owner: task.owner, action: task.action }));
            task.due_ms = match task.interval_ms {
                Some(interval) if task.due_ms + interval > now_ms => task.due_ms + interval,
                Some(interval) => {
                    log::trace!("Task {} fell behind, skipping to {}", task.id, now_ms + interval);
                    now_ms + interval
                },
                None => f64::INFINITY,
            };
        }
        self.tasks.retain(|t| t.due_ms.is_finite());

        fired.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        fired.into_iter().map(|(_, f)| f).collect()
    }
}

#[test]
fn test_interval_fires_per_elapsed_period() {
    let mut timers = Timers::new();
    let task = timers.schedule_interval(TaskOwner::Emitter(1), 100.0, TimerAction::SpawnParticle(1));

    assert!(timers.advance(50.0).is_empty());
    assert_eq!(timers.advance(100.0).len(), 1);
    assert!(timers.advance(150.0).is_empty());
    let fired = timers.advance(200.0);
    assert_eq!(fired.len(), 1);
    assert!(fired.iter().all(|f| f.task == task && f.action == TimerAction::SpawnParticle(1)));
    assert!(timers.is_scheduled(task));
}

#[test]
fn test_long_gap_fires_interval_once() {
    let mut timers = Timers::new();
    timers.schedule_interval(TaskOwner::Emitter(1), 10.0, TimerAction::SpawnParticle(1));

    assert_eq!(timers.advance(16.0).len(), 1);
    // A minute without frames, e.g. a hidden tab.
    assert_eq!(timers.advance(60_016.0).len(), 1);
    assert!(timers.advance(60_020.0).is_empty());
    assert_eq!(timers.advance(60_026.0).len(), 1);
}

#[test]
fn test_once_fires_and_disappears() {
    let mut timers = Timers::new();
    let task = timers.schedule_once(TaskOwner::Body(4), 10.0, TimerAction::DestroyBody(4));
    assert_eq!(timers.advance(1000.0).len(), 1);
    assert!(!timers.is_scheduled(task));
    assert!(timers.advance(2000.0).is_empty());
}

#[test]
fn test_cancel_is_idempotent_and_per_owner() {
    let mut timers = Timers::new();
    let a = timers.schedule_interval(TaskOwner::Emitter(1), 10.0, TimerAction::SpawnParticle(1));
    timers.schedule_interval(TaskOwner::Emitter(1), 1000.0, TimerAction::AgeParticles(1));
    timers.schedule_interval(TaskOwner::Emitter(2), 10.0, TimerAction::SpawnParticle(2));

    assert!(timers.cancel(a));
    assert!(!timers.cancel(a));
    assert_eq!(timers.cancel_owner(TaskOwner::Emitter(1)), 1);
    assert_eq!(timers.cancel_owner(TaskOwner::Emitter(1)), 0);

    let fired = timers.advance(10.0);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].owner, TaskOwner::Emitter(2));
}

#[test]
fn test_fired_tasks_are_ordered_by_due_time() {
    let mut timers = Timers::new();
    timers.schedule_interval(TaskOwner::Scene, 30.0, TimerAction::AgeParticles(9));
    timers.schedule_interval(TaskOwner::Scene, 20.0, TimerAction::SpawnParticle(9));
    let actions: Vec<_> = timers.advance(60.0).into_iter().map(|f| f.action).collect();
    assert_eq!(actions, vec![TimerAction::SpawnParticle(9), TimerAction::AgeParticles(9)]);
}
