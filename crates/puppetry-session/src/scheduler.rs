//! Single-threaded cooperative timers.
//!
//! Tasks are plain callbacks run one after another on the calling thread.
//! Each run decides when (or whether) the task runs again.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use puppetry_transport::Connection;
use tracing::{debug, trace};

use crate::session::{Session, SessionState};

/// Re-arm interval used for [`Rearm::Default`].
pub const DEFAULT_REARM: Duration = Duration::from_secs(1);

/// Longest single sleep in [`Scheduler::run`], so a stop request is noticed
/// promptly.
const MAX_SLEEP: Duration = Duration::from_millis(100);

/// What a task wants after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rearm {
    /// Run again after this delay.
    After(Duration),
    /// Run again after the scheduler's fallback interval.
    Default,
    /// Never run again.
    Cancel,
}

struct Task<'a> {
    name: String,
    deadline: Instant,
    callback: Box<dyn FnMut() -> Rearm + 'a>,
}

/// A timer queue driven by [`run_once`](Self::run_once) or
/// [`run`](Self::run).
pub struct Scheduler<'a> {
    tasks: Vec<Task<'a>>,
    fallback: Duration,
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scheduler<'a> {
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_REARM)
    }

    pub fn with_fallback(fallback: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            fallback,
        }
    }

    /// Schedule `callback` to first run `first_delay` from now.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        first_delay: Duration,
        callback: impl FnMut() -> Rearm + 'a,
    ) {
        self.register_at(name, Instant::now() + first_delay, callback);
    }

    /// Schedule `callback` to first run at `deadline`.
    pub fn register_at(
        &mut self,
        name: impl Into<String>,
        deadline: Instant,
        callback: impl FnMut() -> Rearm + 'a,
    ) {
        let name = name.into();
        debug!(task = %name, "task registered");
        self.tasks.push(Task {
            name,
            deadline,
            callback: Box::new(callback),
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest pending deadline, if any task remains.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.tasks.iter().map(|task| task.deadline).min()
    }

    /// Run every task due at `now`, in registration order, and return the
    /// next deadline.
    pub fn run_once(&mut self, now: Instant) -> Option<Instant> {
        let fallback = self.fallback;
        self.tasks.retain_mut(|task| {
            if task.deadline > now {
                return true;
            }
            trace!(task = %task.name, "running task");
            match (task.callback)() {
                Rearm::After(delay) => {
                    task.deadline = now + delay;
                    true
                }
                Rearm::Default => {
                    task.deadline = now + fallback;
                    true
                }
                Rearm::Cancel => {
                    debug!(task = %task.name, "task cancelled");
                    false
                }
            }
        });
        self.next_deadline()
    }

    /// Run tasks until `stop` is set or no task remains.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            let Some(next) = self.run_once(Instant::now()) else {
                debug!("no tasks left");
                return;
            };
            let wait = next.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                thread::sleep(wait.min(MAX_SLEEP));
            }
        }
        debug!("scheduler stopped");
    }
}

/// Register the network pump and pose sampler ticks for `session`.
///
/// While the session is active the sampler runs every update interval, even
/// before the server's first message, so the first pose follows the
/// greeting within one interval. Both ticks cancel themselves once the
/// session is closed, so [`Scheduler::run`] returns when the connection
/// ends.
pub fn drive<'a, C: Connection + 'a>(session: Rc<RefCell<Session<C>>>, scheduler: &mut Scheduler<'a>) {
    let (pump_interval, update_interval) = {
        let session = session.borrow();
        (session.config().pump_interval, session.config().update_interval())
    };

    let pump_session = Rc::clone(&session);
    scheduler.register("pump", Duration::ZERO, move || {
        let mut session = pump_session.borrow_mut();
        if let Err(err) = session.pump_io() {
            debug!(error = %err, "pump tick ended");
        }
        if session.state() == SessionState::Closed {
            Rearm::Cancel
        } else {
            Rearm::After(pump_interval)
        }
    });

    scheduler.register("sample", Duration::ZERO, move || {
        let mut session = session.borrow_mut();
        let sent = session.sample_and_send();
        if session.state() == SessionState::Closed {
            return Rearm::Cancel;
        }
        match sent {
            Ok(_) => Rearm::After(update_interval),
            Err(err) => {
                debug!(error = %err, "sample tick ended");
                Rearm::Cancel
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::config::SessionConfig;
    use crate::pose::{PoseSnapshot, Quaternion, StaticPose};
    use crate::testing::{greeting, MockConnection};

    #[test]
    fn runs_due_tasks_and_rearms() {
        let count = Cell::new(0);
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.register_at("tick", t0, || {
            count.set(count.get() + 1);
            Rearm::After(Duration::from_millis(10))
        });

        assert_eq!(scheduler.run_once(t0), Some(t0 + Duration::from_millis(10)));
        assert_eq!(count.get(), 1);

        // Not yet due.
        scheduler.run_once(t0 + Duration::from_millis(5));
        assert_eq!(count.get(), 1);

        scheduler.run_once(t0 + Duration::from_millis(10));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn default_uses_fallback_interval() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::with_fallback(Duration::from_millis(250));
        scheduler.register_at("idle", t0, || Rearm::Default);
        assert_eq!(
            scheduler.run_once(t0),
            Some(t0 + Duration::from_millis(250))
        );
        assert_eq!(Scheduler::new().fallback, DEFAULT_REARM);
    }

    #[test]
    fn cancel_removes_task() {
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.register_at("once", t0, || Rearm::Cancel);
        scheduler.register_at("later", t0 + Duration::from_secs(60), || Rearm::Cancel);
        assert_eq!(scheduler.len(), 2);

        assert_eq!(
            scheduler.run_once(t0),
            Some(t0 + Duration::from_secs(60))
        );
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn due_tasks_run_in_registration_order() {
        let order = RefCell::new(Vec::new());
        let t0 = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.register_at("a", t0, || {
            order.borrow_mut().push("a");
            Rearm::Cancel
        });
        scheduler.register_at("b", t0, || {
            order.borrow_mut().push("b");
            Rearm::Cancel
        });

        assert_eq!(scheduler.run_once(t0), None);
        drop(scheduler);
        assert_eq!(order.into_inner(), vec!["a", "b"]);
    }

    #[test]
    fn run_returns_when_stopped() {
        let stop = AtomicBool::new(false);
        let count = Cell::new(0);
        let mut scheduler = Scheduler::new();
        scheduler.register("ticker", Duration::ZERO, || {
            count.set(count.get() + 1);
            if count.get() == 3 {
                stop.store(true, Ordering::Relaxed);
            }
            Rearm::After(Duration::from_millis(1))
        });

        scheduler.run(&stop);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn run_returns_when_no_tasks_remain() {
        let stop = AtomicBool::new(false);
        let mut scheduler = Scheduler::new();
        scheduler.register("once", Duration::ZERO, || Rearm::Cancel);
        scheduler.run(&stop);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn drive_pumps_samples_and_stops_on_close() {
        let mock = MockConnection::new();
        let mut pose = PoseSnapshot::new();
        pose.push("head", Quaternion::IDENTITY);
        let session = Rc::new(RefCell::new(
            Session::with_connection(mock.clone(), SessionConfig::default())
                .with_pose_source(StaticPose(pose)),
        ));

        mock.push_message(&greeting("abc"));
        mock.push_close();

        let mut scheduler = Scheduler::new();
        drive(Rc::clone(&session), &mut scheduler);
        let t0 = Instant::now();
        assert_eq!(scheduler.len(), 2);

        // Pump reads the greeting, then the sampler sends the pose.
        let next = scheduler.run_once(t0);
        assert_eq!(next, Some(t0 + Duration::from_millis(10)));
        assert_eq!(session.borrow().server_pump(), Some("abc"));
        assert_eq!(session.borrow().stats().frames_sent, 1);

        // Pump observes the close and cancels itself.
        let next = scheduler.run_once(t0 + Duration::from_millis(10));
        assert_eq!(next, Some(t0 + Duration::from_millis(100)));
        assert_eq!(session.borrow().state(), SessionState::Closed);
        assert_eq!(scheduler.len(), 1);

        assert_eq!(scheduler.run_once(t0 + Duration::from_millis(100)), None);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn first_pose_follows_greeting_within_one_interval() {
        let mock = MockConnection::new();
        let mut pose = PoseSnapshot::new();
        pose.push("head", Quaternion::IDENTITY);
        let session = Rc::new(RefCell::new(
            Session::with_connection(mock.clone(), SessionConfig::default())
                .with_pose_source(StaticPose(pose)),
        ));

        let mut scheduler = Scheduler::new();
        drive(Rc::clone(&session), &mut scheduler);
        let t0 = Instant::now();

        // No greeting yet: nothing is sent, but the sampler keeps its pace.
        scheduler.run_once(t0);
        let deadlines: Vec<Instant> = scheduler.tasks.iter().map(|task| task.deadline).collect();
        assert_eq!(
            deadlines,
            vec![t0 + Duration::from_millis(10), t0 + Duration::from_millis(100)]
        );
        assert!(mock.written().is_empty());

        mock.push_message(&greeting("abc"));
        scheduler.run_once(t0 + Duration::from_millis(10));
        assert_eq!(session.borrow().stats().frames_sent, 0);

        scheduler.run_once(t0 + Duration::from_millis(100));
        assert_eq!(session.borrow().stats().frames_sent, 1);
    }
}
