//! Fan a batch of changesets out across worker threads.
//!
//! Results come back in input order regardless of which worker finished
//! first. A failing changeset never blocks the others unless `fail_fast` is
//! set, in which case changesets not yet started are skipped. Elements that
//! did not parse count as failures without reaching the job.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use cstate_core::ReconstructError;
use tracing::{debug, warn};

use crate::input::{BatchItem, ChangesetInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub workers: usize,
    pub fail_fast: bool,
}

/// What happened to one changeset.
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    Failed(ReconstructError),
    /// The input element did not parse; carries the reason.
    Unparsed(String),
    /// Not attempted because an earlier changeset failed under `fail_fast`.
    Skipped,
}

/// Run `job` over every item and return one outcome per item, in order.
pub fn run_batch<T, F>(items: &[BatchItem], options: BatchOptions, job: F) -> Vec<Outcome<T>>
where
    T: Send,
    F: Fn(&ChangesetInput) -> Result<T, ReconstructError> + Sync,
{
    let workers = options.workers.clamp(1, items.len().max(1));
    debug!(items = items.len(), workers, "running batch");

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let slots: Mutex<Vec<Option<Outcome<T>>>> =
        Mutex::new(std::iter::repeat_with(|| None).take(items.len()).collect());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(index) else {
                        break;
                    };

                    let outcome = if options.fail_fast && stop.load(Ordering::Acquire) {
                        Outcome::Skipped
                    } else {
                        match item {
                            BatchItem::Changeset(input) => match job(input) {
                                Ok(value) => Outcome::Done(value),
                                Err(err) => {
                                    warn!(
                                        changeset = %item.display_id(index),
                                        code = %err.code(),
                                        error = %err,
                                        "changeset reconstruction failed"
                                    );
                                    stop.store(true, Ordering::Release);
                                    Outcome::Failed(err)
                                }
                            },
                            BatchItem::Invalid(invalid) => {
                                warn!(
                                    changeset = %item.display_id(index),
                                    error = %invalid.reason,
                                    "changeset input is malformed"
                                );
                                stop.store(true, Ordering::Release);
                                Outcome::Unparsed(invalid.reason.clone())
                            }
                        }
                    };

                    // A poisoned lock only means another worker panicked; the
                    // panic is re-raised when the scope joins.
                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(outcome);
                }
            });
        }
    });

    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .map(|slot| slot.unwrap_or(Outcome::Skipped))
        .collect()
}
