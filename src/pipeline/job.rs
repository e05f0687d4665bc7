use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::pipeline::progress::{JobState, Progress};

#[derive(Debug)]
struct JobShared {
    id: u64,
    cancel_requested: AtomicBool,
    state: Mutex<JobState>,
    progress: Mutex<Option<Progress>>,
}

/// Shared view of a render job
///
/// Cheap to clone and safe to hold on another task or thread. Cancellation
/// is advisory: the job notices the request at its next frame boundary.
#[derive(Debug, Clone)]
pub struct JobHandle {
    inner: Arc<JobShared>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobHandle {
    pub(crate) fn new(id: u64, state: JobState) -> Self {
        Self {
            inner: Arc::new(JobShared {
                id,
                cancel_requested: AtomicBool::new(false),
                state: Mutex::new(state),
                progress: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Ask the job to stop; has no effect once it has finished
    pub fn cancel(&self) {
        self.inner.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> JobState {
        *lock(&self.inner.state)
    }

    /// Most recent progress notification
    pub fn progress(&self) -> Option<Progress> {
        lock(&self.inner.progress).clone()
    }

    pub(crate) fn set_state(&self, state: JobState) {
        *lock(&self.inner.state) = state;
    }

    pub(crate) fn set_progress(&self, progress: &Progress) {
        *lock(&self.inner.progress) = Some(progress.clone());
    }

    pub(crate) fn same_job(&self, other: &JobHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
