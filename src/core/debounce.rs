use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs at most one delayed job at a time; scheduling again cancels the job
/// that has not fired yet.
///
/// Every schedule or cancel bumps a generation counter. A job receives the
/// generation it was scheduled under and should check [`Debouncer::is_current`]
/// before committing anything, since it may already be past its delay when a
/// newer job aborts it.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            task: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Returns true if a job was still waiting to run.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, job: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.cancel() {
            tracing::debug!("Debounce: previous job cancelled");
        }

        let generation = self.generation;
        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job(generation).await;
        }));
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_only_last_job_runs() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for _ in 0..3 {
            let fired = Arc::clone(&fired);
            debouncer.schedule(move |generation| async move {
                fired.store(generation, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), debouncer.generation());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_job() {
        let fired = Arc::new(AtomicU64::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        let flag = Arc::clone(&fired);
        let generation = debouncer.schedule(move |_| async move {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.is_current(generation));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!debouncer.cancel());
    }
}
