use tokio::sync::Semaphore;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Semaphore-bounded executor for independent async jobs
/// (one fingerprint run per target).
pub struct ConcurrentProbe {
    semaphore: Arc<Semaphore>,
    completed: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl ConcurrentProbe {
    pub fn new(concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            completed: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Runs every task with at most `concurrency` in flight. Results arrive
    /// in completion order; a task that panicked is counted as an error and
    /// yields `None`.
    pub async fn execute<T, F, Fut>(
        &self,
        tasks: Vec<T>,
        task_fn: F,
    ) -> Vec<Option<Fut::Output>>
    where
        F: Fn(T) -> Fut + Clone + Send + 'static,
        Fut: std::future::Future + Send + 'static,
        Fut::Output: Send + 'static,
        T: Send + 'static,
    {
        let mut futures = FuturesUnordered::new();

        for task in tasks {
            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // semaphore closed
            };
            let task_fn = task_fn.clone();
            let completed = self.completed.clone();

            futures.push(tokio::spawn(async move {
                let result = task_fn(task).await;
                completed.fetch_add(1, Ordering::Relaxed);
                drop(permit);
                result
            }));
        }

        let mut results = Vec::new();
        while let Some(result) = futures.next().await {
            match result {
                Ok(output) => results.push(Some(output)),
                Err(e) => {
                    tracing::warn!("concurrent task failed: {}", e);
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    results.push(None);
                }
            }
        }

        results
    }

    /// (completed, errors)
    pub fn get_stats(&self) -> (usize, usize) {
        (
            self.completed.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bounded_execution() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let exec = ConcurrentProbe::new(2);

        let (f, p) = (in_flight.clone(), peak.clone());
        let results = exec
            .execute((0..6).collect(), move |i: usize| {
                let (f, p) = (f.clone(), p.clone());
                async move {
                    let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    f.fetch_sub(1, Ordering::SeqCst);
                    i * 2
                }
            })
            .await;

        assert_eq!(results.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        let mut values: Vec<usize> = results.into_iter().flatten().collect();
        values.sort();
        assert_eq!(values, vec![0, 2, 4, 6, 8, 10]);
        assert_eq!(exec.get_stats(), (6, 0));
    }
}
