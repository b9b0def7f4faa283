//! Multi-consumer work queue with a drain barrier.
//!
//! Items are counted as pending from [`WorkQueue::put`] until a worker calls
//! [`WorkQueue::task_done`]; [`WorkQueue::join`] resolves once that count is
//! back to zero. Stop sentinels are not counted.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_channel::{Receiver, Sender};
use tokio::sync::watch;

// ---

#[derive(Debug, PartialEq)]
pub enum Job<T> {
    Work(T),
    Stop,
}

#[derive(Debug)]
pub struct WorkQueue<T> {
    // ---
    tx: Sender<Job<T>>,
    rx: Receiver<Job<T>>,
    pending: Arc<watch::Sender<usize>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> WorkQueue<T> {
    // ---
    pub fn unbounded() -> Self {
        // ---
        let (tx, rx) = async_channel::unbounded();
        let (pending, _) = watch::channel(0);
        Self {
            tx,
            rx,
            pending: Arc::new(pending),
        }
    }

    pub async fn put(&self, item: T) -> Result<()> {
        // ---
        self.pending.send_modify(|n| *n += 1);
        if self.tx.send(Job::Work(item)).await.is_err() {
            self.task_done();
            return Err(anyhow!("work queue is closed"));
        }
        Ok(())
    }

    /// Enqueue one stop sentinel per worker.
    pub async fn stop(&self, workers: usize) -> Result<()> {
        // ---
        for _ in 0..workers {
            self.tx
                .send(Job::Stop)
                .await
                .map_err(|_| anyhow!("work queue is closed"))?;
        }
        Ok(())
    }

    /// Wait for the next job. `None` once the queue is closed and empty.
    pub async fn get(&self) -> Option<Job<T>> {
        self.rx.recv().await.ok()
    }

    /// Mark one previously dequeued item as fully processed.
    pub fn task_done(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    /// Block until every item put so far has been marked done.
    pub async fn join(&self) {
        // ---
        let mut rx = self.pending.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Jobs currently buffered, sentinels included.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn close(&self) {
        self.tx.close();
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn join_returns_immediately_when_nothing_was_put() {
        // ---
        let queue: WorkQueue<u32> = WorkQueue::unbounded();
        tokio::time::timeout(Duration::from_secs(1), queue.join())
            .await
            .expect("join on an empty queue should not block");
    }

    #[tokio::test]
    async fn join_waits_for_task_done() {
        // ---
        let queue = WorkQueue::unbounded();
        queue.put("oslo").await.unwrap();
        queue.put("bergen").await.unwrap();
        assert_eq!(queue.pending(), 2);

        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                while let Some(Job::Work(_)) = queue.get().await {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    queue.task_done();
                }
            })
        };

        tokio::time::timeout(Duration::from_secs(2), queue.join())
            .await
            .expect("queue should drain");
        assert_eq!(queue.pending(), 0);

        queue.stop(1).await.unwrap();
        worker.await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn stop_sentinels_are_not_pending() {
        // ---
        let queue: WorkQueue<u32> = WorkQueue::unbounded();
        queue.stop(3).await.unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.get().await, Some(Job::Stop));
    }

    #[tokio::test]
    async fn put_after_close_fails_and_is_not_counted() {
        // ---
        let queue = WorkQueue::unbounded();
        queue.close();
        assert!(queue.put(1).await.is_err());
        assert_eq!(queue.pending(), 0);
    }
}
