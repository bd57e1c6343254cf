//! # Task Management System
//!
//! This module provides a cross-platform worker pool for chunk generation and meshing.
//! Work runs on `std::thread` workers natively and on `wasm_thread` web workers in the
//! browser.
//!
//! ## Architecture Overview
//! - `TaskManager`: distributes tasks to workers and collects their messages
//! - `Task`: a unit of work that can be executed asynchronously
//! - `WorkerMessage`: what a finished task reports back
//! - `TaskChannel`: communication channel between the main thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands tasks to idle workers round-robin, queueing the rest
//! 3. Workers process tasks and send back their messages
//! 4. The main thread calls `drain_completed()` once per frame and applies the messages
//!
//! A manager created with zero workers runs queued tasks inline on the calling thread in
//! `process_queued_tasks()`. Headless sessions and tests use this to stay deterministic.
//!
//! ## Example Usage
//! ```ignore
//! let mut task_manager = TaskManager::new(num_workers);
//! task_manager.publish_task(Box::new(ChunkBuildTask::new(key, ticket, generator.clone(), mesher)));
//!
//! // In the main loop:
//! task_manager.process_queued_tasks();
//! for message in task_manager.drain_completed() {
//!     chunk_manager.apply_message(&mut backend, message);
//! }
//! ```

pub mod task;

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
pub use task::{Task, WorkerMessage};

cfg_if::cfg_if! {
    if #[cfg(target_family = "wasm")] {
        use wasm_thread as thread;
        use wasm_thread::JoinHandle;
    } else {
        use std::thread::{self, JoinHandle};
    }
}

/// A communication channel between the main thread and a worker thread.
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task>>,
    result_receiver: Receiver<Vec<WorkerMessage>>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Implementation Notes
/// - Owned by the main thread; workers only see their own channel
/// - Dropping the manager closes every channel, which ends the worker loops
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task>>,
    current_channel: usize,
    inline_results: Vec<WorkerMessage>,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Kept at 1 so a busy worker never holds tasks another idle worker could take.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. Zero runs every task inline
    ///   in `process_queued_tasks()`.
    ///
    /// # Platform Notes
    /// - **Native**: Creates actual OS threads
    /// - **Web**: Creates Web Workers through `wasm_thread`
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        if num_workers > 0 {
            info!(
                "Starting {} chunk workers (available parallelism: {:?})",
                num_workers,
                thread::available_parallelism()
            );
        }

        for _ in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task>>();
            let (result_tx, result_rx) = channel::<Vec<WorkerMessage>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let messages = task.process();
                    if result_tx.send(messages).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::spawn(task_closure);

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            inline_results: Vec::new(),
        }
    }

    /// Number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.channels.len()
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// Returns the task back if the worker has disconnected.
    fn try_send_task(&mut self, task: Box<dyn Task>, channel_idx: usize) -> Result<(), Box<dyn Task>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds a worker channel below [`MAX_TASKS_IN_FLIGHT`], round-robin from the last
    /// used one.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start_channel = self.current_channel;
        let mut current = start_channel;
        loop {
            if self.channels[current].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start_channel {
                return None;
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately handed to a worker
    /// - `false` if the task was queued
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    warn!("Worker {} disconnected, queueing task", channel_idx);
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to idle workers, oldest first.
    ///
    /// Without workers every queued task runs here on the calling thread.
    pub fn process_queued_tasks(&mut self) {
        if self.channels.is_empty() {
            while let Some(task) = self.queued_tasks.pop_front() {
                self.inline_results.extend(task.process());
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Channel is disconnected, put task back and stop processing
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Collects every message finished workers have sent since the last call.
    ///
    /// Messages from one task stay in order; messages from different workers are
    /// interleaved in whatever order the channels are polled.
    pub fn drain_completed(&mut self) -> Vec<WorkerMessage> {
        let mut messages = std::mem::take(&mut self.inline_results);
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
                messages.extend(result);
            }
        }
        if !messages.is_empty() {
            debug!("Drained {} worker messages", messages.len());
        }
        messages
    }

    /// Tasks waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Tasks currently running on workers.
    pub fn in_flight(&self) -> usize {
        self.channels.iter().map(|channel| channel.num_tasks_in_flight).sum()
    }

    /// `true` when nothing is queued, running, or waiting to be drained.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.in_flight() == 0 && self.inline_results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::ChunkKey;

    struct UnloadTask(ChunkKey);

    impl Task for UnloadTask {
        fn process(&self) -> Vec<WorkerMessage> {
            vec![WorkerMessage::ChunksToUnload { keys: vec![self.0] }]
        }
    }

    fn unloaded_keys(messages: Vec<WorkerMessage>) -> Vec<ChunkKey> {
        messages
            .into_iter()
            .flat_map(|message| match message {
                WorkerMessage::ChunksToUnload { keys } => keys,
                _ => Vec::new(),
            })
            .collect()
    }

    #[test]
    fn zero_workers_run_inline_in_order() {
        let mut manager = TaskManager::new(0);
        for x in 0..3 {
            assert!(!manager.publish_task(Box::new(UnloadTask(ChunkKey::new(x, 0, 0)))));
        }
        assert_eq!(manager.queued_len(), 3);
        assert!(manager.drain_completed().is_empty());

        manager.process_queued_tasks();
        let keys = unloaded_keys(manager.drain_completed());
        assert_eq!(keys, vec![ChunkKey::new(0, 0, 0), ChunkKey::new(1, 0, 0), ChunkKey::new(2, 0, 0)]);
        assert!(manager.is_idle());
    }

    #[test]
    fn workers_finish_every_task() {
        let mut manager = TaskManager::new(2);
        for x in 0..8 {
            manager.publish_task(Box::new(UnloadTask(ChunkKey::new(x, 0, 0))));
        }
        assert!(manager.in_flight() <= 2 * MAX_TASKS_IN_FLIGHT);

        let mut keys = Vec::new();
        let deadline = web_time::Instant::now() + std::time::Duration::from_secs(10);
        while !manager.is_idle() && web_time::Instant::now() < deadline {
            manager.process_queued_tasks();
            keys.extend(unloaded_keys(manager.drain_completed()));
            std::thread::yield_now();
        }
        keys.sort_by_key(|key| key.x);
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[7], ChunkKey::new(7, 0, 0));
    }
}
