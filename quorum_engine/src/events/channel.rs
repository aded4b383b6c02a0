//! In-process pub-sub for ledger events.
//!
//! An [`EventHandler`] owns the receiving end of a bounded channel and a single async callback. Any number of
//! [`EventProducer`]s can publish into it. Callbacks only see the event they are given, never the ledger itself.
//!
//! Every event is handled on its own task, so a slow callback (a messaging API that takes a few seconds to answer)
//! never holds up the webhook delivery that published the event. If the handler was given an [`OrderingKey`], events
//! that share a key are handled one after the other, in the order they were published.
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Picks the queue an event belongs to. `None` means the event can be handled concurrently with anything else.
pub type OrderingKey<E> = Arc<dyn Fn(&E) -> Option<String> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
    ordering: Option<OrderingKey<E>>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { listener: receiver, sender, handler, ordering: None }
    }

    pub fn with_ordering(mut self, ordering: OrderingKey<E>) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, and all in-flight events have been handled.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // drop the internal sender so that when the last subscriber is dropped, we can automatically shut down the
        // handler
        drop(self.sender);
        let mut jobs = JoinSet::new();
        // the most recent job for each ordering key. Each keyed job waits for its predecessor before it runs.
        let mut queues: HashMap<String, JoinHandle<()>> = HashMap::new();
        while let Some(ev) = self.listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            match self.ordering.as_ref().and_then(|key| key(&ev)) {
                Some(key) => {
                    let previous = queues.remove(&key);
                    let job = tokio::spawn(async move {
                        if let Some(Err(e)) = wait_for(previous).await {
                            warn!("📬️ An earlier event in the same queue failed: {e}");
                        }
                        (handler)(ev).await;
                        trace!("📬️ Event handled");
                    });
                    queues.insert(key, job);
                },
                None => {
                    jobs.spawn(async move {
                        (handler)(ev).await;
                        trace!("📬️ Event handled");
                    });
                },
            }
            // reap finished jobs so neither collection grows without bound on a long-running server
            while jobs.try_join_next().is_some() {}
            queues.retain(|_, job| !job.is_finished());
        }
        debug!("📬️ All producers have gone away. Waiting for {} jobs to complete", jobs.len() + queues.len());
        while let Some(res) = jobs.join_next().await {
            if let Err(e) = res {
                warn!("📬️ An event handler job failed: {e}");
            }
        }
        for (key, job) in queues {
            if let Err(e) = job.await {
                warn!("📬️ The last event handler job for {key} failed: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

async fn wait_for(job: Option<JoinHandle<()>>) -> Option<Result<(), tokio::task::JoinError>> {
    match job {
        Some(job) => Some(job.await),
        None => None,
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
