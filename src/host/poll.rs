use std::{
    collections::HashMap,
    format,
    string::String,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
    };
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
    };
use log::*;

use super::{Error, Upstream};


/// subscription key: a node address and one of its endpoints
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PollKey {
    pub address: u8,
    pub endpoint: String,
}
impl PollKey {
    /// url of the events published for this subscription on the given link
    pub fn url(&self, link: &str) -> String {
        format!("{}/{}/{}", link, self.address, self.endpoint)
    }
}

/// running subscriptions, at most one task per key
pub(crate) struct Polls {
    tasks: Mutex<HashMap<PollKey, JoinHandle<()>>>,
}

impl Polls {
    pub fn new() -> Self {
        Self {tasks: Mutex::new(HashMap::new())}
    }
    pub fn subscribe<U: Upstream>(&self, key: PollKey, upstream: Arc<U>, url: String, period: Duration) {
        let task = tokio::spawn(poll(key.clone(), upstream, url, period));
        if let Some(previous) = self.lock().insert(key, task) {
            debug!("replacing subscription");
            previous.abort();
        }
    }
    pub fn unsubscribe(&self, key: &PollKey) -> Result<(), Error> {
        match self.lock().remove(key) {
            Some(task) => {
                task.abort();
                Ok(())
            },
            None => Err(Error::SubscriptionNotFound {
                address: key.address,
                endpoint: key.endpoint.clone(),
            }),
        }
    }
    fn lock(&self) -> MutexGuard<'_, HashMap<PollKey, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
impl Drop for Polls {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, task) in tasks.drain() {
            task.abort();
        }
    }
}

/// call the endpoint once per period and publish the results, until aborted
async fn poll<U: Upstream>(key: PollKey, upstream: Arc<U>, url: String, period: Duration) {
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        match upstream.call(key.address, &key.endpoint, None).await {
            Ok(reply) => upstream.emit_event(&url, reply.data, reply.options),
            Err(error) => debug!("poll {} failed: {}", url, error),
        }
    }
}
