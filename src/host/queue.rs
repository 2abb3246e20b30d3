use std::{
    collections::VecDeque,
    vec::Vec,
    time::Duration,
    };
use tokio::{
    sync::oneshot,
    time::Instant,
    };

use super::{Error, link::Reply};


/// completion channel of a transaction
pub(crate) type Completion = oneshot::Sender<Result<Reply, Error>>;

/// transaction waiting for the line
pub(crate) struct Pending {
    pub address: u8,
    /// stuffed frame, ready to write
    pub frame: Vec<u8>,
    pub completion: Completion,
}

/// transaction on the line, waiting for a frame
pub(crate) struct Current {
    pub address: u8,
    pub deadline: Instant,
    pub completion: Completion,
}
impl Current {
    /// report the end of the transaction, the caller may have stopped listening
    pub fn resolve(self, result: Result<Reply, Error>) {
        self.completion.send(result).ok();
    }
}

/**
    half-duplex transaction ordering

    at most one transaction is current, the others wait in submission order. The queue only decides what to transmit and when the current transaction expires, transmission itself is left to the caller.
*/
pub(crate) struct Queue {
    waiting: VecDeque<Pending>,
    current: Option<Current>,
    /// allowed for the first transaction on an idle line
    response_timeout: Duration,
    /// allowed for the following ones, the line is known to be responsive
    inter_message_timeout: Duration,
}

impl Queue {
    pub fn new(response_timeout: Duration, inter_message_timeout: Duration) -> Self {
        Self {
            waiting: VecDeque::new(),
            current: None,
            response_timeout,
            inter_message_timeout,
        }
    }
    /// number of transactions not transmitted yet
    pub fn len(&self) -> usize {
        self.waiting.len()
    }
    /// a transaction is on the line
    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }
    /// address of the transaction on the line
    pub fn current_address(&self) -> Option<u8> {
        self.current.as_ref().map(|current| current.address)
    }
    /// instant at which the current transaction expires
    pub fn deadline(&self) -> Option<Instant> {
        self.current.as_ref().map(|current| current.deadline)
    }

    /// admit a transaction, return the frame to transmit immediately if the line was idle
    pub fn submit(&mut self, pending: Pending, now: Instant) -> Option<Vec<u8>> {
        if self.is_busy() {
            self.waiting.push_back(pending);
            return None
        }
        Some(self.start(pending, now + self.response_timeout))
    }
    /// take the current transaction out of the line, disarming its deadline
    pub fn finish(&mut self) -> Option<Current> {
        self.current.take()
    }
    /// take the current transaction if its deadline is reached
    pub fn expire(&mut self, now: Instant) -> Option<Current> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.finish(),
            _ => None,
        }
    }
    /// put the next waiting transaction on the line, return its frame to transmit
    pub fn advance(&mut self, now: Instant) -> Option<Vec<u8>> {
        // a transaction still on the line is dropped
        self.current = None;
        let pending = self.waiting.pop_front()?;
        Some(self.start(pending, now + self.inter_message_timeout))
    }

    fn start(&mut self, pending: Pending, deadline: Instant) -> Vec<u8> {
        self.current = Some(Current {
            address: pending.address,
            deadline,
            completion: pending.completion,
        });
        pending.frame
    }
}
