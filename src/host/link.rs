use core::{
    future::{Future, pending},
    pin::Pin,
    task::{Context, Poll},
    fmt::Display,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering::*},
    };
use std::{
    collections::BTreeMap,
    path::PathBuf,
    string::String,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
    io,
    };
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::{mpsc, oneshot},
    time::Instant,
    };
use log::*;

use crate::frame::{self, Decoder, Event};
use super::{
    Error, Value,
    encode_message, decode_message,
    queue::{Queue, Pending},
    poll::{Polls, PollKey},
    port::{self, Connector},
    upstream::{Upstream, Source},
    };


/// settings of a [Link]
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// name of the link, prefixed to sources and event urls
    pub name: String,
    /// time allowed for a node to answer the first transaction on an idle line
    pub response_timeout: Duration,
    /// time allowed for each following transaction while the queue drains
    pub inter_message_timeout: Duration,
    /// delay between attempts to reopen a closed serial device
    pub reopen_delay: Duration,
    /// period of subscription polls
    pub poll_period: Duration,
}
impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: "serial".into(),
            response_timeout: Duration::from_millis(1000),
            inter_message_timeout: Duration::from_millis(200),
            reopen_delay: Duration::from_millis(1000),
            poll_period: Duration::from_millis(1000),
        }
    }
}
impl LinkConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {name: name.into(), .. Default::default()}
    }
    pub fn with_response_timeout(self, response_timeout: Duration) -> Self {
        Self {response_timeout, .. self}
    }
    pub fn with_inter_message_timeout(self, inter_message_timeout: Duration) -> Self {
        Self {inter_message_timeout, .. self}
    }
    pub fn with_reopen_delay(self, reopen_delay: Duration) -> Self {
        Self {reopen_delay, .. self}
    }
    pub fn with_poll_period(self, poll_period: Duration) -> Self {
        Self {poll_period, .. self}
    }
}


/// message that ended a transaction
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub source: Source,
    pub message: Value,
}

/**
    completion of a message sent on the link

    resolves with the first frame received once the message is on the line, whatever node it comes from, or with [Error::Timeout]. Dropping it does not cancel the transmission.
*/
#[must_use = "dropping a transaction ignores its outcome"]
pub struct Transaction {
    completion: oneshot::Receiver<Result<Reply, Error>>,
}
impl Future for Transaction {
    type Output = Result<Reply, Error>;
    fn poll(mut self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.completion).poll(context)
            .map(|received| received.unwrap_or_else(|_| Err(Error::Closed)))
    }
}


/**
    one serial connection to a set of addressable nodes

    all methods except [run](Self::run) only talk to the event loop, they never wait for the line
*/
pub struct Link<C: Connector, U: Upstream> {
    name: Arc<str>,
    config: LinkConfig,
    connector: C,
    upstream: Arc<U>,
    /// transactions submitted to the event loop
    requests: mpsc::UnboundedSender<Pending>,
    /// taken by the event loop when it starts
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Pending>>>,
    ready: AtomicBool,
    /// transactions submitted and not ended yet, the one on the line included
    outstanding: AtomicUsize,
    losses: AtomicUsize,
    ports: BTreeMap<String, PathBuf>,
    polls: Polls,
}

impl<C: Connector, U: Upstream> Link<C, U> {
    /// create a link, the device is only opened once [run](Self::run) starts
    pub fn new(config: LinkConfig, connector: C, upstream: Arc<U>) -> Self {
        let ports = port::snapshot(&connector);
        let (requests, receiver) = mpsc::unbounded_channel();
        Self {
            name: Arc::from(config.name.as_str()),
            config,
            connector,
            upstream,
            requests,
            receiver: Mutex::new(Some(receiver)),
            ready: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            losses: AtomicUsize::new(0),
            ports,
            polls: Polls::new(),
        }
    }

    pub fn name(&self) -> &str  {&self.name}
    pub fn config(&self) -> &LinkConfig  {&self.config}
    pub fn connector(&self) -> &C  {&self.connector}
    /// the serial device is currently open
    pub fn is_ready(&self) -> bool  {self.ready.load(Acquire)}
    /// number of transactions waiting for the line, not counting the one in flight
    pub fn queue_size(&self) -> usize  {
        // the first outstanding transaction is on the line, or goes there as soon as the event loop sees it
        self.outstanding.load(Acquire).saturating_sub(1)
    }
    /// number of corrupted frames dropped so far
    pub fn losses(&self) -> usize  {self.losses.load(Relaxed)}
    /// serial ports discovered when the link was created, by file name
    pub fn ports(&self) -> &BTreeMap<String, PathBuf>  {&self.ports}

    /// send a message to a node
    pub fn send(&self, address: u8, message: &Value) -> Result<Transaction, Error> {
        let payload = encode_message(message)?;
        self.send_payload(address, &payload)
    }
    /// send an already serialized payload to a node
    pub fn send_payload(&self, address: u8, payload: &[u8]) -> Result<Transaction, Error> {
        let (completion, receiver) = oneshot::channel();
        let frame = frame::encode(address, payload).collect();
        self.outstanding.fetch_add(1, AcqRel);
        if self.requests.send(Pending {address, frame, completion}).is_err() {
            self.outstanding.fetch_sub(1, AcqRel);
            return Err(Error::Closed);
        }
        Ok(Transaction {completion: receiver})
    }

    /**
        poll `endpoint` on the node at `address` every [LinkConfig::poll_period], results are published as events `link/address/endpoint`

        an existing subscription to the same endpoint is replaced. This spawns a task, so it must be called from a tokio runtime
    */
    pub fn subscribe(&self, address: u8, endpoint: &str) {
        let key = PollKey {address, endpoint: endpoint.into()};
        let url = key.url(&self.name);
        self.polls.subscribe(key, self.upstream.clone(), url, self.config.poll_period);
    }
    /// stop polling `endpoint` on the node at `address`
    pub fn unsubscribe(&self, address: u8, endpoint: &str) -> Result<(), Error> {
        self.polls.unsubscribe(&PollKey {address, endpoint: endpoint.into()})
    }

    /**
        event loop responsible of all exchanges on the serial device

        it **must** be running for the link to work, and it only returns if called twice
    */
    pub async fn run(&self) -> Result<(), Error> {
        let requests = self.receiver.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(Error::AlreadyRunning)?;
        EventLoop {
            link: self,
            decoder: Decoder::new(),
            queue: Queue::new(self.config.response_timeout, self.config.inter_message_timeout),
            reader: None,
            writer: None,
            reopen: None,
        }.serve(requests).await;
        Ok(())
    }
}


/// reason the event loop woke up
enum Wake<'b> {
    Received(io::Result<&'b [u8]>),
    Request(Pending),
    Expired,
    Reopen,
}

/// state owned by [Link::run]
struct EventLoop<'l, C: Connector, U: Upstream> {
    link: &'l Link<C, U>,
    decoder: Decoder,
    queue: Queue,
    reader: Option<ReadHalf<C::Port>>,
    writer: Option<WriteHalf<C::Port>>,
    /// instant of the next attempt to open the device
    reopen: Option<Instant>,
}

impl<C: Connector, U: Upstream> EventLoop<'_, C, U> {
    async fn serve(&mut self, mut requests: mpsc::UnboundedReceiver<Pending>) {
        let mut buffer = [0u8; 256];
        self.open().await;
        loop {
            let wake = tokio::select! {
                biased;
                received = read_some(self.reader.as_mut(), &mut buffer) => Wake::Received(received),
                request = requests.recv() => match request {
                    Some(pending) => Wake::Request(pending),
                    // every handle is gone, nothing more can happen
                    None => return,
                },
                _ = sleep_until(self.queue.deadline()) => Wake::Expired,
                _ = sleep_until(self.reopen) => Wake::Reopen,
            };
            match wake {
                Wake::Received(Ok([])) => self.close("end of stream"),
                Wake::Received(Ok(bytes)) => self.receive(bytes).await,
                Wake::Received(Err(error)) => self.close(error),
                Wake::Request(pending) => match self.queue.submit(pending, Instant::now()) {
                    Some(frame) => self.transmit(&frame).await,
                    None => debug!("link {}: line busy, {} waiting", self.link.name, self.queue.len()),
                },
                Wake::Expired => self.expire().await,
                Wake::Reopen => self.open().await,
            }
        }
    }

    async fn open(&mut self) {
        self.reopen = None;
        match self.link.connector.open().await {
            Ok(port) => {
                let (reader, writer) = tokio::io::split(port);
                self.reader = Some(reader);
                self.writer = Some(writer);
                self.link.ready.store(true, Release);
                info!("link {}: open", self.link.name);
            },
            Err(error) => {
                warn!("link {}: cannot open device: {}", self.link.name, error);
                self.reopen = Some(Instant::now() + self.link.config.reopen_delay);
            },
        }
    }

    fn close(&mut self, reason: impl Display) {
        warn!("link {}: closed: {}", self.link.name, reason);
        self.reader = None;
        self.writer = None;
        self.decoder.reset();
        self.link.ready.store(false, Release);
        self.reopen = Some(Instant::now() + self.link.config.reopen_delay);
    }

    async fn transmit(&mut self, frame: &[u8]) {
        let Some(writer) = self.writer.as_mut()
            else {
                warn!("link {}: device not ready, frame dropped", self.link.name);
                return
            };
        let written = match writer.write_all(frame).await {
            Ok(()) => writer.flush().await,
            Err(error) => Err(error),
        };
        // a broken device is detected by the reading side
        if let Err(error) = written {
            warn!("link {}: write error: {}", self.link.name, error);
        }
    }

    async fn receive(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let received = match self.decoder.ingest(byte) {
                Some(Event::Frame(frame)) => Some((frame.address, decode_message(frame.payload))),
                Some(Event::Corrupted(error)) => {
                    self.link.losses.fetch_add(1, Relaxed);
                    debug!("link {}: frame dropped: {}", self.link.name, error);
                    None
                },
                None => None,
            };
            if let Some((address, message)) = received {
                self.dispatch(address, message).await;
            }
        }
    }

    /// deliver a received frame and end the current transaction
    async fn dispatch(&mut self, address: u8, message: Result<Value, Error>) {
        let source = Source {link: self.link.name.clone(), address};
        if let Some(expected) = self.queue.current_address() {
            if expected != address {
                debug!("link {}: waiting for {} but {} answered", self.link.name, expected, address);
            }
        }
        let current = self.queue.finish();
        if current.is_some() {
            self.retire();
        }
        match message {
            Ok(message) => {
                if let Some(current) = current {
                    current.resolve(Ok(Reply {source: source.clone(), message: message.clone()}));
                }
                self.link.upstream.process(source, message);
            },
            Err(error) => {
                warn!("link {}: undecodable payload from {}: {}", self.link.name, source, error);
                if let Some(current) = current {
                    current.resolve(Err(error));
                }
            },
        }
        self.advance().await;
    }

    async fn expire(&mut self) {
        if let Some(current) = self.queue.expire(Instant::now()) {
            debug!("link {}: no answer from {}", self.link.name, current.address);
            self.retire();
            current.resolve(Err(Error::Timeout));
            self.advance().await;
        }
    }

    /// a transaction left the line
    fn retire(&self) {
        self.link.outstanding.fetch_sub(1, AcqRel);
    }

    async fn advance(&mut self) {
        if let Some(frame) = self.queue.advance(Instant::now()) {
            self.transmit(&frame).await;
        }
    }
}


/// read whatever is available, never resolves without a device
async fn read_some<'b, R: AsyncRead + Unpin>(reader: Option<&mut R>, buffer: &'b mut [u8]) -> io::Result<&'b [u8]> {
    match reader {
        Some(reader) => {
            let size = reader.read(buffer).await?;
            Ok(&buffer[.. size])
        },
        None => pending().await,
    }
}

/// sleep until the given instant, forever if none
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => pending().await,
    }
}
