#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future::Future,
    io,
    pin::Pin,
    sync::{Arc, Mutex, atomic::{AtomicU64, AtomicUsize, Ordering::*}},
    task::{Context, Poll},
    time::Duration,
    };
use futures_concurrency::future::Race;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf},
    sync::mpsc,
    };

use uartlink::{
    frame::{self, Decoder, Event},
    host::*,
    };


pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn text(content: &str) -> Value {
    Value::Text(content.into())
}

/// run the test body while the link event loop is running
pub async fn with_link<C: Connector, U: Upstream>(link: &Link<C, U>, test: impl Future<Output = ()>) {
    let run = async {
        link.run().await.expect("link event loop failed");
        panic!("link event loop returned");
    };
    (test, run).race().await;
}

/// wait for a condition to become true
pub async fn until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }).await.expect("condition never met");
}


/// upstream processor recording everything it is given
pub struct Recorder {
    processed: Mutex<Vec<(Source, Value)>>,
    events: mpsc::UnboundedSender<(String, Value)>,
    calls: AtomicU64,
}
impl Recorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(String, Value)>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self {
            processed: Mutex::new(Vec::new()),
            events,
            calls: AtomicU64::new(0),
        }), receiver)
    }
    pub fn processed(&self) -> Vec<(Source, Value)> {
        self.processed.lock().unwrap().clone()
    }
    pub fn calls(&self) -> u64 {
        self.calls.load(SeqCst)
    }
}
impl Rpc for Recorder {
    /// answers with the number of calls made so far
    async fn call(&self, _address: u8, _endpoint: &str, _args: Option<Value>) -> Result<CallReply, Error> {
        let count = self.calls.fetch_add(1, SeqCst) + 1;
        Ok(Value::Integer(count.into()).into())
    }
    async fn describe(&self, _address: u8, _endpoint: &str) -> Result<CallReply, Error> {
        Ok(Value::Null.into())
    }
    async fn connect(&self, _address: u8, _endpoint: &str) -> Result<CallReply, Error> {
        Ok(Value::Null.into())
    }
}
impl Upstream for Recorder {
    fn process(&self, source: Source, message: Value) {
        self.processed.lock().unwrap().push((source, message));
    }
    fn emit_event(&self, url: &str, data: Value, _options: Option<Value>) {
        self.events.send((url.into(), data)).ok();
    }
}


/// connector handing out prepared in-memory ports, then failing
pub struct Devices {
    ports: Mutex<VecDeque<io::Result<DuplexStream>>>,
    attempts: AtomicUsize,
}
impl Devices {
    pub fn new(ports: impl IntoIterator<Item = io::Result<DuplexStream>>) -> Self {
        Self {
            ports: Mutex::new(ports.into_iter().collect()),
            attempts: AtomicUsize::new(0),
        }
    }
    /// connector never finding any device
    pub fn none() -> Self {
        Self::new(Vec::<io::Result<DuplexStream>>::new())
    }
    /// connector opening once, and the node at the other end
    pub fn single() -> (Self, Node) {
        let (host, node) = Node::pair();
        (Self::new([Ok(host)]), node)
    }
    /// number of times the link tried to open a device
    pub fn attempts(&self) -> usize {
        self.attempts.load(SeqCst)
    }
}
impl Connector for Devices {
    type Port = DuplexStream;
    async fn open(&self) -> io::Result<DuplexStream> {
        self.attempts.fetch_add(1, SeqCst);
        self.ports.lock().unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(io::ErrorKind::NotFound.into()))
    }
}
/// unplugged device, failing with a given error
pub fn unplugged() -> io::Result<DuplexStream> {
    Err(io::Error::other("device unplugged"))
}


/// connector opening a device that rejects every write and never receives anything
#[derive(Default)]
pub struct Unwritable {
    attempts: AtomicUsize,
    writes: Arc<AtomicUsize>,
}
impl Unwritable {
    pub fn attempts(&self) -> usize {
        self.attempts.load(SeqCst)
    }
    /// number of writes the link tried
    pub fn writes(&self) -> usize {
        self.writes.load(SeqCst)
    }
}
impl Connector for Unwritable {
    type Port = UnwritablePort;
    async fn open(&self) -> io::Result<UnwritablePort> {
        self.attempts.fetch_add(1, SeqCst);
        Ok(UnwritablePort {writes: self.writes.clone()})
    }
}
pub struct UnwritablePort {
    writes: Arc<AtomicUsize>,
}
impl AsyncRead for UnwritablePort {
    fn poll_read(self: Pin<&mut Self>, _context: &mut Context<'_>, _buffer: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}
impl AsyncWrite for UnwritablePort {
    fn poll_write(self: Pin<&mut Self>, _context: &mut Context<'_>, _buffer: &[u8]) -> Poll<io::Result<usize>> {
        self.writes.fetch_add(1, SeqCst);
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }
    fn poll_flush(self: Pin<&mut Self>, _context: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
    fn poll_shutdown(self: Pin<&mut Self>, _context: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}


/// simulated node side of the serial line
pub struct Node {
    stream: DuplexStream,
    decoder: Decoder,
    received: VecDeque<(u8, Vec<u8>)>,
}
impl Node {
    /// host side stream and its node
    pub fn pair() -> (DuplexStream, Self) {
        let (host, node) = tokio::io::duplex(4096);
        (host, Self {
            stream: node,
            decoder: Decoder::new(),
            received: VecDeque::new(),
        })
    }
    /// next frame sent by the host, with its decoded message
    pub async fn receive(&mut self) -> (u8, Value) {
        let (address, payload) = self.receive_raw().await;
        (address, decode_message(&payload).expect("host sent invalid payload"))
    }
    pub async fn receive_raw(&mut self) -> (u8, Vec<u8>) {
        let mut buffer = [0; 256];
        loop {
            if let Some(frame) = self.received.pop_front() {
                return frame
            }
            let size = self.stream.read(&mut buffer).await.expect("host side failed");
            assert_ne!(size, 0, "host closed the line");
            for &byte in &buffer[.. size] {
                if let Some(Event::Frame(frame)) = self.decoder.ingest(byte) {
                    self.received.push_back((frame.address, frame.payload.to_vec()));
                }
            }
        }
    }
    /// answer with a message from the given address
    pub async fn reply(&mut self, address: u8, message: &Value) {
        let payload = encode_message(message).unwrap();
        let bytes: Vec<u8> = frame::encode(address, &payload).collect();
        self.write(&bytes).await;
    }
    /// write raw bytes on the line
    pub async fn write(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("host side failed");
    }
}
