/*!
    asynchronous link implementation in `std` environment, on top of tokio

    The central resource is the [Link] struct, owning one serial connection. Its [Link::run] coroutine owns the codec, the transaction queue and the connection, it **must** be running for anything to be transmitted or received.

    - [Link::send] queues a message for a node, at most one transaction is in flight on the line at any time. The returned [Transaction] resolves with the first frame received afterwards, or [Error::Timeout]
    - every received frame is handed to the [Upstream] processor, tagged with its [Source]
    - [Link::subscribe] polls a node's endpoint periodically through the upstream and republishes the results as events
    - a closed serial device is reopened periodically until it comes back
*/

/// the event loop and its transport call surface, this is the tricky part of the code
mod link;
/// ordering of transactions on the half-duplex line
mod queue;
/// periodic polling of subscribed endpoints
mod poll;
/// serial devices and their discovery
mod port;
/// interface with the layer above the link
mod upstream;


pub use link::{Link, LinkConfig, Transaction, Reply};
pub use poll::PollKey;
pub use port::{Connector, Serial};
pub use upstream::{Upstream, Rpc, Source, CallReply};
pub use ciborium::Value;


use std::{
    io,
    string::String,
    vec::Vec,
    };
use thiserror::Error;

/// error regarding link communication
#[derive(Error, Debug)]
pub enum Error {
    #[error("problem with serial device")]
    Bus(#[from] io::Error),
    #[error("no frame arrived in expected time")]
    Timeout,
    #[error("no subscription for {address}/{endpoint}")]
    SubscriptionNotFound {address: u8, endpoint: String},
    #[error("payload cannot be encoded")]
    Encode(#[from] ciborium::ser::Error<io::Error>),
    #[error("payload cannot be decoded")]
    Decode(#[from] ciborium::de::Error<io::Error>),
    #[error("link event loop is gone")]
    Closed,
    #[error("link event loop is already running")]
    AlreadyRunning,
    #[error("unexpected reply from node: {0}")]
    Reply(&'static str),
    #[error("remote call failed: {0}")]
    Remote(String),
}


/// serialize a message as carried in frame payloads
pub fn encode_message(message: &Value) -> Result<Vec<u8>, Error> {
    let mut payload = Vec::new();
    ciborium::into_writer(message, &mut payload)?;
    Ok(payload)
}

/// deserialize a message from a frame payload
pub fn decode_message(payload: &[u8]) -> Result<Value, Error> {
    Ok(ciborium::from_reader(payload)?)
}
