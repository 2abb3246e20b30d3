use core::{
    fmt,
    future::Future,
    };
use std::{
    sync::Arc,
    };
use ciborium::Value;

use super::Error;


/// origin of a received message: the link it arrived on and the node address
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Source {
    pub link: Arc<str>,
    pub address: u8,
}
impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.link, self.address)
    }
}

/// result of a remote call, with the options the remote attached to it
#[derive(Clone, Debug, PartialEq)]
pub struct CallReply {
    pub data: Value,
    pub options: Option<Value>,
}
impl From<Value> for CallReply {
    fn from(data: Value) -> Self {
        Self {data, options: None}
    }
}

/**
    capability of calling endpoints on nodes

    this is implemented by the RPC layer above the link, which builds call messages, sends them with [Link::send](super::Link::send) and correlates the replies
*/
pub trait Rpc: Send + Sync {
    /// call a node endpoint with optional arguments
    fn call(&self, address: u8, endpoint: &str, args: Option<Value>) -> impl Future<Output = Result<CallReply, Error>> + Send;
    /// retreive a node's description of an endpoint, the empty endpoint describes the node itself
    fn describe(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send;
    /// open a session with a node endpoint
    fn connect(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send;
}

impl<T: Rpc> Rpc for Arc<T> {
    fn call(&self, address: u8, endpoint: &str, args: Option<Value>) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::call(self, address, endpoint, args)
    }
    fn describe(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::describe(self, address, endpoint)
    }
    fn connect(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::connect(self, address, endpoint)
    }
}

impl<T: Rpc> Rpc for &T {
    fn call(&self, address: u8, endpoint: &str, args: Option<Value>) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::call(self, address, endpoint, args)
    }
    fn describe(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::describe(self, address, endpoint)
    }
    fn connect(&self, address: u8, endpoint: &str) -> impl Future<Output = Result<CallReply, Error>> + Send {
        T::connect(self, address, endpoint)
    }
}

/**
    processor the link delivers to

    [process](Self::process) is invoked from the link event loop once per accepted frame, it must not block
*/
pub trait Upstream: Rpc + 'static {
    /// handle a message received from a node
    fn process(&self, source: Source, message: Value);
    /// publish an event, as produced by subscriptions
    fn emit_event(&self, url: &str, data: Value, options: Option<Value>);
}
