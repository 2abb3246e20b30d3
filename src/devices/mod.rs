/*!
    nodes living on a link

    A [Node] is a lightweight reference to a node on an [Rpc] capability, offering the calls every node supports. Device types compose a [Node] and add their own commands, whose parameters are fixed-layout little-endian structures packed with `packbytes`.
*/

/// dual motor driver node with position and speed control
pub mod motor;
/// stepper head node with several channels
pub mod stepper;


use std::{
    borrow::Cow,
    vec::Vec,
    };
use packbytes::{FromBytes, ToBytes, ByteArray};

use crate::host::{Rpc, CallReply, Error, Value};


/// node at a given address, reached through an [Rpc] implementation
#[derive(Clone, Debug)]
pub struct Node<R> {
    rpc: R,
    address: u8,
}
impl<R: Rpc> Node<R> {
    pub fn new(rpc: R, address: u8) -> Self {
        Self {rpc, address}
    }
    pub fn address(&self) -> u8  {self.address}
    pub fn rpc(&self) -> &R  {&self.rpc}

    /// description of an endpoint, the empty endpoint describes the node itself
    pub async fn describe(&self, endpoint: &str) -> Result<CallReply, Error> {
        self.rpc.describe(self.address, endpoint).await
    }
    pub async fn connect(&self, endpoint: &str) -> Result<CallReply, Error> {
        self.rpc.connect(self.address, endpoint).await
    }
    pub async fn call(&self, endpoint: &str, args: Option<Value>) -> Result<CallReply, Error> {
        self.rpc.call(self.address, endpoint, args).await
    }
}


/// pack parameters as sent to nodes
pub(crate) fn pack<T: ToBytes>(value: T) -> Vec<u8> {
    value.to_le_bytes().as_ref().to_vec()
}

/// unpack the beginning of a node reply, trailing bytes are ignored
pub(crate) fn unpack<T: FromBytes>(data: &[u8]) -> Result<T, Error> {
    let mut bytes = T::Bytes::zeroed();
    let source = data.get(.. T::Bytes::SIZE)
        .ok_or(Error::Reply("reply too short"))?;
    bytes.as_mut().copy_from_slice(source);
    Ok(T::from_le_bytes(bytes))
}

/// raw bytes of a reply, nodes answer with a byte string or an array of bytes
pub(crate) fn reply_bytes(data: &Value) -> Result<Cow<'_, [u8]>, Error> {
    match data {
        Value::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        Value::Array(items) => items.iter()
            .map(|item| match item {
                Value::Integer(integer) => u8::try_from(*integer)
                    .map_err(|_| Error::Reply("array item is not a byte")),
                _ => Err(Error::Reply("array item is not a byte")),
                })
            .collect::<Result<Vec<u8>, Error>>()
            .map(Cow::Owned),
        _ => Err(Error::Reply("reply is not binary")),
    }
}
