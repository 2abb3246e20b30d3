use std::vec::Vec;
use packbytes::FromBytes;

use crate::host::{Rpc, Error, Value};
use super::{Node, unpack, reply_bytes};


/// state of one stepper channel
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes)]
pub struct Status {
    pub current: u8,
    pub target: u8,
    pub speed: u8,
}
impl Status {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        unpack(data)
    }
}

/**
    stepper head node

    each stepper channel is an endpoint of the node, named by the node's description
*/
pub struct Stepper<R> {
    node: Node<R>,
    description: Option<Value>,
    links: Vec<Value>,
}
impl<R: Rpc> Stepper<R> {
    /// reference a stepper head without talking to it
    pub fn new(rpc: R, address: u8) -> Self {
        Self {
            node: Node::new(rpc, address),
            description: None,
            links: Vec::new(),
        }
    }
    /// connect to the node and retreive its description
    pub async fn attach(rpc: R, address: u8) -> Result<Self, Error> {
        let mut stepper = Self::new(rpc, address);
        stepper.node.connect("").await?;
        let description = stepper.node.describe("").await?.data;
        if let Value::Array(items) = &description {
            stepper.links = items.clone();
        }
        stepper.description = Some(description);
        Ok(stepper)
    }

    pub fn node(&self) -> &Node<R>  {&self.node}
    /// description received when attaching
    pub fn description(&self) -> Option<&Value>  {self.description.as_ref()}
    /// entries of the description, when the node describes itself as a list
    pub fn links(&self) -> &[Value]  {&self.links}

    /// state of a channel
    pub async fn stat(&self, channel: &str) -> Result<Status, Error> {
        let data = self.node.call(channel, None).await?.data;
        Status::parse(&reply_bytes(&data)?)
    }
    /// move a channel to a position at the given speed
    pub async fn goto(&self, channel: &str, position: i32, speed: i32) -> Result<Status, Error> {
        let args = Value::Array([
            Value::Integer(position.into()),
            Value::Integer(speed.into()),
            ].into());
        let data = self.node.call(channel, Some(args)).await?.data;
        Status::parse(&reply_bytes(&data)?)
    }
}
