use std::vec::Vec;
use packbytes::{FromBytes, ToBytes};

use crate::host::{Rpc, Error, Value};
use super::{Node, pack, unpack, reply_bytes};


/// distance offset added by the node when its bumper is pressed
pub const BUMPER: i32 = 100_500;


/// move both wheels to absolute positions
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct Goto {
    pub left: i32,
    pub right: i32,
}
/// move both wheels to absolute positions at the given speed
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct GotoSpeed {
    pub left: i32,
    pub right: i32,
    pub speed: i32,
}
/// move both wheels to absolute positions with speed and acceleration
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct GotoAccel {
    pub left: i32,
    pub right: i32,
    pub speed: i32,
    pub acc: i32,
}
/// move both wheels to absolute positions with a speed and acceleration per wheel
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct GotoSplit {
    pub left: i32,
    pub right: i32,
    pub speed: i32,
    pub acc: i32,
    pub speed_right: i32,
    pub acc_right: i32,
}
/// set both wheels speeds
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct Speed {
    pub left: i32,
    pub right: i32,
}
/// set both wheels speeds with an acceleration
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct SpeedAccel {
    pub left: i32,
    pub right: i32,
    pub acc: i32,
}
/// set both wheels speeds with an acceleration per wheel
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct SpeedSplit {
    pub left: i32,
    pub right: i32,
    pub acc: i32,
    pub acc_right: i32,
}
/// open loop power of both wheels
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct Power {
    pub left: i16,
    pub right: i16,
}
/// servo outputs
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromBytes, ToBytes)]
pub struct Servo {
    pub first: i16,
    pub second: i16,
}

/// command accepted by a motor node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Goto(Goto),
    GotoSpeed(GotoSpeed),
    GotoAccel(GotoAccel),
    GotoSplit(GotoSplit),
    Speed(Speed),
    SpeedAccel(SpeedAccel),
    SpeedSplit(SpeedSplit),
    Power(Power),
    Servo(Servo),
    /// read the supply voltage
    Supply,
    /// read the current [Status] without moving
    Position,
}
impl Command {
    /// endpoint of the node handling this command
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Goto(_) | Self::GotoSpeed(_) | Self::GotoAccel(_) | Self::GotoSplit(_) | Self::Position => "to",
            Self::Speed(_) | Self::SpeedAccel(_) | Self::SpeedSplit(_) => "sp",
            Self::Power(_) => "go",
            Self::Servo(_) => "set",
            Self::Supply => "stat",
        }
    }
    /// packed parameters, the length tells the node which variant it receives
    pub fn params(&self) -> Option<Vec<u8>> {
        match *self {
            Self::Goto(params) => Some(pack(params)),
            Self::GotoSpeed(params) => Some(pack(params)),
            Self::GotoAccel(params) => Some(pack(params)),
            Self::GotoSplit(params) => Some(pack(params)),
            Self::Speed(params) => Some(pack(params)),
            Self::SpeedAccel(params) => Some(pack(params)),
            Self::SpeedSplit(params) => Some(pack(params)),
            Self::Power(params) => Some(pack(params)),
            Self::Servo(params) => Some(pack(params)),
            Self::Supply | Self::Position => None,
        }
    }
    /// the node answers this command with a [Status]
    pub fn reports_status(&self) -> bool {
        !matches!(self, Self::Servo(_) | Self::Supply)
    }
}


#[derive(Copy, Clone, FromBytes)]
struct RawStatus {
    left: i32,
    right: i32,
    last_read: u32,
    distance: i32,
}

/// motion status reported by the node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    /// left wheel position
    pub left: i32,
    /// right wheel position
    pub right: i32,
    /// node time of the measure
    pub last_read: u32,
    /// distance sensor measure
    pub distance: i32,
    pub bumper: bool,
}
impl Status {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let raw: RawStatus = unpack(data)?;
        let bumper = raw.distance >= BUMPER;
        Ok(Self {
            left: raw.left,
            right: raw.right,
            last_read: raw.last_read,
            distance: if bumper {raw.distance - BUMPER} else {raw.distance},
            bumper,
        })
    }
}

#[derive(Copy, Clone, FromBytes)]
struct RawSupply {
    millivolts: i16,
    flag: u8,
}

/// power supply status reported by the node
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Supply {
    pub volts: f32,
    pub flag: u8,
}
impl Supply {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let raw: RawSupply = unpack(data)?;
        Ok(Self {
            volts: f32::from(raw.millivolts) / 1000.,
            flag: raw.flag,
        })
    }
}


/// motor node
pub struct Motor<R> {
    node: Node<R>,
}
impl<R: Rpc> Motor<R> {
    pub fn new(rpc: R, address: u8) -> Self {
        Self {node: Node::new(rpc, address)}
    }
    pub fn node(&self) -> &Node<R>  {&self.node}

    /// send a command and return the raw reply data
    pub async fn execute(&self, command: Command) -> Result<Value, Error> {
        let args = command.params().map(Value::Bytes);
        Ok(self.node.call(command.endpoint(), args).await?.data)
    }
    /// send a motion command and decode the status it is answered with
    pub async fn drive(&self, command: Command) -> Result<Status, Error> {
        if !command.reports_status() {
            return Err(Error::Reply("command is not answered with a status"));
        }
        let data = self.execute(command).await?;
        Status::parse(&reply_bytes(&data)?)
    }
    /// current motion status
    pub async fn position(&self) -> Result<Status, Error> {
        self.drive(Command::Position).await
    }
    /// supply voltage and flags
    pub async fn supply(&self) -> Result<Supply, Error> {
        let data = self.execute(Command::Supply).await?;
        Supply::parse(&reply_bytes(&data)?)
    }
}
