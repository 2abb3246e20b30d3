use std::{
    collections::VecDeque,
    sync::Mutex,
    };

use uartlink::{
    host::*,
    devices::{
        motor::{self, Motor, Command, Goto, Speed, Servo},
        stepper::{self, Stepper},
        },
    };


/// one call received by [Scripted]
#[derive(Clone, Debug, PartialEq)]
enum Call {
    Call {address: u8, endpoint: String, args: Option<Value>},
    Describe {address: u8, endpoint: String},
    Connect {address: u8, endpoint: String},
}

/// rpc answering with prepared replies in order
struct Scripted {
    replies: Mutex<VecDeque<Result<CallReply, Error>>>,
    calls: Mutex<Vec<Call>>,
}
impl Scripted {
    fn new(replies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|data| Ok(data.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
    fn answer(&self, call: Call) -> Result<CallReply, Error> {
        self.calls.lock().unwrap().push(call);
        self.replies.lock().unwrap()
            .pop_front()
            .unwrap_or(Err(Error::Timeout))
    }
}
impl Rpc for Scripted {
    async fn call(&self, address: u8, endpoint: &str, args: Option<Value>) -> Result<CallReply, Error> {
        self.answer(Call::Call {address, endpoint: endpoint.into(), args})
    }
    async fn describe(&self, address: u8, endpoint: &str) -> Result<CallReply, Error> {
        self.answer(Call::Describe {address, endpoint: endpoint.into()})
    }
    async fn connect(&self, address: u8, endpoint: &str) -> Result<CallReply, Error> {
        self.answer(Call::Connect {address, endpoint: endpoint.into()})
    }
}

fn status_bytes(left: i32, right: i32, last_read: u32, distance: i32) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(left.to_le_bytes());
    data.extend(right.to_le_bytes());
    data.extend(last_read.to_le_bytes());
    data.extend(distance.to_le_bytes());
    data
}


#[tokio::test]
async fn motor_goto() {
    let rpc = Scripted::new([Value::Bytes(status_bytes(100, 200, 55, motor::BUMPER + 12))]);
    let motor = Motor::new(&rpc, 4);

    let status = motor.drive(Command::Goto(Goto {left: 100, right: 200})).await.unwrap();
    assert_eq!(status, motor::Status {
        left: 100,
        right: 200,
        last_read: 55,
        distance: 12,
        bumper: true,
    });

    let mut params = Vec::new();
    params.extend(100i32.to_le_bytes());
    params.extend(200i32.to_le_bytes());
    assert_eq!(rpc.calls(), [Call::Call {
        address: 4,
        endpoint: "to".into(),
        args: Some(Value::Bytes(params)),
    }]);
}

#[tokio::test]
async fn motor_speed_and_position() {
    // status given as an array of bytes this time
    let status = status_bytes(-1, 1, 0, 40).into_iter()
        .map(|byte| Value::Integer(byte.into()))
        .collect();
    let rpc = Scripted::new([Value::Null, Value::Array(status)]);
    let motor = Motor::new(&rpc, 2);

    let reply = motor.execute(Command::Speed(Speed {left: 10, right: 10})).await.unwrap();
    assert_eq!(reply, Value::Null);

    let status = motor.position().await.unwrap();
    assert_eq!((status.left, status.right, status.distance, status.bumper), (-1, 1, 40, false));

    let calls = rpc.calls();
    assert!(matches!(&calls[0], Call::Call {endpoint, ..} if endpoint == "sp"));
    assert_eq!(calls[1], Call::Call {address: 2, endpoint: "to".into(), args: None});
}

#[tokio::test]
async fn motor_supply() {
    let rpc = Scripted::new([Value::Bytes(vec![0x30, 0x2a, 0x01])]);
    let motor = Motor::new(&rpc, 1);

    let supply = motor.supply().await.unwrap();
    assert_eq!(supply, motor::Supply {volts: 10.8, flag: 1});
    assert_eq!(rpc.calls(), [Call::Call {address: 1, endpoint: "stat".into(), args: None}]);
}

#[tokio::test]
async fn motor_rejects_bad_replies() {
    let rpc = Scripted::new([Value::Bytes(vec![1, 2, 3]), Value::Text("busy".into())]);
    let motor = Motor::new(&rpc, 1);

    assert!(matches!(motor.position().await, Err(Error::Reply(_))));
    assert!(matches!(motor.position().await, Err(Error::Reply(_))));
    // errors of the rpc layer come through
    assert!(matches!(motor.position().await, Err(Error::Timeout)));
    // servo commands have no status to decode, nothing is sent
    assert!(matches!(
        motor.drive(Command::Servo(Servo {first: 1, second: 2})).await,
        Err(Error::Reply(_)),
        ));
    assert_eq!(rpc.calls().len(), 3);
}

#[tokio::test]
async fn stepper_attach_and_move() {
    let description = Value::Array(vec![Value::Text("x".into()), Value::Text("y".into())]);
    let rpc = Scripted::new([
        Value::Null,
        description.clone(),
        Value::Bytes(vec![5, 9, 2]),
        Value::Bytes(vec![9, 9, 0]),
        ]);

    let stepper = Stepper::attach(&rpc, 8).await.unwrap();
    assert_eq!(stepper.description(), Some(&description));
    assert_eq!(stepper.links().len(), 2);

    let status = stepper.goto("x", 9, 2).await.unwrap();
    assert_eq!(status, stepper::Status {current: 5, target: 9, speed: 2});
    let status = stepper.stat("x").await.unwrap();
    assert_eq!(status.current, status.target);

    assert_eq!(rpc.calls(), [
        Call::Connect {address: 8, endpoint: "".into()},
        Call::Describe {address: 8, endpoint: "".into()},
        Call::Call {
            address: 8,
            endpoint: "x".into(),
            args: Some(Value::Array(vec![Value::Integer(9.into()), Value::Integer(2.into())])),
        },
        Call::Call {address: 8, endpoint: "x".into(), args: None},
    ]);
}

#[tokio::test]
async fn stepper_attach_fails_without_node() {
    let rpc = Scripted::new(Vec::<Value>::new());
    assert!(matches!(Stepper::attach(&rpc, 8).await, Err(Error::Timeout)));
}
