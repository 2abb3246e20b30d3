use std::{
    sync::Arc,
    time::Duration,
    };
use futures_concurrency::future::Race;
use uartlink::host::*;

/// print everything the nodes send
struct Monitor;
impl Rpc for Monitor {
    async fn call(&self, _address: u8, endpoint: &str, _args: Option<Value>) -> Result<CallReply, Error> {
        Err(Error::Remote(format!("no rpc layer to call {}", endpoint)))
    }
    async fn describe(&self, _address: u8, endpoint: &str) -> Result<CallReply, Error> {
        Err(Error::Remote(format!("no rpc layer to describe {}", endpoint)))
    }
    async fn connect(&self, _address: u8, endpoint: &str) -> Result<CallReply, Error> {
        Err(Error::Remote(format!("no rpc layer to connect {}", endpoint)))
    }
}
impl Upstream for Monitor {
    fn process(&self, source: Source, message: Value) {
        println!("{}: {:?}", source, message);
    }
    fn emit_event(&self, url: &str, data: Value, _options: Option<Value>) {
        println!("event {}: {:?}", url, data);
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    // initialize a link on some uart port
    let link = Link::new(
        LinkConfig::new("motors"),
        Serial::new("/dev/ttyUSB0").with_baud_rate(115200),
        Arc::new(Monitor),
        );
    println!("available ports: {:?}", link.ports());

    let task = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        // ping every node once, replies are printed by the monitor as well
        for address in 1 .. 8 {
            let sent = link.send(address, &Value::Text("ping".into())).unwrap();
            match sent.await {
                Ok(reply) => println!("node {} answered as {}", address, reply.source),
                Err(error) => println!("node {} is silent: {}", address, error),
            }
        }
    };
    let run = async {
        link.run().await.unwrap();
    };
    (task, run).race().await;
}
