/*!
    half-duplex serial link to addressable nodes

    - [frame] and [crc] implement the wire format, they do not need `std`
    - [host] implements the asynchronous link: transaction queue, timeouts, dispatch to an upstream processor, subscriptions and reconnection
    - [devices] holds command encoders for the motor and stepper nodes living on the link
*/
#![no_std]
#[cfg(feature = "std")]
extern crate std;

pub mod crc;
pub mod frame;

#[cfg(feature = "host")]
pub mod host;
#[cfg(feature = "host")]
pub mod devices;
