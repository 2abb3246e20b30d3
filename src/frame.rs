/*!
    byte-stuffed frames as they travel on the serial line

    ```text
    FLAG | ADDRESS | PAYLOAD ... | CRC | FLAG
    ```

    every byte between the flags is stuffed: [FLAG] and [ESCAPE] are replaced by `ESCAPE, byte ^ XOR`. A flag ends a frame and can directly be followed by the first byte of the next one.
*/

use core::iter;
use thiserror::Error;
use crc::Digest;

use crate::crc::{running, checksum};


/// frame delimiter
pub const FLAG: u8 = 0x7e;
/// marks the next byte as escaped
pub const ESCAPE: u8 = 0x7d;
/// applied to escaped bytes
pub const XOR: u8 = 0x20;
/// default capacity of the reception buffer, for address, payload and checksum after unstuffing
pub const MAX_FRAME: usize = 1024;


/// reason a candidate frame was dropped
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// running checksum did not end on zero
    #[error("frame checksum mismatch")]
    Checksum,
    /// frame did not fit the reception buffer
    #[error("frame exceeds reception buffer")]
    Overrun,
}

/// frame received and validated, borrowing the decoder's buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame<'d> {
    pub address: u8,
    pub payload: &'d [u8],
}

/// something completed at a flag boundary
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event<'d> {
    Frame(Frame<'d>),
    Corrupted(FrameError),
}


/**
    incremental frame decoder, fed one byte at a time

    `N` bounds the unstuffed size of a frame. A longer frame is dropped as [FrameError::Overrun] when its closing flag arrives, reception resumes with the next frame.
*/
pub struct Decoder<const N: usize = MAX_FRAME> {
    buffer: heapless::Vec<u8, N>,
    crc: Digest<'static, u8>,
    escaped: bool,
    overrun: bool,
    /// the buffer still holds the last emitted frame
    emitted: bool,
}

impl<const N: usize> Decoder<N> {
    pub fn new() -> Self {
        Self {
            buffer: heapless::Vec::new(),
            crc: running(),
            escaped: false,
            overrun: false,
            emitted: false,
        }
    }

    /// drop any partially received frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.crc = running();
        self.escaped = false;
        self.overrun = false;
        self.emitted = false;
    }

    /// consume one byte from the line, return an event when a flag closes a candidate frame
    pub fn ingest(&mut self, byte: u8) -> Option<Event<'_>> {
        if self.emitted {
            self.buffer.clear();
            self.emitted = false;
        }
        if self.escaped {
            self.escaped = false;
            self.store(byte ^ XOR);
            None
        }
        else if byte == ESCAPE {
            self.escaped = true;
            None
        }
        else if byte == FLAG {
            self.close()
        }
        else {
            self.store(byte);
            None
        }
    }

    fn store(&mut self, byte: u8) {
        if self.overrun {
            return
        }
        if self.buffer.push(byte).is_err() {
            self.overrun = true;
            return
        }
        self.crc.update(&[byte]);
    }

    fn close(&mut self) -> Option<Event<'_>> {
        let crc = core::mem::replace(&mut self.crc, running()).finalize();
        if self.overrun {
            self.overrun = false;
            self.buffer.clear();
            return Some(Event::Corrupted(FrameError::Overrun));
        }
        // flags with nothing meaningful between them only resynchronize
        if self.buffer.len() <= 2 {
            self.buffer.clear();
            return None;
        }
        if crc != 0 {
            self.buffer.clear();
            return Some(Event::Corrupted(FrameError::Checksum));
        }
        // keep the content alive for the returned borrow, cleared on next byte
        self.emitted = true;
        let end = self.buffer.len() - 1;
        Some(Event::Frame(Frame {
            address: self.buffer[0],
            payload: &self.buffer[1 .. end],
        }))
    }
}

impl<const N: usize> Default for Decoder<N> {
    fn default() -> Self {
        Self::new()
    }
}


/// stuffed frame ready to transmit, flags included
pub fn encode(address: u8, payload: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let crc = checksum(address, payload);
    iter::once(FLAG)
        .chain(
            iter::once(address)
            .chain(payload.iter().copied())
            .chain(iter::once(crc))
            .flat_map(stuff)
            )
        .chain(iter::once(FLAG))
}

/// escape a single byte if it collides with a control byte
fn stuff(byte: u8) -> impl Iterator<Item = u8> {
    let (first, second) = match byte {
        FLAG | ESCAPE => (ESCAPE, Some(byte ^ XOR)),
        _ => (byte, None),
    };
    iter::once(first).chain(second)
}
