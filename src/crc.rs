/*!
    frame checksum shared by the host and the nodes

    The checksum is a CRC-8 from the Dallas/Maxim family (polynomial `0x31` reflected) seeded with `0xff`. It has no output xor, so running the CRC over a sequence followed by its own checksum always ends on zero, which is how the receiver validates a frame without locating its last byte.
*/

use crc::{Algorithm, Crc, Digest};


/// CRC-8 parameters used on the link
pub const CRC_8_LINK: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xff,
    refin: true,
    refout: true,
    xorout: 0x00,
    check: 0x0b,
    residue: 0x00,
};

/// table-driven implementation of [CRC_8_LINK]
pub static LINK_CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_LINK);

/// running checksum, seeded and ready to fold the first byte of a frame
pub fn running() -> Digest<'static, u8> {
    LINK_CRC.digest()
}

/// checksum of a frame's address and payload, as appended by the sender
pub fn checksum(address: u8, payload: &[u8]) -> u8 {
    let mut digest = running();
    digest.update(&[address]);
    digest.update(payload);
    digest.finalize()
}
