//! RTU frame codec.
//!
//! Frame layout: `[address][function][pdu...][crc_lo][crc_hi]`, at most 256
//! bytes total. The transport delivers one complete candidate frame per call
//! (3.5-char end-of-frame silence is detected outside this crate); this
//! module only checks length and CRC and splits the frame into its parts.

use crate::crc::crc16;

/// Maximum RTU frame size, CRC included.
pub const MAX_FRAME_LEN: usize = 256;
/// Minimal frame: address, function code and CRC, with an empty PDU.
pub const MIN_FRAME_LEN: usize = 4;
/// Slave address 0 addresses every slave; no reply is ever sent to it.
pub const BROADCAST_ADDRESS: u8 = 0;
/// Addresses 248-255 are reserved by the serial line spec.
pub const MAX_SLAVE_ADDRESS: u8 = 247;
/// Set on the function code of an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Byte buffer sized for one full RTU frame.
pub type FrameBuf = heapless::Vec<u8, MAX_FRAME_LEN>;

#[cfg_attr(not(test), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Frame too short, too long or truncated mid-PDU.
    InvalidFrame,
    /// CRC trailer does not match the frame contents.
    CrcMismatch,
    /// Frame is addressed to another slave.
    AddressMismatch,
    /// MEI transport byte of an encapsulated request is not 0x0E.
    InvalidMei,
    /// Own slave address outside 1..=247.
    InvalidAddress,
    /// Response does not fit the RTU frame size.
    BufferOverflow,
}

pub type Result<T> = core::result::Result<T, Error>;

/// A validated inbound frame, CRC stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub address: u8,
    pub function_code: u8,
    pub pdu: &'a [u8],
}

/// Validate length and CRC and split a received frame.
///
/// Address filtering is up to the caller; the codec does not know the
/// configured slave address.
pub fn decode(frame: &[u8]) -> Result<RawFrame<'_>> {
    if frame.len() < MIN_FRAME_LEN || frame.len() > MAX_FRAME_LEN {
        return Err(Error::InvalidFrame);
    }
    let split = frame.len() - 2;
    let received = u16::from_le_bytes([frame[split], frame[split + 1]]);
    let calculated = crc16(&frame[..split]);
    if received != calculated {
        return Err(Error::CrcMismatch);
    }
    Ok(RawFrame {
        address: frame[0],
        function_code: frame[1],
        pdu: &frame[2..split],
    })
}

/// Outbound frame under construction. `finish` appends the CRC trailer.
pub struct ResponseFrame {
    buf: FrameBuf,
}

impl ResponseFrame {
    pub fn new(address: u8, function_code: u8) -> Self {
        let mut buf = FrameBuf::new();
        buf.push(address).ok();
        buf.push(function_code).ok();
        Self { buf }
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.buf.push(byte).map_err(|_| Error::BufferOverflow)
    }

    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.extend(&value.to_be_bytes())
    }

    pub fn extend(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf
            .extend_from_slice(bytes)
            .map_err(|_| Error::BufferOverflow)
    }

    /// Append the CRC (low byte first) and hand out the finished frame.
    pub fn finish(mut self) -> Result<FrameBuf> {
        let crc = crc16(&self.buf);
        self.extend(&crc.to_le_bytes())?;
        Ok(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_frame() {
        let frame = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];
        let raw = decode(&frame).unwrap();
        assert_eq!(raw.address, 0x11);
        assert_eq!(raw.function_code, 0x03);
        assert_eq!(raw.pdu, &[0x00, 0x6B, 0x00, 0x03]);
    }

    #[test]
    fn decode_rejects_short_frame() {
        assert_eq!(decode(&[0x01, 0x03, 0xFF]), Err(Error::InvalidFrame));
        assert_eq!(decode(&[]), Err(Error::InvalidFrame));
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let frame = [0u8; MAX_FRAME_LEN + 1];
        assert_eq!(decode(&frame), Err(Error::InvalidFrame));
    }

    #[test]
    fn decode_rejects_bad_crc() {
        let frame = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x88];
        assert_eq!(decode(&frame), Err(Error::CrcMismatch));
    }

    #[test]
    fn minimal_frame_is_accepted() {
        // empty PDU: address + function + CRC only
        let mut frame = vec![0x05, 0x03];
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        let raw = decode(&frame).unwrap();
        assert!(raw.pdu.is_empty());
    }

    #[test]
    fn response_frame_round_trips() {
        let mut response = ResponseFrame::new(0x11, 0x03);
        response.push(0x06).unwrap();
        response
            .extend(&[0xAE, 0x41, 0x56, 0x52, 0x43, 0x40])
            .unwrap();
        let frame = response.finish().unwrap();
        assert_eq!(
            frame.as_slice(),
            &[0x11, 0x03, 0x06, 0xAE, 0x41, 0x56, 0x52, 0x43, 0x40, 0x49, 0xAD]
        );
        // and the codec accepts its own output
        let raw = decode(&frame).unwrap();
        assert_eq!(raw.function_code, 0x03);
    }

    #[test]
    fn push_u16_is_big_endian() {
        let mut response = ResponseFrame::new(0x01, 0x06);
        response.push_u16(0xABCD).unwrap();
        let frame = response.finish().unwrap();
        assert_eq!(&frame[2..4], &[0xAB, 0xCD]);
    }
}
