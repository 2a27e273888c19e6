//! Modbus RTU Slave Protocol Engine
//!
//! Stateless, transport-agnostic core of a Modbus RTU slave: it takes one
//! complete candidate frame, validates length, CRC and station address,
//! decodes the PDU, hands the data work to an application callback and
//! serializes a conformant reply (or exception) frame.
//!
//! Supported functions:
//! - 0x01/0x02 Read Coils / Discrete Inputs
//! - 0x03/0x04 Read Holding / Input Registers
//! - 0x05/0x06 Write Single Coil / Register
//! - 0x0F/0x10 Write Multiple Coils / Registers
//! - 0x2B/0x0E Read Device Identification (basic and regular categories,
//!   stream and individual access, fragmented replies)
//!
//! ## Usage
//!
//! 1. Implement [`SlaveCallback`] for your application data: reads fill the
//!    transaction's register/coil area, writes apply the delivered values.
//! 2. Create a [`Slave`] with the station address, optionally register a
//!    [`DeviceIdentity`].
//! 3. Feed every received frame to [`Slave::process_message`] and send the
//!    returned bytes, or let [`Slave::process_and_transmit`] drive a
//!    [`Transmit`] sink directly.
//!
//! Frame timing (the 3.5-char idle that delimits RTU frames and the
//! 1.5-char intra-frame limit) belongs to the serial driver; call
//! `process_message` once a complete frame has been received. The engine
//! performs no I/O and keeps no state between frames besides its own
//! configuration.
//!
//! All multi-byte fields are big-endian on the wire except the CRC trailer,
//! which is little-endian. Broadcast requests (address 0) are executed but
//! never answered.

#![cfg_attr(not(test), no_std)]

pub mod crc;
pub mod device_id;
pub mod frame;
pub mod function;
pub mod slave;
pub mod transaction;

pub use crc::crc16;
pub use device_id::DeviceIdentity;
pub use frame::{Error, FrameBuf, Result, BROADCAST_ADDRESS, MAX_FRAME_LEN, MAX_SLAVE_ADDRESS};
pub use function::{FunctionCode, RegisterSpace};
pub use slave::Slave;
pub use transaction::{CallbackError, ExceptionCode, SlaveCallback, Transaction, Transmit};
