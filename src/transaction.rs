//! Per-request transaction record and the application-side traits.
//!
//! A [`Transaction`] is created for each inbound frame and dropped when the
//! engine returns. It carries the decoded request fields and a 256-byte
//! payload area holding register values or coil bitmaps, always big-endian /
//! LSB-first as on the wire; the accessors translate to host types so the
//! callback never deals with byte order.

use bit_field::BitField;

use crate::function::FunctionCode;

/// Backing store for register values or packed coil bits.
pub const PAYLOAD_LEN: usize = 256;
/// Read quantity limit for FC 3 / FC 4.
pub const MAX_READ_REGISTERS: u16 = 125;
/// Write quantity limit for FC 16.
pub const MAX_WRITE_REGISTERS: u16 = 123;
/// Read quantity limit for FC 1 / FC 2.
pub const MAX_READ_COILS: u16 = 2000;
/// Write quantity limit for FC 15.
pub const MAX_WRITE_COILS: u16 = 1968;

/// Wire exception codes (Modbus Application Protocol, section 7).
#[cfg_attr(not(test), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction = 1,
    IllegalDataAddress = 2,
    IllegalDataValue = 3,
    SlaveDeviceFailure = 4,
}

/// Error returned by the application callback.
#[cfg_attr(not(test), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackError {
    /// The function code is valid but this device does not serve it.
    FunctionNotImplemented,
    /// The addressed register does not exist on this device.
    RegisterNotImplemented,
    /// Anything else; reported as slave device failure.
    Failure,
}

impl From<CallbackError> for ExceptionCode {
    fn from(error: CallbackError) -> Self {
        match error {
            CallbackError::FunctionNotImplemented => Self::IllegalFunction,
            CallbackError::RegisterNotImplemented => Self::IllegalDataAddress,
            CallbackError::Failure => Self::SlaveDeviceFailure,
        }
    }
}

/// Application data plane, invoked once per validated request.
///
/// Reads fill the first `register_count` registers (or coil bits) of the
/// transaction payload; writes apply the values the parser stored there.
/// Values are host byte order throughout.
pub trait SlaveCallback {
    fn read_area(&mut self, transaction: &mut Transaction) -> Result<(), CallbackError>;
    fn write_area(&mut self, transaction: &mut Transaction) -> Result<(), CallbackError>;
}

/// Transmit sink for outbound frames.
///
/// A sink error never reaches the wire; the engine logs it and drops the
/// frame.
pub trait Transmit {
    type Error;
    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Working record for one request/response cycle.
#[derive(Debug)]
pub struct Transaction {
    /// Function code as received, unvalidated.
    pub function_code: u8,
    /// Decoded function code; `None` when `function_code` is unknown.
    pub function: Option<FunctionCode>,
    /// Request arrived on the broadcast address; no reply will be sent.
    pub broadcast: bool,
    /// Zero-based wire address.
    pub register_address: u16,
    /// Canonical one-based register number (DO 1-9999, DI 10001-19999,
    /// AI 30001-39999, AO 40001-49999).
    pub register_number: u32,
    /// Number of coils or registers read or written.
    pub register_count: u16,
    /// Pending protocol exception; `None` means a normal reply.
    pub exception: Option<ExceptionCode>,
    /// Device Identification: requested ReadDeviceId code.
    pub read_device_id_code: u8,
    /// Device Identification: first object to return.
    pub object_id: u8,
    payload: [u8; PAYLOAD_LEN],
}

impl Transaction {
    pub(crate) fn new(function_code: u8, broadcast: bool) -> Self {
        Self {
            function_code,
            function: FunctionCode::from_u8(function_code),
            broadcast,
            register_address: 0,
            register_number: 0,
            register_count: 0,
            exception: None,
            read_device_id_code: 0,
            object_id: 0,
            payload: [0; PAYLOAD_LEN],
        }
    }

    /// Record an exception; the first one raised wins.
    pub(crate) fn raise(&mut self, code: ExceptionCode) {
        if self.exception.is_none() {
            self.exception = Some(code);
        }
    }

    /// Register at `index`, big-endian in the payload.
    pub fn register(&self, index: usize) -> u16 {
        u16::from_be_bytes([self.payload[2 * index], self.payload[2 * index + 1]])
    }

    pub fn set_register(&mut self, index: usize, value: u16) {
        self.payload[2 * index..2 * index + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Coil bit at `index`, packed LSB-first within each payload byte.
    pub fn coil(&self, index: usize) -> bool {
        self.payload[index / 8].get_bit(index % 8)
    }

    pub fn set_coil(&mut self, index: usize, on: bool) {
        self.payload[index / 8].set_bit(index % 8, on);
    }

    pub(crate) fn data(&self, len: usize) -> &[u8] {
        &self.payload[..len]
    }

    pub(crate) fn data_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.payload[..len]
    }
}
