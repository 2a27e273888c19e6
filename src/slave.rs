//! The slave engine: request parsing, dispatch and response building.
//!
//! One [`Slave::process_message`] call handles one complete candidate frame,
//! run to completion, with no blocking and no state carried to the next
//! frame beyond the configuration itself. The transport owns all timing.

use crate::device_id::{self, DeviceIdentity};
use crate::frame::{
    self, Error, FrameBuf, ResponseFrame, Result, BROADCAST_ADDRESS, EXCEPTION_FLAG,
    MAX_SLAVE_ADDRESS,
};
use crate::function::{FunctionCode, RegisterSpace};
use crate::transaction::{
    ExceptionCode, SlaveCallback, Transaction, Transmit, MAX_READ_COILS, MAX_READ_REGISTERS,
    MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

/// Modbus RTU slave protocol engine.
///
/// Owns the slave configuration: the station address and, optionally, a
/// registered device identity. All data-plane state belongs to the
/// application behind the [`SlaveCallback`].
pub struct Slave<'id> {
    address: u8,
    identity: Option<DeviceIdentity<'id>>,
}

impl<'id> Slave<'id> {
    /// Create an engine with the given station address (1..=247).
    pub fn new(address: u8) -> Result<Self> {
        check_address(address)?;
        Ok(Self {
            address,
            identity: None,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Change the station address. Address 0 is the broadcast address and
    /// 248-255 are reserved; on rejection the old address stays in effect.
    pub fn set_address(&mut self, address: u8) -> Result<()> {
        check_address(address)?;
        self.address = address;
        Ok(())
    }

    /// Register the identity served by Read Device Identification (FC 43).
    pub fn register_device_identity(&mut self, identity: DeviceIdentity<'id>) {
        self.identity = Some(identity);
    }

    pub fn device_identity(&self) -> Option<&DeviceIdentity<'id>> {
        self.identity.as_ref()
    }

    /// Process one received frame and produce the reply, if any.
    ///
    /// `Ok(None)` means the request was handled but no reply is due
    /// (broadcast). Local errors (bad CRC, short frame, foreign address,
    /// foreign MEI type) are returned to the caller and never answered on
    /// the wire.
    pub fn process_message<C: SlaveCallback>(
        &mut self,
        frame: &[u8],
        callback: &mut C,
    ) -> Result<Option<FrameBuf>> {
        let raw = frame::decode(frame)?;
        if raw.address != self.address && raw.address != BROADCAST_ADDRESS {
            return Err(Error::AddressMismatch);
        }
        let mut transaction = Transaction::new(raw.function_code, raw.address == BROADCAST_ADDRESS);
        self.parse_pdu(&mut transaction, raw.pdu)?;
        dispatch(&mut transaction, callback);

        if transaction.broadcast {
            // broadcasts are applied but never answered, exceptions included
            return Ok(None);
        }
        self.build_reply(&transaction).map(Some)
    }

    /// [`Self::process_message`] followed by a synchronous transmit.
    pub fn process_and_transmit<C: SlaveCallback, T: Transmit>(
        &mut self,
        frame: &[u8],
        callback: &mut C,
        sink: &mut T,
    ) -> Result<()> {
        if let Some(reply) = self.process_message(frame, callback)? {
            // sink failures stay local; the transport reports them, the
            // wire never sees them
            let _ = sink.transmit(&reply);
        }
        Ok(())
    }

    /// Decode the request PDU into the transaction, raising protocol
    /// exceptions for value/range violations. `Err` is reserved for frames
    /// too malformed to answer.
    fn parse_pdu(&self, transaction: &mut Transaction, pdu: &[u8]) -> Result<()> {
        let Some(function) = transaction.function else {
            transaction.raise(ExceptionCode::IllegalFunction);
            return Ok(());
        };
        if function == FunctionCode::ReadDeviceIdentification {
            return device_id::parse_request(transaction, pdu, self.identity.as_ref());
        }

        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let (address, quantity) = read_request_header(pdu)?;
                transaction.register_address = address;
                transaction.register_count = quantity;
                if quantity < 1 || quantity > MAX_READ_COILS {
                    transaction.raise(ExceptionCode::IllegalDataValue);
                }
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
                let (address, quantity) = read_request_header(pdu)?;
                transaction.register_address = address;
                transaction.register_count = quantity;
                if quantity < 1 || quantity > MAX_READ_REGISTERS {
                    transaction.raise(ExceptionCode::IllegalDataValue);
                }
            }
            FunctionCode::WriteSingleCoil => {
                let (address, value) = read_request_header(pdu)?;
                transaction.register_address = address;
                transaction.register_count = 1;
                match value {
                    0xFF00 => transaction.set_coil(0, true),
                    0x0000 => transaction.set_coil(0, false),
                    _ => transaction.raise(ExceptionCode::IllegalDataValue),
                }
            }
            FunctionCode::WriteSingleRegister => {
                let (address, value) = read_request_header(pdu)?;
                transaction.register_address = address;
                transaction.register_count = 1;
                transaction.set_register(0, value);
            }
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
                if pdu.len() < 5 {
                    return Err(Error::InvalidFrame);
                }
                let address = be16(pdu, 0);
                let quantity = be16(pdu, 2);
                let byte_count = pdu[4] as usize;
                transaction.register_address = address;
                transaction.register_count = quantity;

                let (max_quantity, expected_bytes) =
                    if function == FunctionCode::WriteMultipleCoils {
                        (MAX_WRITE_COILS, (quantity as usize + 7) / 8)
                    } else {
                        (MAX_WRITE_REGISTERS, quantity as usize * 2)
                    };
                if quantity < 1 || quantity > max_quantity || byte_count != expected_bytes {
                    transaction.raise(ExceptionCode::IllegalDataValue);
                    return Ok(());
                }
                if pdu.len() < 5 + byte_count {
                    // declared data missing: unanswerable
                    return Err(Error::InvalidFrame);
                }
                transaction
                    .data_mut(byte_count)
                    .copy_from_slice(&pdu[5..5 + byte_count]);
            }
            // recognized but not served (FC 23)
            _ => transaction.raise(ExceptionCode::IllegalFunction),
        }

        if let Some(space) = RegisterSpace::of(function) {
            transaction.register_number =
                space.base() + u32::from(transaction.register_address);
        }
        Ok(())
    }

    fn build_reply(&self, transaction: &Transaction) -> Result<FrameBuf> {
        if let Some(code) = transaction.exception {
            let mut response =
                ResponseFrame::new(self.address, transaction.function_code | EXCEPTION_FLAG);
            response.push(code as u8)?;
            return response.finish();
        }

        let Some(function) = transaction.function else {
            // unknown codes always take the exception path above
            return Err(Error::InvalidFrame);
        };
        let mut response = ResponseFrame::new(self.address, transaction.function_code);
        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let byte_count = (transaction.register_count as usize + 7) / 8;
                response.push(byte_count as u8)?;
                response.extend(transaction.data(byte_count))?;
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
                let byte_count = transaction.register_count as usize * 2;
                response.push(byte_count as u8)?;
                response.extend(transaction.data(byte_count))?;
            }
            FunctionCode::WriteSingleCoil => {
                response.push_u16(transaction.register_address)?;
                response.push_u16(if transaction.coil(0) { 0xFF00 } else { 0x0000 })?;
            }
            FunctionCode::WriteSingleRegister => {
                response.push_u16(transaction.register_address)?;
                response.push_u16(transaction.register(0))?;
            }
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
                response.push_u16(transaction.register_address)?;
                response.push_u16(transaction.register_count)?;
            }
            FunctionCode::ReadDeviceIdentification => {
                let Some(identity) = self.identity.as_ref() else {
                    // parse raised an exception when no identity is registered
                    return Err(Error::InvalidFrame);
                };
                device_id::build_response(&mut response, transaction, identity)?;
            }
            FunctionCode::ReadWriteMultipleRegisters => return Err(Error::InvalidFrame),
        }
        response.finish()
    }
}

fn check_address(address: u8) -> Result<()> {
    if address == BROADCAST_ADDRESS || address > MAX_SLAVE_ADDRESS {
        return Err(Error::InvalidAddress);
    }
    Ok(())
}

/// Invoke the data callback unless an exception is already pending.
fn dispatch<C: SlaveCallback>(transaction: &mut Transaction, callback: &mut C) {
    if transaction.exception.is_some() {
        return;
    }
    let Some(function) = transaction.function else {
        return;
    };
    if function == FunctionCode::ReadDeviceIdentification {
        // served from the registered identity, not the data plane
        return;
    }
    let result = if function.is_write() {
        callback.write_area(transaction)
    } else {
        callback.read_area(transaction)
    };
    if let Err(error) = result {
        transaction.raise(error.into());
    }
}

fn be16(pdu: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([pdu[at], pdu[at + 1]])
}

/// `[addr_hi addr_lo][u16_hi u16_lo]` header shared by FC 1-6.
fn read_request_header(pdu: &[u8]) -> Result<(u16, u16)> {
    if pdu.len() < 4 {
        return Err(Error::InvalidFrame);
    }
    Ok((be16(pdu, 0), be16(pdu, 2)))
}
