//! Function codes and the register address spaces they operate on.
//!
//! Modbus registers live in four disjoint spaces, each with a one-based
//! canonical numbering; the wire carries zero-based offsets. The mapping is
//! selected by function code:
//!
//! | Function codes | Space | Numbers |
//! |---|---|---|
//! | 1, 5, 15 | coils (DO) | 1-9999 |
//! | 2 | discrete inputs (DI) | 10001-19999 |
//! | 4 | input registers (AI) | 30001-39999 |
//! | 3, 6, 16, 23 | holding registers (AO) | 40001-49999 |

/// Public function codes handled or at least recognized by the engine.
#[cfg_attr(not(test), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ReadCoils = 1,
    ReadDiscreteInputs = 2,
    ReadHoldingRegisters = 3,
    ReadInputRegisters = 4,
    WriteSingleCoil = 5,
    WriteSingleRegister = 6,
    WriteMultipleCoils = 15,
    WriteMultipleRegisters = 16,
    ReadWriteMultipleRegisters = 23,
    ReadDeviceIdentification = 43,
}

impl FunctionCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ReadCoils),
            2 => Some(Self::ReadDiscreteInputs),
            3 => Some(Self::ReadHoldingRegisters),
            4 => Some(Self::ReadInputRegisters),
            5 => Some(Self::WriteSingleCoil),
            6 => Some(Self::WriteSingleRegister),
            15 => Some(Self::WriteMultipleCoils),
            16 => Some(Self::WriteMultipleRegisters),
            23 => Some(Self::ReadWriteMultipleRegisters),
            43 => Some(Self::ReadDeviceIdentification),
            _ => None,
        }
    }

    /// True for codes that carry values from master to slave.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::WriteSingleCoil
                | Self::WriteSingleRegister
                | Self::WriteMultipleCoils
                | Self::WriteMultipleRegisters
        )
    }

    /// True for single-bit (coil / discrete input) access codes.
    pub fn is_bit_access(self) -> bool {
        matches!(
            self,
            Self::ReadCoils
                | Self::ReadDiscreteInputs
                | Self::WriteSingleCoil
                | Self::WriteMultipleCoils
        )
    }
}

/// One of the four disjoint register spaces.
#[cfg_attr(not(test), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSpace {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl RegisterSpace {
    /// Canonical number of the space's first register (wire address 0).
    pub const fn base(self) -> u32 {
        match self {
            Self::Coil => 1,
            Self::DiscreteInput => 10_001,
            Self::InputRegister => 30_001,
            Self::HoldingRegister => 40_001,
        }
    }

    /// Canonical number of the space's last register.
    pub const fn end(self) -> u32 {
        self.base() + 9_998
    }

    /// The space a function code operates on; `None` for the Device
    /// Identification sub-protocol, which has no register semantics.
    pub fn of(function: FunctionCode) -> Option<Self> {
        match function {
            FunctionCode::ReadCoils
            | FunctionCode::WriteSingleCoil
            | FunctionCode::WriteMultipleCoils => Some(Self::Coil),
            FunctionCode::ReadDiscreteInputs => Some(Self::DiscreteInput),
            FunctionCode::ReadInputRegisters => Some(Self::InputRegister),
            FunctionCode::ReadHoldingRegisters
            | FunctionCode::WriteSingleRegister
            | FunctionCode::WriteMultipleRegisters
            | FunctionCode::ReadWriteMultipleRegisters => Some(Self::HoldingRegister),
            FunctionCode::ReadDeviceIdentification => None,
        }
    }

    pub fn contains(self, number: u32) -> bool {
        number >= self.base() && number <= self.end()
    }
}

/// Translate a zero-based wire address into the canonical register number
/// for the given function code.
pub fn register_number(function: FunctionCode, register_address: u16) -> Option<u32> {
    RegisterSpace::of(function).map(|space| space.base() + u32::from(register_address))
}
