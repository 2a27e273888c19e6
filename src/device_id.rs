//! Read Device Identification (function code 43, MEI type 0x0E).
//!
//! The identity is an ordered set of byte-string objects. Objects 0-2
//! (VendorName, ProductCode, MajorMinorRevision) are mandatory; 3-6 are
//! optional "regular" objects. Extended objects (0x80 and up) are not
//! supported.
//!
//! Responses pack consecutive objects until the frame is full; a
//! `more_follows` marker tells the master to re-issue the request with the
//! returned `next_object_id`. The server keeps no cursor between fragments.

use crate::frame::{Error, ResponseFrame, Result, MAX_FRAME_LEN};
use crate::transaction::{ExceptionCode, Transaction};

/// MEI transport byte for Device Identification.
pub const MEI_TYPE: u8 = 0x0E;

/// Conformity: only the three basic objects are present.
pub const CONFORMITY_BASIC: u8 = 0x01;
/// Conformity: at least one regular object is present.
pub const CONFORMITY_REGULAR: u8 = 0x02;
/// OR-ed into the conformity level: objects can also be read one at a time.
pub const INDIVIDUAL_ACCESS: u8 = 0x80;

/// ReadDeviceId request codes.
pub const READ_BASIC: u8 = 1;
pub const READ_REGULAR: u8 = 2;
pub const READ_EXTENDED: u8 = 3;
pub const READ_INDIVIDUAL: u8 = 4;

/// Object ids of the standard identification objects.
pub mod object {
    pub const VENDOR_NAME: u8 = 0;
    pub const PRODUCT_CODE: u8 = 1;
    pub const MAJOR_MINOR_REVISION: u8 = 2;
    pub const VENDOR_URL: u8 = 3;
    pub const PRODUCT_NAME: u8 = 4;
    pub const MODEL_NAME: u8 = 5;
    pub const USER_APPLICATION_NAME: u8 = 6;
}

const OBJECT_COUNT: usize = 7;

/// Response body capacity: frame size minus address, function code and CRC.
const BODY_CAPACITY: usize = MAX_FRAME_LEN - 4;
/// MEI, code, conformity, more_follows, next_object_id, number_of_objects.
const BODY_HEADER_LEN: usize = 6;
/// Largest object that still fits a response frame on its own.
pub const MAX_OBJECT_LEN: usize = BODY_CAPACITY - BODY_HEADER_LEN - 2;

/// Device identity registered with the engine.
///
/// The three basic objects are required up front; regular objects are added
/// with the builder methods:
///
/// ```
/// use modbus_slave::DeviceIdentity;
///
/// let identity = DeviceIdentity::new("ACME", "PUMP-1", "1.02")
///     .with_product_name("Acme pump controller");
/// ```
#[derive(Debug, Clone)]
pub struct DeviceIdentity<'a> {
    objects: [Option<&'a [u8]>; OBJECT_COUNT],
}

impl<'a> DeviceIdentity<'a> {
    pub fn new(vendor_name: &'a str, product_code: &'a str, revision: &'a str) -> Self {
        let mut objects = [None; OBJECT_COUNT];
        objects[object::VENDOR_NAME as usize] = Some(vendor_name.as_bytes());
        objects[object::PRODUCT_CODE as usize] = Some(product_code.as_bytes());
        objects[object::MAJOR_MINOR_REVISION as usize] = Some(revision.as_bytes());
        let identity = Self { objects };
        identity.assert_lengths();
        identity
    }

    pub fn with_vendor_url(self, url: &'a str) -> Self {
        self.with_object(object::VENDOR_URL, url)
    }

    pub fn with_product_name(self, name: &'a str) -> Self {
        self.with_object(object::PRODUCT_NAME, name)
    }

    pub fn with_model_name(self, name: &'a str) -> Self {
        self.with_object(object::MODEL_NAME, name)
    }

    pub fn with_user_application_name(self, name: &'a str) -> Self {
        self.with_object(object::USER_APPLICATION_NAME, name)
    }

    fn with_object(mut self, id: u8, value: &'a str) -> Self {
        self.objects[id as usize] = Some(value.as_bytes());
        self.assert_lengths();
        self
    }

    fn assert_lengths(&self) {
        debug_assert!(self
            .objects
            .iter()
            .flatten()
            .all(|bytes| bytes.len() <= MAX_OBJECT_LEN));
    }

    /// Conformity level: basic or regular, with individual access OR-ed in.
    pub fn conformity_level(&self) -> u8 {
        let regular = self.objects[object::VENDOR_URL as usize..]
            .iter()
            .any(Option::is_some);
        let category = if regular {
            CONFORMITY_REGULAR
        } else {
            CONFORMITY_BASIC
        };
        category | INDIVIDUAL_ACCESS
    }

    pub(crate) fn object(&self, id: u8) -> Option<&'a [u8]> {
        self.objects.get(id as usize).copied().flatten()
    }

    pub(crate) fn last_object_id(&self) -> u8 {
        // objects 0-2 always exist
        (0..OBJECT_COUNT as u8)
            .rev()
            .find(|&id| self.object(id).is_some())
            .unwrap_or(object::MAJOR_MINOR_REVISION)
    }
}

/// Decode a `[MEI][read_dev_id_code][object_id]` request PDU.
pub(crate) fn parse_request(
    transaction: &mut Transaction,
    pdu: &[u8],
    identity: Option<&DeviceIdentity<'_>>,
) -> Result<()> {
    if pdu.is_empty() {
        return Err(Error::InvalidFrame);
    }
    if pdu[0] != MEI_TYPE {
        // other encapsulated interfaces are silently ignored
        return Err(Error::InvalidMei);
    }
    if pdu.len() < 3 {
        return Err(Error::InvalidFrame);
    }
    transaction.read_device_id_code = pdu[1];
    transaction.object_id = pdu[2];

    let Some(identity) = identity else {
        transaction.raise(ExceptionCode::IllegalDataValue);
        return Ok(());
    };
    if !(READ_BASIC..=READ_INDIVIDUAL).contains(&transaction.read_device_id_code) {
        transaction.raise(ExceptionCode::IllegalDataValue);
        return Ok(());
    }
    if transaction.object_id > identity.last_object_id() {
        transaction.raise(ExceptionCode::IllegalDataAddress);
        return Ok(());
    }
    if transaction.read_device_id_code == READ_INDIVIDUAL
        && identity.object(transaction.object_id).is_none()
    {
        transaction.raise(ExceptionCode::IllegalDataAddress);
    }
    Ok(())
}

/// Append the Device Identification response body to `response`.
pub(crate) fn build_response(
    response: &mut ResponseFrame,
    transaction: &Transaction,
    identity: &DeviceIdentity<'_>,
) -> Result<()> {
    let scope_end = match transaction.read_device_id_code {
        READ_BASIC => object::MAJOR_MINOR_REVISION,
        READ_INDIVIDUAL => transaction.object_id,
        // no extended objects exist, so the extended stream ends with the
        // regular category as well
        _ => object::USER_APPLICATION_NAME,
    };

    let mut packed = heapless::Vec::<u8, OBJECT_COUNT>::new();
    let mut used = BODY_HEADER_LEN;
    let mut more_follows = 0x00;
    let mut next_object_id = 0x00;
    for id in transaction.object_id..=scope_end {
        let Some(bytes) = identity.object(id) else {
            continue;
        };
        if used + 2 + bytes.len() > BODY_CAPACITY {
            more_follows = 0xFF;
            next_object_id = id;
            break;
        }
        used += 2 + bytes.len();
        packed.push(id).ok();
    }

    response.push(MEI_TYPE)?;
    response.push(transaction.read_device_id_code)?;
    response.push(identity.conformity_level())?;
    response.push(more_follows)?;
    response.push(next_object_id)?;
    response.push(packed.len() as u8)?;
    for &id in &packed {
        let Some(bytes) = identity.object(id) else {
            continue;
        };
        response.push(id)?;
        response.push(bytes.len() as u8)?;
        response.extend(bytes)?;
    }
    Ok(())
}
