//! Wire format of the CORE sensor: the bit-packed body-temperature
//! notification and the control-point request/response frames.
//!
//! Body-temperature notification layout (8 bytes, little endian):
//!
//! | byte | content                                      |
//! |------|----------------------------------------------|
//! | 0    | flags                                        |
//! | 1-2  | core body temperature, 0.01 °/LSB            |
//! | 3-4  | skin temperature, 0.01 °/LSB                 |
//! | 5-6  | core reserved                                |
//! | 7    | quality (bits 0-3) and HR state (bits 3-5)   |
//!
//! The temperature and reserved fields always occupy their slots; the flag
//! bits only say which of them carry a valid value.
//!
//! Control indications are `[0x02, echoed op code, result code, parameter...]`.

use nom::{
    combinator::rest,
    number::complete::{le_u16, u8},
    sequence::tuple,
    IResult,
};

use crate::error::DecodeError;
use crate::models::{ControlResponse, Measurement, Quality, ResultCode, State, TempUnit};

pub mod uuids {
    use uuid::{uuid, Uuid};

    pub const BODY_TEMP_SERVICE: Uuid = uuid!("00002100-5B1E-4347-B07C-97B514DAE121");
    pub const BODY_TEMP_MEASUREMENT: Uuid = uuid!("00002101-5B1E-4347-B07C-97B514DAE121");
    pub const CONTROL_POINT: Uuid = uuid!("00002102-5B1E-4347-B07C-97B514DAE121");
    /// Standard GATT battery level characteristic.
    pub const BATTERY_LEVEL: Uuid = uuid!("00002A19-0000-1000-8000-00805F9B34FB");
}

/// Query the number of paired heart-rate monitors. Empty request parameter.
pub const OP_GET_PAIRED_HRM_COUNT: u8 = 0x04;

/// Query the ANT+ ID of the paired heart-rate monitor at an index.
/// Request parameter: `[index]`.
pub const OP_GET_HRM_ANT_ID: u8 = 0x05;

/// Leading byte of every control-point indication.
pub const OP_RESPONSE: u8 = 0x02;

/// Size of a body-temperature notification.
pub const MEASUREMENT_LEN: usize = 8;

/// Size of a control indication without its parameter block.
pub const CONTROL_HEADER_LEN: usize = 3;

const FLAG_CORE_TEMP_PRESENT: u8 = 0x01;
const FLAG_SKIN_TEMP_PRESENT: u8 = 0x02;
const FLAG_QUALITY_AND_STATE_PRESENT: u8 = 0x04;
const FLAG_UNIT_FAHRENHEIT: u8 = 0x08;

fn measurement_fields(input: &[u8]) -> IResult<&[u8], (u8, u16, u16, u16, u8)> {
    tuple((u8, le_u16, le_u16, le_u16, u8))(input)
}

fn control_fields(input: &[u8]) -> IResult<&[u8], (u8, u8, u8, &[u8])> {
    tuple((u8, u8, u8, rest))(input)
}

fn ant_id_fields(input: &[u8]) -> IResult<&[u8], (u8, u16, u8)> {
    tuple((u8, le_u16, u8))(input)
}

/// Decode one body-temperature notification.
///
/// Total on any well-formed 8-byte buffer; trailing bytes are ignored.
pub fn decode_measurement(data: &[u8]) -> Result<Measurement, DecodeError> {
    let (_, (flags, core_raw, skin_raw, core_reserved, quality_state)) =
        measurement_fields(data).map_err(|_| DecodeError::TooShort {
            expected: MEASUREMENT_LEN,
            actual: data.len(),
        })?;

    let core_temp = (flags & FLAG_CORE_TEMP_PRESENT != 0).then(|| 0.01 * f32::from(core_raw));
    let skin_temp = (flags & FLAG_SKIN_TEMP_PRESENT != 0).then(|| 0.01 * f32::from(skin_raw));

    let (quality, state) = if flags & FLAG_QUALITY_AND_STATE_PRESENT != 0 {
        let quality_bits = quality_state & 0x0F;
        let state_bits = (quality_state & 0x38) >> 3;
        (
            Quality::from_bits(quality_bits).ok_or(DecodeError::InvalidQuality(quality_bits))?,
            State::from_bits(state_bits).ok_or(DecodeError::InvalidState(state_bits))?,
        )
    } else {
        (Quality::NotAvailable, State::NotAvailable)
    };

    let unit = if flags & FLAG_UNIT_FAHRENHEIT != 0 {
        TempUnit::Fahrenheit
    } else {
        TempUnit::Celsius
    };

    Ok(Measurement {
        core_temp,
        skin_temp,
        core_reserved,
        quality,
        state,
        unit,
    })
}

/// Decode one control-point indication into a [`ControlResponse`].
pub fn decode_control_response(data: &[u8]) -> Result<ControlResponse, DecodeError> {
    let (_, (marker, op_code, result_bits, parameter)) =
        control_fields(data).map_err(|_| DecodeError::TooShort {
            expected: CONTROL_HEADER_LEN,
            actual: data.len(),
        })?;

    if marker != OP_RESPONSE {
        return Err(DecodeError::NotAResponse(marker));
    }

    let result =
        ResultCode::from_bits(result_bits).ok_or(DecodeError::InvalidResultCode(result_bits))?;

    Ok(ControlResponse {
        op_code,
        result,
        parameter: parameter.to_vec(),
    })
}

/// Build a control-point request frame.
pub fn encode_request(op_code: u8, parameter: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + parameter.len());
    frame.push(op_code);
    frame.extend_from_slice(parameter);
    frame
}

/// Extract the 20-bit ANT+ ID from an [`OP_GET_HRM_ANT_ID`] response
/// parameter: `[echoed index, id lo, id hi, id top nibble]`.
pub fn decode_hrm_ant_id(parameter: &[u8]) -> Result<u32, DecodeError> {
    let (_, (_index, low, top)) = ant_id_fields(parameter).map_err(|_| DecodeError::TooShort {
        expected: 4,
        actual: parameter.len(),
    })?;

    Ok(u32::from(low) | (u32::from(top & 0x0F) << 16))
}

/// Decode the battery level characteristic value (percent, 0-100).
pub fn decode_battery_level(data: &[u8]) -> Result<u8, DecodeError> {
    data.first().copied().ok_or(DecodeError::TooShort {
        expected: 1,
        actual: 0,
    })
}
