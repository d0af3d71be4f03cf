use crate::error::Error;

/// One decoded body-temperature notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub core_temp: Option<f32>,
    pub skin_temp: Option<f32>,
    pub core_reserved: u16,
    pub quality: Quality,
    pub state: State,
    pub unit: TempUnit,
}

/// Signal quality of the core temperature estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    Invalid,
    Poor,
    Fair,
    Good,
    Excellent,
    NotAvailable,
}

impl Quality {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Quality::Invalid),
            1 => Some(Quality::Poor),
            2 => Some(Quality::Fair),
            3 => Some(Quality::Good),
            4 => Some(Quality::Excellent),
            5 => Some(Quality::NotAvailable),
            _ => None,
        }
    }
}

/// Heart-rate monitor pairing state reported alongside the quality bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    PairingHr,
    HrSupportedNotPaired,
    HrSupportedPaired,
    NotAvailable,
}

impl State {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(State::PairingHr),
            1 => Some(State::HrSupportedNotPaired),
            2 => Some(State::HrSupportedPaired),
            4 => Some(State::NotAvailable),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

impl std::fmt::Display for TempUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TempUnit::Celsius => write!(f, "°C"),
            TempUnit::Fahrenheit => write!(f, "°F"),
        }
    }
}

/// Outcome of a control-point request, decoded from one indication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlResponse {
    /// Operation code echoed back from the request.
    pub op_code: u8,
    pub result: ResultCode,
    /// Opcode-specific payload, possibly empty.
    pub parameter: Vec<u8>,
}

impl ControlResponse {
    /// Consume the response, failing unless the peripheral reported success.
    pub fn require_success(self) -> Result<Self, Error> {
        if self.result == ResultCode::Success {
            Ok(self)
        } else {
            Err(Error::OperationFailed {
                op_code: self.op_code,
                result: self.result,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    OpCodeNotSupported,
    InvalidParameter,
    OperationFailed,
}

impl ResultCode {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(ResultCode::Success),
            2 => Some(ResultCode::OpCodeNotSupported),
            3 => Some(ResultCode::InvalidParameter),
            4 => Some(ResultCode::OperationFailed),
            _ => None,
        }
    }
}
