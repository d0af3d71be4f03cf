pub mod control;
pub mod error;
pub mod models;
pub mod protocol;
pub mod sensor;
pub mod transport;
pub mod transport_mock;

pub use control::ControlChannel;
pub use error::{DecodeError, Error};
pub use models::{ControlResponse, Measurement, Quality, ResultCode, State, TempUnit};
pub use protocol::{decode_measurement, uuids};
pub use sensor::{CoreSensor, MeasurementSink};
pub use transport::{NotificationHandler, Transport, TransportError};
pub use transport_mock::MockTransport;
