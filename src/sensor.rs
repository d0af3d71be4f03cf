//! Client facade for one connected CORE sensor.
//!
//! Wraps an already-connected [`Transport`] with the protocol layer: the
//! body-temperature notification stream on one characteristic and the
//! control-point request/response exchange on another.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, warn};

use crate::control::ControlChannel;
use crate::error::{DecodeError, Error};
use crate::models::Measurement;
use crate::protocol::{self, uuids};
use crate::transport::Transport;

/// Callback receiving each decoded [`Measurement`].
pub type MeasurementSink = Arc<dyn Fn(Measurement) + Send + Sync>;

pub struct CoreSensor<T: Transport> {
    transport: T,
    control: Arc<ControlChannel>,
    sink: Arc<Mutex<Option<MeasurementSink>>>,
    listening: AtomicBool,
    request_timeout: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> CoreSensor<T> {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Take over a connected transport. Subscribes the control point right
    /// away; the correlator lives and dies with this client.
    pub fn new(transport: T) -> Result<Self, Error> {
        let control = Arc::new(ControlChannel::new());

        let relay = Arc::clone(&control);
        transport.subscribe(
            uuids::CONTROL_POINT,
            Box::new(move |data: &[u8]| {
                if let Err(err) = relay.on_indication(data) {
                    warn!("dropping control indication: {err}");
                }
            }),
        )?;

        Ok(Self {
            transport,
            control,
            sink: Arc::new(Mutex::new(None)),
            listening: AtomicBool::new(false),
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Register the measurement callback, replacing any previous one.
    ///
    /// Notifications decoded before a sink is registered are dropped.
    pub fn set_measurement_sink<F>(&self, sink: F)
    where
        F: Fn(Measurement) + Send + Sync + 'static,
    {
        *lock(&self.sink) = Some(Arc::new(sink));
    }

    /// Subscribe to body-temperature notifications. Calling it again while
    /// already listening is a no-op.
    pub fn start_listening(&self) -> Result<(), Error> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sink = Arc::clone(&self.sink);
        let result = self.transport.subscribe(
            uuids::BODY_TEMP_MEASUREMENT,
            Box::new(move |data: &[u8]| {
                debug!("body temperature notification: {data:02X?}");
                let measurement = match protocol::decode_measurement(data) {
                    Ok(measurement) => measurement,
                    Err(err) => {
                        warn!("dropping body temperature notification: {err}");
                        return;
                    }
                };

                // Clone out of the slot so a sink replacing itself from
                // inside the callback cannot deadlock.
                let registered = lock(&sink).clone();
                match registered {
                    Some(callback) => {
                        if catch_unwind(AssertUnwindSafe(|| callback(measurement))).is_err() {
                            error!("measurement sink panicked");
                        }
                    }
                    None => debug!("no measurement sink registered, dropping measurement"),
                }
            }),
        );

        if result.is_err() {
            self.listening.store(false, Ordering::SeqCst);
        }
        result.map_err(Into::into)
    }

    /// Unsubscribe from body-temperature notifications. A no-op when not
    /// listening.
    pub fn stop_listening(&self) -> Result<(), Error> {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        self.transport
            .unsubscribe(uuids::BODY_TEMP_MEASUREMENT)
            .map_err(Into::into)
    }

    /// Battery charge in percent.
    pub fn get_battery_level(&self) -> Result<u8, Error> {
        let value = self.transport.read(uuids::BATTERY_LEVEL)?;
        Ok(protocol::decode_battery_level(&value)?)
    }

    /// Number of heart-rate monitors paired with the sensor.
    pub fn get_paired_hrm_count(&self) -> Result<u8, Error> {
        let response = self
            .control
            .request(
                &self.transport,
                protocol::OP_GET_PAIRED_HRM_COUNT,
                &[],
                self.request_timeout,
            )?
            .require_success()?;

        response
            .parameter
            .first()
            .copied()
            .ok_or(DecodeError::TooShort {
                expected: 1,
                actual: 0,
            })
            .map_err(Into::into)
    }

    /// ANT+ ID of the paired heart-rate monitor at `index`.
    pub fn get_hrm_ant_id(&self, index: u8) -> Result<u32, Error> {
        let response = self
            .control
            .request(
                &self.transport,
                protocol::OP_GET_HRM_ANT_ID,
                &[index],
                self.request_timeout,
            )?
            .require_success()?;

        Ok(protocol::decode_hrm_ant_id(&response.parameter)?)
    }

    /// Release any blocked control requester and drop both subscriptions.
    pub fn shutdown(&self) -> Result<(), Error> {
        self.control.close();
        let stopped = self.stop_listening();
        self.transport.unsubscribe(uuids::CONTROL_POINT)?;
        stopped
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
