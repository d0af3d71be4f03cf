//! Request/response correlation over the control-point characteristic.
//!
//! The peripheral answers control requests with indications on the same
//! characteristic rather than with write responses. [`ControlChannel`]
//! turns that into a synchronous call: one requester at a time writes its
//! frame, then blocks until the indication echoing its op code arrives,
//! the channel is closed, or the deadline passes.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::warn;

use crate::error::Error;
use crate::models::ControlResponse;
use crate::protocol::{self, uuids};
use crate::transport::Transport;

#[derive(Default)]
struct ChannelState {
    pending: Option<ControlResponse>,
    waiting: bool,
    closed: bool,
}

/// Correlates confirmed writes on the control point with the indications
/// answering them. At most one request is in flight per channel; concurrent
/// callers queue on the request lock.
#[derive(Default)]
pub struct ControlChannel {
    request_lock: Mutex<()>,
    state: Mutex<ChannelState>,
    wakeup: Condvar,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `[op_code] + parameter` as a confirmed write and block until
    /// the matching indication arrives.
    ///
    /// Indications echoing a different op code are logged and discarded
    /// without ending the wait. On timeout, close, or a failed write the
    /// channel is left idle and ready for the next request.
    pub fn request<T: Transport>(
        &self,
        transport: &T,
        op_code: u8,
        parameter: &[u8],
        timeout: Duration,
    ) -> Result<ControlResponse, Error> {
        let _exclusive = lock(&self.request_lock);

        {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(Error::Closed);
            }
            state.pending = None;
            // Registered before the write so an indication racing the write
            // confirmation is not treated as unsolicited.
            state.waiting = true;
        }

        let frame = protocol::encode_request(op_code, parameter);
        if let Err(err) = transport.write(uuids::CONTROL_POINT, &frame, true) {
            self.clear_waiter();
            return Err(err.into());
        }

        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.state);
        loop {
            if state.closed {
                state.waiting = false;
                return Err(Error::Closed);
            }
            if let Some(response) = state.pending.take() {
                if response.op_code == op_code {
                    state.waiting = false;
                    return Ok(response);
                }
                warn!(
                    "discarding control response for op code {:#04x} while op code {:#04x} is outstanding",
                    response.op_code, op_code
                );
            }
            let now = Instant::now();
            if now >= deadline {
                state.waiting = false;
                state.pending = None;
                return Err(Error::Timeout(timeout));
            }
            let (guard, _) = self
                .wakeup
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Feed one raw control indication from the transport.
    ///
    /// The returned error is the caller's cue to log and drop; nothing here
    /// is fatal to the delivery path.
    pub fn on_indication(&self, data: &[u8]) -> Result<(), Error> {
        let response = protocol::decode_control_response(data)?;

        let mut state = lock(&self.state);
        if state.closed {
            return Err(Error::Closed);
        }
        if !state.waiting || state.pending.is_some() {
            return Err(Error::UnsolicitedIndication);
        }
        state.pending = Some(response);
        self.wakeup.notify_one();
        Ok(())
    }

    /// Tear the channel down: any blocked requester wakes with
    /// [`Error::Closed`], later requests fail fast, and no pending response
    /// survives.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        state.pending = None;
        self.wakeup.notify_all();
    }

    fn clear_waiter(&self) {
        let mut state = lock(&self.state);
        state.waiting = false;
        state.pending = None;
    }
}
