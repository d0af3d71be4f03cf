use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::transport::{NotificationHandler, Transport, TransportError};

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// One GATT write recorded by [`MockTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFrame {
    pub characteristic: Uuid,
    pub payload: Vec<u8>,
    pub confirmed: bool,
}

/// In-memory transport standing in for the platform BLE stack.
///
/// Tests inject notifications with [`deliver`](MockTransport::deliver),
/// preload readable values, and script request/indication exchanges with
/// [`respond_with`](MockTransport::respond_with).
#[derive(Default)]
pub struct MockTransport {
    handlers: Mutex<HashMap<Uuid, NotificationHandler>>,
    writes: Mutex<Vec<WrittenFrame>>,
    readable: Mutex<HashMap<Uuid, Vec<u8>>>,
    responders: Mutex<HashMap<Uuid, Responder>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload the value returned by [`Transport::read`] for a characteristic.
    pub fn set_readable(&self, characteristic: Uuid, value: Vec<u8>) {
        lock(&self.readable).insert(characteristic, value);
    }

    /// Script the peripheral side of a characteristic: every write to it is
    /// passed to `responder`, and a `Some` return is delivered back through
    /// the subscribed handler as an indication.
    pub fn respond_with<F>(&self, characteristic: Uuid, responder: F)
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        lock(&self.responders).insert(characteristic, Box::new(responder));
    }

    /// Push a notification to the subscribed handler, as the peripheral
    /// would. Returns false when nothing is subscribed.
    pub fn deliver(&self, characteristic: Uuid, value: &[u8]) -> bool {
        let handlers = lock(&self.handlers);
        match handlers.get(&characteristic) {
            Some(handler) => {
                handler(value);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, characteristic: Uuid) -> bool {
        lock(&self.handlers).contains_key(&characteristic)
    }

    pub fn writes(&self) -> Vec<WrittenFrame> {
        lock(&self.writes).clone()
    }
}

impl Transport for MockTransport {
    fn subscribe(
        &self,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<(), TransportError> {
        lock(&self.handlers).insert(characteristic, handler);
        Ok(())
    }

    fn unsubscribe(&self, characteristic: Uuid) -> Result<(), TransportError> {
        lock(&self.handlers).remove(&characteristic);
        Ok(())
    }

    fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
        confirmed: bool,
    ) -> Result<(), TransportError> {
        lock(&self.writes).push(WrittenFrame {
            characteristic,
            payload: payload.to_vec(),
            confirmed,
        });

        let response = lock(&self.responders)
            .get(&characteristic)
            .and_then(|responder| responder(payload));
        if let Some(value) = response {
            self.deliver(characteristic, &value);
        }
        Ok(())
    }

    fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, TransportError> {
        lock(&self.readable)
            .get(&characteristic)
            .cloned()
            .ok_or(TransportError::CharacteristicNotFound(characteristic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::uuid;

    const CHARACTERISTIC: Uuid = uuid!("00002101-5B1E-4347-B07C-97B514DAE121");

    #[test]
    fn test_deliver_reaches_subscribed_handler() {
        let transport = MockTransport::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        assert!(!transport.deliver(CHARACTERISTIC, &[1, 2, 3]));

        transport
            .subscribe(
                CHARACTERISTIC,
                Box::new(move |_: &[u8]| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(transport.deliver(CHARACTERISTIC, &[1, 2, 3]));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        transport.unsubscribe(CHARACTERISTIC).unwrap();
        assert!(!transport.deliver(CHARACTERISTIC, &[1, 2, 3]));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_write_is_recorded_and_answered() {
        let transport = MockTransport::new();
        let echoed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&echoed);

        transport
            .subscribe(
                CHARACTERISTIC,
                Box::new(move |value: &[u8]| {
                    lock(&sink).push(value.to_vec());
                }),
            )
            .unwrap();
        transport.respond_with(CHARACTERISTIC, |request| {
            Some(vec![0xAA, request[0]])
        });

        transport.write(CHARACTERISTIC, &[0x04], true).unwrap();

        assert_eq!(
            transport.writes(),
            vec![WrittenFrame {
                characteristic: CHARACTERISTIC,
                payload: vec![0x04],
                confirmed: true,
            }]
        );
        assert_eq!(lock(&echoed).clone(), vec![vec![0xAA, 0x04]]);
    }

    #[test]
    fn test_read_requires_preloaded_value() {
        let transport = MockTransport::new();
        assert_eq!(
            transport.read(CHARACTERISTIC),
            Err(TransportError::CharacteristicNotFound(CHARACTERISTIC))
        );

        transport.set_readable(CHARACTERISTIC, vec![87]);
        assert_eq!(transport.read(CHARACTERISTIC).unwrap(), vec![87]);
    }
}
