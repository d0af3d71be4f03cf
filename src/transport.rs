use thiserror::Error;
use uuid::Uuid;

/// Callback invoked with the raw value of each notification or indication.
pub type NotificationHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// GATT operations supplied by the platform BLE stack for an already
/// connected peripheral. Discovery, pairing and reconnection live behind
/// this seam.
pub trait Transport: Send + Sync {
    fn subscribe(
        &self,
        characteristic: Uuid,
        handler: NotificationHandler,
    ) -> Result<(), TransportError>;

    fn unsubscribe(&self, characteristic: Uuid) -> Result<(), TransportError>;

    fn write(
        &self,
        characteristic: Uuid,
        payload: &[u8],
        confirmed: bool,
    ) -> Result<(), TransportError>;

    fn read(&self, characteristic: Uuid) -> Result<Vec<u8>, TransportError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("peripheral not connected")]
    NotConnected,

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("read failed: {0}")]
    ReadFailed(String),
}
