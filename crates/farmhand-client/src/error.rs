/// Errors that can occur at the network client boundary.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The operation needs an established connection and there isn't one.
    #[error("not connected")]
    NotConnected,

    /// Sending a message to the service failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The service would not issue a login challenge.
    #[error("challenge refused: {0}")]
    ChallengeRefused(String),

    /// The in-flight challenge login was dropped by the client.
    #[error("challenge login abandoned")]
    ChallengeAbandoned,
}
