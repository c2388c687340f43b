use mrl_core::ChainCommunicationError;

#[derive(Debug, thiserror::Error)]
pub enum LanderError {
    #[error("Completion queue is closed")]
    QueueClosed,
    #[error("Chain communication error {0}")]
    ChainCommunicationError(#[from] ChainCommunicationError),
    #[error("{0}")]
    EyreError(#[from] eyre::Report),
}
