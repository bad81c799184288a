use crate::transport::{TransportError, TransportSignal};

/// What a failed send means for the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDisposition {
    /// Flood signal from the platform. Fatal to the current batch, not the
    /// process: the identity is marked limited and remaining recipients wait
    /// for a future cycle.
    RateLimited,
    /// The recipient identifier does not resolve to a reachable account.
    /// Disqualifies that one recipient permanently, never the batch.
    InvalidRecipient,
    /// Anything else. State is left untouched so the recipient stays
    /// eligible next cycle.
    Transient,
}

/// Conservative mapping from transport failure codes to dispositions.
/// Ambiguity must land on `Transient`: misreading a failure as
/// `RateLimited` aborts a whole batch, and misreading it as
/// `InvalidRecipient` permanently drops a possibly valid recipient.
pub fn classify(err: &TransportError) -> SendDisposition {
    match err.signal {
        TransportSignal::FloodWait
        | TransportSignal::PeerFlood
        | TransportSignal::TooManyRequests => SendDisposition::RateLimited,

        TransportSignal::UsernameInvalid
        | TransportSignal::UsernameNotOccupied
        | TransportSignal::PeerIdInvalid => SendDisposition::InvalidRecipient,

        TransportSignal::ConnectionFailed
        | TransportSignal::Timeout
        | TransportSignal::Internal => SendDisposition::Transient,
    }
}
