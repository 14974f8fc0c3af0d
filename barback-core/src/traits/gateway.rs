//! Messaging gateway publish contract

/// Outbound half of the messaging gateway
///
/// The firmware implements this on top of its MQTT session. Topic names and
/// the retained flag are chosen by the caller.
pub trait StatusPublisher {
    /// Transport error
    type Error;

    /// Publish a payload on a topic
    fn publish(&mut self, topic: &str, payload: &[u8], retained: bool) -> Result<(), Self::Error>;
}
