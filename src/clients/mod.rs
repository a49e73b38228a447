/// Amazon token endpoints and Alexa Event Gateway.
pub mod amazon;
/// Errors shared by the outbound clients.
pub mod error;
/// Local light bridge.
pub mod light_bridge;
/// IFTTT Maker Webhooks.
pub mod maker;
