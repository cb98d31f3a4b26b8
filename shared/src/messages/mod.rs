pub mod message_sink;
pub mod network_message;
pub mod outbox;
