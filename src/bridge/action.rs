use crate::bridge::message::SharedMessage;

/// Something an actor asks its session to carry out, either on its IRC
/// connection or on the relay bus.
#[derive(Debug, Clone)]
pub enum Action {
    Join { channel: String },
    Publish(SharedMessage),
    SendMessage { channel: String, text: String },
    SetTopic { channel: String, text: String },
}
