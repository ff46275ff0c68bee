//! The closed set of protocol messages.
//!
//! Every [`MessageType`] tag maps to exactly one payload struct. Field order
//! below is wire order; each payload spells out its own encode and decode so
//! the table stays explicit and symmetric.

use crate::codec::{BinaryReader, BinaryWriter};
use crate::error::ProtocolError;
use crate::player::{Animation, Direction};
use crate::ClientId;

/// Wire tag of a message. Values are stable and versionless.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Initialize = 0,
    SpawnPlayer = 1,
    DestroyPlayer = 2,
    MovePlayer = 3,
    UpdateScore = 4,
    UpdateHighScore = 5,
    UpdateName = 6,
    Heartbeat = 7,
    Disconnect = 8,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::Initialize,
        MessageType::SpawnPlayer,
        MessageType::DestroyPlayer,
        MessageType::MovePlayer,
        MessageType::UpdateScore,
        MessageType::UpdateHighScore,
        MessageType::UpdateName,
        MessageType::Heartbeat,
        MessageType::Disconnect,
    ];
}

impl TryFrom<i32> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        usize::try_from(tag)
            .ok()
            .and_then(|index| MessageType::ALL.get(index).copied())
            .ok_or(ProtocolError::UnknownMessageType(tag))
    }
}

/// Tells a freshly accepted client which identity it was assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Initialize {
    pub id: ClientId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPlayer {
    pub id: ClientId,
    pub x: f32,
    pub y: f32,
    pub name: String,
    pub high_score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestroyPlayer {
    pub id: ClientId,
}

/// Position report from a client, relayed (or reset) by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayer {
    pub id: ClientId,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub animation: Animation,
    pub grounded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateScore {
    pub id: ClientId,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateHighScore {
    pub id: ClientId,
    pub high_score: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateName {
    pub id: ClientId,
    pub name: String,
}

/// Liveness traffic; keeps idle timers from firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat;

/// Sent by a client that is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disconnect;

/// A typed payload with a fixed wire shape.
pub trait Payload: Sized + Into<Message> {
    const TYPE: MessageType;

    fn encode(&self, w: &mut BinaryWriter);

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError>;

    /// Unwrap the payload if `message` carries this type.
    fn from_message(message: Message) -> Option<Self>;
}

impl Payload for Initialize {
    const TYPE: MessageType = MessageType::Initialize;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self { id: r.read_i32()? })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Initialize(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for SpawnPlayer {
    const TYPE: MessageType = MessageType::SpawnPlayer;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
        w.put_f32(self.x);
        w.put_f32(self.y);
        w.put_string(&self.name);
        w.put_i32(self.high_score);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            x: r.read_f32()?,
            y: r.read_f32()?,
            name: r.read_string()?,
            high_score: r.read_i32()?,
        })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::SpawnPlayer(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for DestroyPlayer {
    const TYPE: MessageType = MessageType::DestroyPlayer;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self { id: r.read_i32()? })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::DestroyPlayer(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for MovePlayer {
    const TYPE: MessageType = MessageType::MovePlayer;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
        w.put_f32(self.x);
        w.put_f32(self.y);
        w.put_u8(self.direction as u8);
        w.put_u8(self.animation as u8);
        w.put_bool(self.grounded);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            x: r.read_f32()?,
            y: r.read_f32()?,
            direction: Direction::try_from(r.read_u8()?)?,
            animation: Animation::try_from(r.read_u8()?)?,
            grounded: r.read_bool()?,
        })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::MovePlayer(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for UpdateScore {
    const TYPE: MessageType = MessageType::UpdateScore;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
        w.put_i32(self.score);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            score: r.read_i32()?,
        })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::UpdateScore(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for UpdateHighScore {
    const TYPE: MessageType = MessageType::UpdateHighScore;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
        w.put_i32(self.high_score);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            high_score: r.read_i32()?,
        })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::UpdateHighScore(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for UpdateName {
    const TYPE: MessageType = MessageType::UpdateName;

    fn encode(&self, w: &mut BinaryWriter) {
        w.put_i32(self.id);
        w.put_string(&self.name);
    }

    fn decode(r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: r.read_i32()?,
            name: r.read_string()?,
        })
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::UpdateName(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for Heartbeat {
    const TYPE: MessageType = MessageType::Heartbeat;

    fn encode(&self, _w: &mut BinaryWriter) {}

    fn decode(_r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Heartbeat)
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Heartbeat(p) => Some(p),
            _ => None,
        }
    }
}

impl Payload for Disconnect {
    const TYPE: MessageType = MessageType::Disconnect;

    fn encode(&self, _w: &mut BinaryWriter) {}

    fn decode(_r: &mut BinaryReader) -> Result<Self, ProtocolError> {
        Ok(Disconnect)
    }

    fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Disconnect(p) => Some(p),
            _ => None,
        }
    }
}

/// Any protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Initialize(Initialize),
    SpawnPlayer(SpawnPlayer),
    DestroyPlayer(DestroyPlayer),
    MovePlayer(MovePlayer),
    UpdateScore(UpdateScore),
    UpdateHighScore(UpdateHighScore),
    UpdateName(UpdateName),
    Heartbeat(Heartbeat),
    Disconnect(Disconnect),
}

macro_rules! impl_into_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(payload: $variant) -> Self {
                    Message::$variant(payload)
                }
            }
        )*
    };
}

impl_into_message!(
    Initialize,
    SpawnPlayer,
    DestroyPlayer,
    MovePlayer,
    UpdateScore,
    UpdateHighScore,
    UpdateName,
    Heartbeat,
    Disconnect,
);

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Initialize(_) => MessageType::Initialize,
            Message::SpawnPlayer(_) => MessageType::SpawnPlayer,
            Message::DestroyPlayer(_) => MessageType::DestroyPlayer,
            Message::MovePlayer(_) => MessageType::MovePlayer,
            Message::UpdateScore(_) => MessageType::UpdateScore,
            Message::UpdateHighScore(_) => MessageType::UpdateHighScore,
            Message::UpdateName(_) => MessageType::UpdateName,
            Message::Heartbeat(_) => MessageType::Heartbeat,
            Message::Disconnect(_) => MessageType::Disconnect,
        }
    }

    pub fn encode_payload(&self, w: &mut BinaryWriter) {
        match self {
            Message::Initialize(p) => p.encode(w),
            Message::SpawnPlayer(p) => p.encode(w),
            Message::DestroyPlayer(p) => p.encode(w),
            Message::MovePlayer(p) => p.encode(w),
            Message::UpdateScore(p) => p.encode(w),
            Message::UpdateHighScore(p) => p.encode(w),
            Message::UpdateName(p) => p.encode(w),
            Message::Heartbeat(p) => p.encode(w),
            Message::Disconnect(p) => p.encode(w),
        }
    }

    pub fn decode_payload(
        message_type: MessageType,
        r: &mut BinaryReader,
    ) -> Result<Self, ProtocolError> {
        Ok(match message_type {
            MessageType::Initialize => Initialize::decode(r)?.into(),
            MessageType::SpawnPlayer => SpawnPlayer::decode(r)?.into(),
            MessageType::DestroyPlayer => DestroyPlayer::decode(r)?.into(),
            MessageType::MovePlayer => MovePlayer::decode(r)?.into(),
            MessageType::UpdateScore => UpdateScore::decode(r)?.into(),
            MessageType::UpdateHighScore => UpdateHighScore::decode(r)?.into(),
            MessageType::UpdateName => UpdateName::decode(r)?.into(),
            MessageType::Heartbeat => Heartbeat::decode(r)?.into(),
            MessageType::Disconnect => Disconnect::decode(r)?.into(),
        })
    }
}
