// Messages exchanged with the relay. The relay speaks JSON: every object carries an integer
// `type` tag, and a single frame may hold either one object or an array of them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;


// `command` values of a control message.
pub const COMMAND_GENERIC: i64 = 0;
pub const COMMAND_LOGIN: i64 = 1;
pub const COMMAND_DISCONNECT: i64 = 2;

// Move placeholder used by the relay when a position is sent without a move.
pub const NO_MOVE: &str = "none";

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MessageType {
    Control,
    ChannelTell,
    PrivateTell,
    GameMove,
    GameStart,
    GameEnd,
    Unknown,
}

impl MessageType {
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(MessageType::Control),
            1 => Some(MessageType::ChannelTell),
            2 => Some(MessageType::PrivateTell),
            3 => Some(MessageType::GameMove),
            4 => Some(MessageType::GameStart),
            5 => Some(MessageType::GameEnd),
            6 => Some(MessageType::Unknown),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            MessageType::Control => 0,
            MessageType::ChannelTell => 1,
            MessageType::PrivateTell => 2,
            MessageType::GameMove => 3,
            MessageType::GameStart => 4,
            MessageType::GameEnd => 5,
            MessageType::Unknown => 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    Json(String),
    NotAnObject,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Control {
    pub command: i64,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChannelTell {
    // The relay sends channel numbers as strings, but accept plain numbers too.
    #[serde(deserialize_with = "string_or_number")]
    pub channel: String,
    pub handle: String,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrivateTell {
    pub handle: String,
    pub text: String,
}

// Position update for a game the user plays or observes.
//
// `role` follows the chess server convention: 1 means it is now the local player's move, -1 means
// it is the opponent's move, 0 means the user is only observing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameMove {
    // Board part of a FEN string: eight ranks, rank 8 first.
    pub fen: String,
    // Side to move: "W" or "B".
    pub turn: String,
    pub game: i64,
    pub wname: String,
    pub bname: String,
    pub role: i64,
    pub time: i64,
    pub inc: i64,
    pub wtime: i64,
    pub btime: i64,
    // Last move in algebraic notation or `NO_MOVE`.
    #[serde(rename = "move")]
    pub move_text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameStart {
    pub id: i64,
    pub playerone: String,
    pub playertwo: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameEnd {
    pub id: i64,
    pub winner: String,
    pub loser: String,
    // 0 resign, 1 disconnect, 2 checkmate, 3 time forfeit; 4 and above are not decisive.
    pub reason: i64,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FreeText {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    Control(Control),
    ChannelTell(ChannelTell),
    PrivateTell(PrivateTell),
    GameMove(GameMove),
    GameStart(GameStart),
    GameEnd(GameEnd),
    // Unrecognized or missing tag: a raw chess server line.
    Unknown(FreeText),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    Control { command: i64, text: String },
}

impl Default for GameMove {
    fn default() -> Self {
        GameMove {
            fen: String::new(),
            turn: String::new(),
            game: 0,
            wname: String::new(),
            bname: String::new(),
            role: 0,
            time: 0,
            inc: 0,
            wtime: 0,
            btime: 0,
            move_text: NO_MOVE.to_owned(),
        }
    }
}

impl GameMove {
    pub fn has_move(&self) -> bool { !self.move_text.is_empty() && self.move_text != NO_MOVE }
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::Control(_) => MessageType::Control,
            ServerMessage::ChannelTell(_) => MessageType::ChannelTell,
            ServerMessage::PrivateTell(_) => MessageType::PrivateTell,
            ServerMessage::GameMove(_) => MessageType::GameMove,
            ServerMessage::GameStart(_) => MessageType::GameStart,
            ServerMessage::GameEnd(_) => MessageType::GameEnd,
            ServerMessage::Unknown(_) => MessageType::Unknown,
        }
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let Value::Object(ref fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };
        let tag = fields.get("type").and_then(Value::as_i64).and_then(MessageType::from_tag);
        Ok(match tag {
            Some(MessageType::Control) => ServerMessage::Control(from_payload(value)?),
            Some(MessageType::ChannelTell) => ServerMessage::ChannelTell(from_payload(value)?),
            Some(MessageType::PrivateTell) => ServerMessage::PrivateTell(from_payload(value)?),
            Some(MessageType::GameMove) => ServerMessage::GameMove(from_payload(value)?),
            Some(MessageType::GameStart) => ServerMessage::GameStart(from_payload(value)?),
            Some(MessageType::GameEnd) => ServerMessage::GameEnd(from_payload(value)?),
            Some(MessageType::Unknown) | None => ServerMessage::Unknown(from_payload(value)?),
        })
    }
}

impl ClientMessage {
    pub fn command(text: impl Into<String>) -> Self {
        ClientMessage::Control { command: COMMAND_GENERIC, text: text.into() }
    }
    pub fn login(text: impl Into<String>) -> Self {
        ClientMessage::Control { command: COMMAND_LOGIN, text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            ClientMessage::Control { text, .. } => text,
        }
    }
}

impl Serialize for ClientMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct WireControl<'a> {
            #[serde(rename = "type")]
            kind: u8,
            command: i64,
            text: &'a str,
        }
        match self {
            ClientMessage::Control { command, text } => WireControl {
                kind: MessageType::Control.tag(),
                command: *command,
                text,
            }
            .serialize(serializer),
        }
    }
}

// Decodes one websocket frame into messages, preserving order. A `null` frame carries nothing.
pub fn decode_frame(frame: &str) -> Result<Vec<ServerMessage>, ProtocolError> {
    let value: Value =
        serde_json::from_str(frame).map_err(|err| ProtocolError::Json(err.to_string()))?;
    match value {
        Value::Null => Ok(vec![]),
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(ServerMessage::from_value)
            .collect(),
        value => Ok(vec![ServerMessage::from_value(value)?]),
    }
}

fn from_payload<T: DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|err| ProtocolError::Json(err.to_string()))
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn array_frame_fans_out_in_order() {
        let frame = r#"[
            {"type": 1, "channel": "53", "handle": "alice", "text": "hi"},
            {"type": 2, "handle": "bob", "text": "hello"},
            {"type": 6, "text": "Style 12 set."}
        ]"#;
        let messages = decode_frame(frame).unwrap();
        assert_eq!(
            messages.iter().map(ServerMessage::message_type).collect::<Vec<_>>(),
            vec![MessageType::ChannelTell, MessageType::PrivateTell, MessageType::Unknown]
        );
    }

    #[test]
    fn channel_may_be_a_number() {
        let messages = decode_frame(r#"{"type": 1, "channel": 4, "handle": "x", "text": "y"}"#);
        let ServerMessage::ChannelTell(tell) = &messages.unwrap()[0] else {
            panic!("expected a channel tell");
        };
        assert_eq!(tell.channel, "4");
    }

    #[test]
    fn missing_or_unrecognized_tag_is_free_text() {
        for frame in [r#"{"text": "abc"}"#, r#"{"type": 42, "text": "abc"}"#] {
            assert_eq!(
                decode_frame(frame).unwrap(),
                vec![ServerMessage::Unknown(FreeText { text: "abc".to_owned() })]
            );
        }
    }

    #[test]
    fn game_move_fields() {
        let frame = r#"{"type": 3, "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
            "turn": "B", "game": 117, "wname": "alice", "bname": "bob", "role": -1,
            "time": 5, "inc": 0, "wtime": 300, "btime": 300, "move": "e4"}"#;
        let ServerMessage::GameMove(game_move) = &decode_frame(frame).unwrap()[0] else {
            panic!("expected a game move");
        };
        assert_eq!(game_move.role, -1);
        assert_eq!(game_move.move_text, "e4");
        assert!(game_move.has_move());
        assert_eq!(game_move.wtime, 300);
    }

    #[test]
    fn absent_move_defaults_to_placeholder() {
        let ServerMessage::GameMove(game_move) = &decode_frame(r#"{"type": 3}"#).unwrap()[0]
        else {
            panic!("expected a game move");
        };
        assert_eq!(game_move.move_text, NO_MOVE);
        assert!(!game_move.has_move());
    }

    #[test]
    fn malformed_frames() {
        assert!(matches!(decode_frame("{not json"), Err(ProtocolError::Json(_))));
        assert_eq!(decode_frame("17"), Err(ProtocolError::NotAnObject));
        assert_eq!(decode_frame("null"), Ok(vec![]));
    }

    #[test]
    fn client_message_wire_format() {
        let json = serde_json::to_value(ClientMessage::command("e2-e4")).unwrap();
        assert_eq!(json, serde_json::json!({"type": 0, "command": 0, "text": "e2-e4"}));
        let json = serde_json::to_value(ClientMessage::login("[alice]")).unwrap();
        assert_eq!(json, serde_json::json!({"type": 0, "command": 1, "text": "[alice]"}));
    }
}
