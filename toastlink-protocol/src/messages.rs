//! Bridge message definitions and their textual payloads
//!
//! Two message families travel over the link:
//!
//! - [`OutboundMessage`]: host → device. A `;`-joined record whose first
//!   field is the [`OutboundType`] code. Free-text fields are not escaped.
//! - [`InboundMessage`]: device → host. A table of seven field lengths, each
//!   terminated by `;`, followed by the seven field values concatenated.
//!   Lengths count UTF-16 code units, which is how the device measures text.

use std::fmt;

/// Number of fields carried by every inbound message
pub const INBOUND_FIELD_COUNT: usize = 7;

/// Separator between fields of textual payloads
const SEPARATOR: char = ';';

/// Errors raised while parsing a single message payload
///
/// A payload error only invalidates the message it was found in; the
/// framing around it is intact and the stream can continue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("unknown message type {0:?}")]
    UnknownType(String),

    #[error("{message} message is missing its {field} field")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    #[error("{message} message has unexpected trailing data")]
    UnexpectedField { message: &'static str },

    #[error("length table ends after {found} of 7 entries")]
    TruncatedLengthTable { found: usize },

    #[error("invalid length {value:?} for field {index}")]
    InvalidLength { index: usize, value: String },

    #[error("field {index} runs past the end of the payload")]
    FieldOverrun { index: usize },

    #[error("field {index} ends inside a surrogate pair")]
    FieldBoundary { index: usize },

    #[error("{extra} unexpected UTF-16 units after the last field")]
    TrailingData { extra: usize },

    #[error("unknown action type {0:?}")]
    UnknownAction(String),
}

/// Type code leading every outbound payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutboundType {
    /// Notification gone; with a third field it carries a reply instead
    Remove = 0,
    Add = 1,
    Move = 2,
    /// Ask the device to open the app behind a mirrored notification
    Open = 3,
}

impl OutboundType {
    /// Numeric wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OutboundType {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Remove),
            1 => Ok(Self::Add),
            2 => Ok(Self::Move),
            3 => Ok(Self::Open),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

/// Message sent from the host bridge to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// A host notification disappeared, or a device notification/call
    /// should be dismissed on the device (`id` is then the device key)
    Remove { id: String },
    /// A new host notification
    Add {
        id: String,
        app_name: String,
        title: String,
        body: String,
    },
    /// A host notification changed position in the newest-first order
    Move { id: String },
    /// Open the app behind a device notification
    Open { key: String },
    /// Send a text reply to the sender behind a device key
    Reply { key: String, text: String },
}

impl OutboundMessage {
    pub fn remove(id: impl ToString) -> Self {
        Self::Remove { id: id.to_string() }
    }

    pub fn add(
        id: impl ToString,
        app_name: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Add {
            id: id.to_string(),
            app_name: app_name.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn moved(id: impl ToString) -> Self {
        Self::Move { id: id.to_string() }
    }

    pub fn open(key: impl Into<String>) -> Self {
        Self::Open { key: key.into() }
    }

    pub fn reply(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Reply {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Wire type code of this message
    pub fn message_type(&self) -> OutboundType {
        match self {
            Self::Remove { .. } | Self::Reply { .. } => OutboundType::Remove,
            Self::Add { .. } => OutboundType::Add,
            Self::Move { .. } => OutboundType::Move,
            Self::Open { .. } => OutboundType::Open,
        }
    }

    /// Render the textual payload (without framing)
    pub fn to_payload(&self) -> String {
        self.to_string()
    }

    /// Parse a textual payload (without framing)
    ///
    /// `Add` splits into at most five fields, so any stray `;` inside the
    /// free text ends up in the body. A title containing `;` cannot be
    /// recovered; the format has no escaping.
    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        if payload.is_empty() {
            return Err(MessageError::EmptyPayload);
        }

        let (code, rest) = match payload.split_once(SEPARATOR) {
            Some((code, rest)) => (code, Some(rest)),
            None => (payload, None),
        };
        let message_type = code
            .parse::<u8>()
            .map_err(|_| MessageError::UnknownType(code.to_string()))
            .and_then(OutboundType::try_from)?;

        match message_type {
            OutboundType::Remove => {
                let rest = rest.ok_or(MessageError::MissingField {
                    message: "Remove",
                    field: "id",
                })?;
                match rest.split_once(SEPARATOR) {
                    Some((key, text)) => Ok(Self::reply(key, text)),
                    None => Ok(Self::remove(rest)),
                }
            }
            OutboundType::Add => {
                let rest = rest.ok_or(MessageError::MissingField {
                    message: "Add",
                    field: "id",
                })?;
                let mut fields = rest.splitn(4, SEPARATOR);
                let mut next = |field: &'static str| {
                    fields.next().ok_or(MessageError::MissingField {
                        message: "Add",
                        field,
                    })
                };
                let id = next("id")?;
                let app_name = next("app name")?;
                let title = next("title")?;
                let body = next("body")?;
                Ok(Self::add(id, app_name, title, body))
            }
            OutboundType::Move => single_field(rest, "Move").map(Self::moved),
            OutboundType::Open => single_field(rest, "Open").map(Self::open),
        }
    }
}

fn single_field<'a>(rest: Option<&'a str>, message: &'static str) -> Result<&'a str, MessageError> {
    let rest = rest.ok_or(MessageError::MissingField {
        message,
        field: "id",
    })?;
    if rest.contains(SEPARATOR) {
        return Err(MessageError::UnexpectedField { message });
    }
    Ok(rest)
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.message_type().code();
        match self {
            Self::Remove { id } | Self::Move { id } => write!(f, "{};{}", code, id),
            Self::Open { key } => write!(f, "{};{}", code, key),
            Self::Reply { key, text } => write!(f, "{};{};{}", code, key, text),
            Self::Add {
                id,
                app_name,
                title,
                body,
            } => write!(f, "{};{};{};{};{}", code, id, app_name, title, body),
        }
    }
}

/// Action carried by an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InboundAction {
    Remove = 0,
    Add = 1,
}

impl InboundAction {
    /// Numeric wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<&str> for InboundAction {
    type Error = MessageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "0" => Ok(Self::Remove),
            "1" => Ok(Self::Add),
            other => Err(MessageError::UnknownAction(other.to_string())),
        }
    }
}

/// Message sent from the device to the host bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub action: InboundAction,
    /// Device key; either a host notification id being dismissed remotely
    /// or the identity of a device notification (see [`crate::keys`])
    pub key: String,
    pub title: String,
    pub body: String,
    pub app_name: String,
    pub package_name: String,
    /// Non-empty when the device notification can be opened on the device
    pub content_intent: String,
}

impl InboundMessage {
    /// Build a removal for `key` with every other field empty
    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            action: InboundAction::Remove,
            key: key.into(),
            title: String::new(),
            body: String::new(),
            app_name: String::new(),
            package_name: String::new(),
            content_intent: String::new(),
        }
    }

    /// Build an addition for `key`; remaining fields start empty
    pub fn add(key: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            action: InboundAction::Add,
            title: title.into(),
            body: body.into(),
            ..Self::remove(key)
        }
    }

    pub fn with_app(mut self, app_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self.package_name = package_name.into();
        self
    }

    pub fn with_content_intent(mut self, content_intent: impl Into<String>) -> Self {
        self.content_intent = content_intent.into();
        self
    }

    /// Render the length-table payload (without framing)
    pub fn to_payload(&self) -> String {
        let action = self.action.code().to_string();
        let fields: [&str; INBOUND_FIELD_COUNT] = [
            &action,
            &self.key,
            &self.title,
            &self.body,
            &self.app_name,
            &self.package_name,
            &self.content_intent,
        ];

        let mut payload = String::new();
        for field in fields {
            payload.push_str(&field.encode_utf16().count().to_string());
            payload.push(SEPARATOR);
        }
        for field in fields {
            payload.push_str(field);
        }
        payload
    }

    /// Parse a length-table payload (without framing)
    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        if payload.is_empty() {
            return Err(MessageError::EmptyPayload);
        }

        let mut lengths = [0usize; INBOUND_FIELD_COUNT];
        let mut rest = payload;
        for (index, length) in lengths.iter_mut().enumerate() {
            let (value, tail) = rest
                .split_once(SEPARATOR)
                .ok_or(MessageError::TruncatedLengthTable { found: index })?;
            *length = value.parse().map_err(|_| MessageError::InvalidLength {
                index,
                value: value.to_string(),
            })?;
            rest = tail;
        }

        let mut fields: [&str; INBOUND_FIELD_COUNT] = [""; INBOUND_FIELD_COUNT];
        for (index, (field, &units)) in fields.iter_mut().zip(lengths.iter()).enumerate() {
            let (value, tail) = split_utf16(rest, units, index)?;
            *field = value;
            rest = tail;
        }

        if !rest.is_empty() {
            return Err(MessageError::TrailingData {
                extra: rest.encode_utf16().count(),
            });
        }

        let [action, key, title, body, app_name, package_name, content_intent] = fields;
        Ok(Self {
            action: InboundAction::try_from(action)?,
            key: key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            app_name: app_name.to_string(),
            package_name: package_name.to_string(),
            content_intent: content_intent.to_string(),
        })
    }
}

/// Split `text` after `units` UTF-16 code units
fn split_utf16(text: &str, units: usize, index: usize) -> Result<(&str, &str), MessageError> {
    let mut consumed = 0;
    for (byte_offset, ch) in text.char_indices() {
        if consumed == units {
            return Ok(text.split_at(byte_offset));
        }
        consumed += ch.len_utf16();
        if consumed > units {
            return Err(MessageError::FieldBoundary { index });
        }
    }
    if consumed == units {
        Ok((text, ""))
    } else {
        Err(MessageError::FieldOverrun { index })
    }
}
