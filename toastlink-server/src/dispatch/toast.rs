//! Local toast model for device notifications

use toastlink_protocol::{classify_key, InboundMessage, KeyKind, OutboundMessage};

/// Placeholder body of an incoming call toast
pub const CALL_BODY: &str = "Calling...";

/// How a device notification is rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCategory {
    /// Raised by an app on the device
    Generic {
        app_name: String,
        package_name: String,
        /// The device can open the app behind the notification
        open_on_device: bool,
    },
    /// Text message
    Sms,
    /// Incoming call
    Call,
}

impl RemoteCategory {
    /// Pick the category of an inbound `Add`
    pub fn classify(message: &InboundMessage) -> Self {
        match classify_key(&message.key) {
            KeyKind::Sms => Self::Sms,
            KeyKind::Call => Self::Call,
            KeyKind::App | KeyKind::Device => Self::Generic {
                app_name: message.app_name.clone(),
                package_name: message.package_name.clone(),
                open_on_device: !message.content_intent.is_empty(),
            },
        }
    }

    /// Attribution line shown under the text
    pub fn attribution(&self) -> &str {
        match self {
            Self::Generic { app_name, .. } => app_name,
            Self::Sms => "SMS",
            Self::Call => "Incoming call",
        }
    }

    /// Header grouping toasts of the same source
    pub fn header(&self) -> ToastHeader {
        let id = match self {
            Self::Generic { package_name, .. } => package_name.as_str(),
            Self::Sms => "sms",
            Self::Call => "call",
        };
        ToastHeader {
            id: id.to_string(),
            title: self.attribution().to_string(),
        }
    }

    /// Body to display in place of the device-supplied one
    pub fn body_override(&self) -> Option<&'static str> {
        match self {
            Self::Call => Some(CALL_BODY),
            _ => None,
        }
    }

    pub fn scenario(&self) -> ToastScenario {
        match self {
            Self::Call => ToastScenario::IncomingCall,
            _ => ToastScenario::Default,
        }
    }
}

/// Toast header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastHeader {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastScenario {
    Default,
    IncomingCall,
}

/// Buttons a toast can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastAction {
    Open,
    Reply,
    DismissCall,
}

impl ToastAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open on device",
            Self::Reply => "Reply",
            Self::DismissCall => "Dismiss call",
        }
    }
}

/// Everything the toast surface needs to display a device notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Local id of the remote notification; used to withdraw the toast
    pub tag: u64,
    /// Activation argument handed back on interaction (the device key)
    pub argument: String,
    pub title: String,
    pub body: String,
    pub attribution: String,
    pub header: ToastHeader,
    /// Show a text box for a reply
    pub reply_box: bool,
    pub actions: Vec<ToastAction>,
    pub scenario: ToastScenario,
}

impl Toast {
    /// Render `message` as the toast tagged `tag`
    pub fn render(tag: u64, message: &InboundMessage) -> Self {
        let category = RemoteCategory::classify(message);
        let reply_box = classify_key(&message.key).accepts_reply();

        let mut actions = Vec::new();
        if let RemoteCategory::Generic {
            open_on_device: true,
            ..
        } = category
        {
            actions.push(ToastAction::Open);
        }
        if reply_box {
            actions.push(ToastAction::Reply);
        }
        if category == RemoteCategory::Call {
            actions.push(ToastAction::DismissCall);
        }

        Self {
            tag,
            argument: message.key.clone(),
            title: message.title.clone(),
            body: category
                .body_override()
                .map(str::to_string)
                .unwrap_or_else(|| message.body.clone()),
            attribution: category.attribution().to_string(),
            header: category.header(),
            reply_box,
            actions,
            scenario: category.scenario(),
        }
    }

    pub fn has_action(&self, action: ToastAction) -> bool {
        self.actions.contains(&action)
    }
}

/// A user interaction with a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastActivation {
    Open { key: String },
    Reply { key: String, text: String },
    DismissCall { key: String },
}

impl ToastActivation {
    /// Decode the activation argument and any text the user typed
    ///
    /// Device keys carry a reply when there is input and dismiss the call
    /// otherwise; every other key opens the app on the device.
    pub fn from_arguments(argument: &str, user_input: Option<&str>) -> Option<Self> {
        if argument.is_empty() {
            return None;
        }

        let key = argument.to_string();
        let activation = if toastlink_protocol::is_device_key(argument) {
            match user_input {
                Some(text) => Self::Reply {
                    key,
                    text: text.to_string(),
                },
                None => Self::DismissCall { key },
            }
        } else {
            Self::Open { key }
        };
        Some(activation)
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Open { key } | Self::Reply { key, .. } | Self::DismissCall { key } => key,
        }
    }

    /// Command to send to the device
    pub fn to_command(&self) -> OutboundMessage {
        match self {
            Self::Open { key } => OutboundMessage::open(key.clone()),
            Self::Reply { key, text } => OutboundMessage::reply(key.clone(), text.clone()),
            Self::DismissCall { key } => OutboundMessage::remove(key),
        }
    }
}
