use crate::connection::UserId;
use crate::error::{Error, Result};
use serde::Serialize;

/// Comment frame written by the heartbeat. Conforming clients ignore it.
pub const HEARTBEAT_FRAME: &str = ":heartbeat\n\n";

/// An immutable event: optional name plus its JSON-serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: Option<String>,
    data: String,
}

impl Event {
    /// Serialize `data` and validate `name`.
    ///
    /// An empty name is treated as no name. A name containing a line break is
    /// rejected since it would end the `event:` line early.
    pub fn new<T>(name: Option<&str>, data: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let name = match name {
            Some(name) if name.contains(|c: char| c == '\n' || c == '\r') => {
                return Err(Error::InvalidEventName(name.to_string()))
            }
            Some("") | None => None,
            Some(name) => Some(name.to_string()),
        };

        Ok(Self {
            name,
            data: serde_json::to_string(data)?,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The serialized JSON payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Render the event in text/event-stream framing.
    ///
    /// ```text
    /// event: <name>\n      (only when named)
    /// data: <json>\n
    /// \n
    /// ```
    pub fn to_frame(&self) -> String {
        match &self.name {
            Some(name) => format!("event: {}\ndata: {}\n\n", name, self.data),
            None => format!("data: {}\n\n", self.data),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to the live connection of a specific user
    User { user_id: UserId },
    /// Send to all connected users
    Broadcast,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unnamed_event_omits_event_line() {
        let event = Event::new(None, &json!({"message": "Hello"})).unwrap();
        assert_eq!(event.to_frame(), "data: {\"message\":\"Hello\"}\n\n");
    }

    #[test]
    fn test_named_event_puts_event_line_first() {
        let event = Event::new(Some("greeting"), &json!({"message": "Hi"})).unwrap();
        assert_eq!(
            event.to_frame(),
            "event: greeting\ndata: {\"message\":\"Hi\"}\n\n"
        );
    }

    #[test]
    fn test_empty_event_name_is_treated_as_absent() {
        let event = Event::new(Some(""), "Hi").unwrap();
        assert_eq!(event.name(), None);
        assert_eq!(event.to_frame(), "data: \"Hi\"\n\n");
    }

    #[test]
    fn test_event_name_with_line_break_is_rejected() {
        let result = Event::new(Some("evil\ndata: injected"), &json!(1));
        assert!(matches!(result, Err(Error::InvalidEventName(_))));
    }

    #[test]
    fn test_multiline_string_payload_stays_on_one_data_line() {
        let event = Event::new(None, "line one\nline two").unwrap();
        assert_eq!(event.to_frame(), "data: \"line one\\nline two\"\n\n");
    }

    #[test]
    fn test_struct_payload_keeps_field_order() {
        #[derive(Serialize)]
        struct Update {
            zeta: u8,
            alpha: u8,
        }

        let event = Event::new(None, &Update { zeta: 1, alpha: 2 }).unwrap();
        assert_eq!(event.data(), "{\"zeta\":1,\"alpha\":2}");
    }
}
