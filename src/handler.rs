// 📤 Submission Handler - form → bridge
// Reads the inputs, validates, then either alerts or sends. Never both.

use crate::bridge::{FormSource, MainButtonStyle, WebAppBridge};
use crate::submission::{FormField, Submission, ValidationError};

/// Alert shown when a required field is empty
pub const ALERT_MESSAGE: &str = "Пожалуйста, заполните все поля!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Validation failed, the alert was shown
    Alerted(Vec<ValidationError>),
    /// The payload was handed to the bridge
    Sent(String),
}

impl HandlerOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, HandlerOutcome::Sent(_))
    }
}

/// The Mini App side of the form.
pub struct WebApp<B: WebAppBridge> {
    bridge: B,
}

impl<B: WebAppBridge> WebApp<B> {
    /// Expand to full screen and style the main button
    pub fn init(bridge: B, style: &MainButtonStyle) -> Self {
        bridge.expand();
        bridge.set_main_button_text_color(&style.text_color);
        bridge.set_main_button_color(&style.color);

        WebApp { bridge }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Handle one press of the send button.
    ///
    /// Values are read at call time; nothing is remembered between calls.
    pub fn send_data(&self, form: &impl FormSource) -> HandlerOutcome {
        let result = Submission::validate(
            form.value(FormField::Bank),
            form.value(FormField::Category),
            form.value(FormField::Percent),
        );

        let submission = match result {
            Ok(submission) => submission,
            Err(errors) => {
                self.bridge.show_alert(ALERT_MESSAGE);
                return HandlerOutcome::Alerted(errors);
            }
        };

        match submission.to_payload() {
            Ok(payload) => {
                self.bridge.send_data(&payload);
                HandlerOutcome::Sent(payload)
            }
            Err(e) => {
                tracing::error!("Could not encode submission: {:#}", e);
                self.bridge.show_alert(ALERT_MESSAGE);
                HandlerOutcome::Alerted(Vec::new())
            }
        }
    }
}
