// 🌉 Host Bridge - what the Mini App host gives us
// The host object is injected, never looked up as a global.

use crate::submission::FormField;
use std::cell::RefCell;

// ============================================================================
// HOST INTERFACES
// ============================================================================

/// Capabilities the host messaging app exposes to the form.
///
/// Every call is fire-and-forget.
pub trait WebAppBridge {
    /// Ask the host to open the app full-screen
    fn expand(&self);

    fn set_main_button_text_color(&self, color: &str);

    fn set_main_button_color(&self, color: &str);

    fn show_alert(&self, message: &str);

    /// Deliver a payload to whoever owns the host session
    fn send_data(&self, payload: &str);
}

impl<B: WebAppBridge + ?Sized> WebAppBridge for &B {
    fn expand(&self) {
        (**self).expand()
    }

    fn set_main_button_text_color(&self, color: &str) {
        (**self).set_main_button_text_color(color)
    }

    fn set_main_button_color(&self, color: &str) {
        (**self).set_main_button_color(color)
    }

    fn show_alert(&self, message: &str) {
        (**self).show_alert(message)
    }

    fn send_data(&self, payload: &str) {
        (**self).send_data(payload)
    }
}

/// Read-only view of the three form inputs.
pub trait FormSource {
    /// Current value of an input; a missing input reads as empty
    fn value(&self, field: FormField) -> String;
}

// ============================================================================
// FORM FIELDS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub bank: String,
    pub category: String,
    pub percent: String,
}

impl FormFields {
    pub fn new(
        bank: impl Into<String>,
        category: impl Into<String>,
        percent: impl Into<String>,
    ) -> Self {
        FormFields {
            bank: bank.into(),
            category: category.into(),
            percent: percent.into(),
        }
    }

    pub fn get_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Bank => &mut self.bank,
            FormField::Category => &mut self.category,
            FormField::Percent => &mut self.percent,
        }
    }

    pub fn clear(&mut self) {
        self.bank.clear();
        self.category.clear();
        self.percent.clear();
    }
}

impl FormSource for FormFields {
    fn value(&self, field: FormField) -> String {
        match field {
            FormField::Bank => self.bank.clone(),
            FormField::Category => self.category.clone(),
            FormField::Percent => self.percent.clone(),
        }
    }
}

// ============================================================================
// MAIN BUTTON STYLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainButtonStyle {
    pub text_color: String,
    pub color: String,
}

impl Default for MainButtonStyle {
    fn default() -> Self {
        MainButtonStyle {
            text_color: "#FFFFFF".to_string(),
            color: "#2cab37".to_string(),
        }
    }
}

// ============================================================================
// RECORDING BRIDGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    Expand,
    MainButtonTextColor(String),
    MainButtonColor(String),
    Alert(String),
    SendData(String),
}

/// Bridge that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    calls: RefCell<Vec<BridgeCall>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<BridgeCall> {
        self.calls.borrow().clone()
    }

    pub fn sent_payloads(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BridgeCall::SendData(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                BridgeCall::Alert(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BridgeCall) {
        tracing::debug!(?call, "bridge call");
        self.calls.borrow_mut().push(call);
    }
}

impl WebAppBridge for RecordingBridge {
    fn expand(&self) {
        self.record(BridgeCall::Expand);
    }

    fn set_main_button_text_color(&self, color: &str) {
        self.record(BridgeCall::MainButtonTextColor(color.to_string()));
    }

    fn set_main_button_color(&self, color: &str) {
        self.record(BridgeCall::MainButtonColor(color.to_string()));
    }

    fn show_alert(&self, message: &str) {
        self.record(BridgeCall::Alert(message.to_string()));
    }

    fn send_data(&self, payload: &str) {
        self.record(BridgeCall::SendData(payload.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields_lookup() {
        let mut form = FormFields::new("Visa", "Groceries", "5");

        assert_eq!(form.value(FormField::Bank), "Visa");
        assert_eq!(form.value(FormField::Category), "Groceries");
        assert_eq!(form.value(FormField::Percent), "5");

        form.get_mut(FormField::Percent).push('0');
        assert_eq!(form.value(FormField::Percent), "50");

        form.clear();
        assert_eq!(form, FormFields::default());
    }

    #[test]
    fn test_default_button_style() {
        let style = MainButtonStyle::default();
        assert_eq!(style.text_color, "#FFFFFF");
        assert_eq!(style.color, "#2cab37");
    }

    #[test]
    fn test_recording_bridge_keeps_call_order() {
        let bridge = RecordingBridge::new();
        bridge.expand();
        bridge.show_alert("oops");
        bridge.send_data("{}");

        assert_eq!(
            bridge.calls(),
            vec![
                BridgeCall::Expand,
                BridgeCall::Alert("oops".to_string()),
                BridgeCall::SendData("{}".to_string()),
            ]
        );
        assert_eq!(bridge.alerts(), vec!["oops".to_string()]);
        assert_eq!(bridge.sent_payloads(), vec!["{}".to_string()]);
    }

    #[test]
    fn test_bridge_by_reference() {
        let bridge = RecordingBridge::new();
        let borrowed: &RecordingBridge = &bridge;
        WebAppBridge::expand(&borrowed);

        assert_eq!(bridge.calls(), vec![BridgeCall::Expand]);
    }
}
