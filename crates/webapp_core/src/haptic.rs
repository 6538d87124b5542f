use shared::{
    domain::{HapticImpactStyle, HapticNotificationType},
    error::BridgeError,
    protocol::{HapticFeedbackPayload, HostMethod},
};

use crate::bridge::EventBridge;

/// Borrowed handle returned by `WebApp::haptic_feedback`, which has already
/// checked the version gate.
pub struct HapticFeedback<'a> {
    bridge: &'a EventBridge,
}

impl<'a> HapticFeedback<'a> {
    pub(crate) fn new(bridge: &'a EventBridge) -> Self {
        Self { bridge }
    }

    pub fn impact_occurred(&self, style: &str) -> Result<(), BridgeError> {
        let impact_style = style.parse::<HapticImpactStyle>()?;
        self.trigger(HapticFeedbackPayload::Impact { impact_style });
        Ok(())
    }

    pub fn notification_occurred(&self, kind: &str) -> Result<(), BridgeError> {
        let notification_type = kind.parse::<HapticNotificationType>()?;
        self.trigger(HapticFeedbackPayload::Notification { notification_type });
        Ok(())
    }

    pub fn selection_changed(&self) {
        self.trigger(HapticFeedbackPayload::SelectionChange);
    }

    fn trigger(&self, payload: HapticFeedbackPayload) {
        self.bridge
            .post(&HostMethod::WebAppTriggerHapticFeedback(payload));
    }
}
