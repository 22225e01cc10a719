//! Template post-processing macros.
//!
//! Both macros receive a `{ fragment, requestId }` event and return
//! `{ requestId, status, fragment }`; the transformed fragment fully
//! replaces the input's resource map. Fatal errors propagate to the
//! caller and surface as a failed macro invocation.

pub mod changesets;
pub mod roles;

use crate::error::Result;
use crate::template::TemplateFragment;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Macro invocation envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroEvent {
    pub fragment: Value,
    #[serde(rename = "requestId")]
    pub request_id: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroResponse {
    #[serde(rename = "requestId")]
    pub request_id: Value,
    pub status: MacroStatus,
    pub fragment: Value,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Rename the fixed changeset literal on every Prepare/Deploy action.
pub fn handle_rename_changesets(event: MacroEvent) -> Result<MacroResponse> {
    respond(event, |fragment| changesets::rename(fragment))
}

/// Swap auto-generated pipeline roles for the fixed shared set.
pub fn handle_transform_roles(
    event: MacroEvent,
    reassigner: &roles::RoleReassigner,
) -> Result<MacroResponse> {
    respond(event, |fragment| reassigner.reassign_roles(fragment))
}

fn respond(
    event: MacroEvent,
    transform: impl FnOnce(&mut TemplateFragment) -> Result<()>,
) -> Result<MacroResponse> {
    let mut fragment = TemplateFragment::from_value(event.fragment)?;
    transform(&mut fragment)?;
    Ok(MacroResponse {
        request_id: event.request_id,
        status: MacroStatus::Success,
        fragment: fragment.into_value()?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_echoes_request_id() {
        let event = MacroEvent {
            fragment: json!({"Resources": {}}),
            request_id: json!("req-42"),
        };
        let response = handle_rename_changesets(event).unwrap();
        assert_eq!(response.request_id, json!("req-42"));
        assert_eq!(response.status, MacroStatus::Success);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MacroStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&MacroStatus::Failure).unwrap(),
            "\"failure\""
        );
    }

    #[test]
    fn event_wire_field_names() {
        let event: MacroEvent =
            serde_json::from_value(json!({"fragment": {}, "requestId": "abc"})).unwrap();
        assert_eq!(event.request_id, json!("abc"));
    }
}
