//! # Action Replay
//!
//! Shopper and admin actions, read from a JSON array and replayed through a
//! [`ConfiguratorSession`]. Every resulting [`DerivedState`] is written as
//! one JSON line.
//!
//! ## Actions File Format
//! ```json
//! [
//!   {"action": "applyPreset", "presetId": "preset_starter"},
//!   {"action": "toggleOption", "groupId": "grp_extras", "optionId": "opt_report"},
//!   {"action": "toggleAddOn", "addOnId": "add_care"},
//!   {"action": "selectPlan", "planId": "plan_quarter"},
//!   {"action": "setField", "fieldId": "fld_handle", "value": "@acme"},
//!   {"action": "setChannel", "channel": "admin"}
//! ]
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use configurator_core::{ConfiguratorSession, DerivedState, SelectionSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CliError, CliResult};

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    ToggleOption { group_id: String, option_id: String },
    ToggleAddOn { add_on_id: String },
    /// `planId: null` clears the plan only when the catalog has none.
    SelectPlan {
        #[serde(default)]
        plan_id: Option<String>,
    },
    SetField { field_id: String, value: String },
    ApplyPreset { preset_id: String },
    SetChannel {
        #[serde(default)]
        channel: Option<String>,
    },
    LoadSnapshot { selection: SelectionSnapshot },
}

impl Action {
    /// Applies the action and returns the recomputed state.
    pub fn apply<'s>(&self, session: &'s mut ConfiguratorSession) -> &'s DerivedState {
        match self {
            Action::ToggleOption {
                group_id,
                option_id,
            } => session.toggle_option(group_id, option_id),
            Action::ToggleAddOn { add_on_id } => session.toggle_add_on(add_on_id),
            Action::SelectPlan { plan_id } => session.select_plan(plan_id.as_deref()),
            Action::SetField { field_id, value } => session.set_field_value(field_id, value),
            Action::ApplyPreset { preset_id } => session.apply_preset(preset_id),
            Action::SetChannel { channel } => session.set_active_channel(channel.clone()),
            Action::LoadSnapshot { selection } => session.load_snapshot(selection),
        }
    }

    /// Action tag as written in the actions file.
    pub fn name(&self) -> &'static str {
        match self {
            Action::ToggleOption { .. } => "toggleOption",
            Action::ToggleAddOn { .. } => "toggleAddOn",
            Action::SelectPlan { .. } => "selectPlan",
            Action::SetField { .. } => "setField",
            Action::ApplyPreset { .. } => "applyPreset",
            Action::SetChannel { .. } => "setChannel",
            Action::LoadSnapshot { .. } => "loadSnapshot",
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// One output line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Emission<'a> {
    pub session_id: Uuid,
    /// 0 for the initial state, then one per action.
    pub sequence: usize,
    pub emitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a Action>,
    pub state: &'a DerivedState,
}

/// Writes the current state, then replays `actions` writing one line each.
///
/// Returns the number of lines written.
pub fn replay<W: Write>(
    session: &mut ConfiguratorSession,
    actions: &[Action],
    session_id: Uuid,
    out: &mut W,
) -> CliResult<usize> {
    emit(
        out,
        &Emission {
            session_id,
            sequence: 0,
            emitted_at: Utc::now(),
            action: None,
            state: session.derived(),
        },
    )?;

    for (index, action) in actions.iter().enumerate() {
        debug!(action = action.name(), sequence = index + 1, "Replaying action");
        let state = action.apply(session);
        emit(
            out,
            &Emission {
                session_id,
                sequence: index + 1,
                emitted_at: Utc::now(),
                action: Some(action),
                state,
            },
        )?;
    }

    Ok(actions.len() + 1)
}

fn emit<W: Write>(out: &mut W, emission: &Emission<'_>) -> CliResult<()> {
    serde_json::to_writer(&mut *out, emission)
        .map_err(|e| CliError::Output(std::io::Error::from(e)))?;
    writeln!(out).map_err(CliError::Output)
}
