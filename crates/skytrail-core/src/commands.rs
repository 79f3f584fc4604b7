//! Commands from the host to the traffic engine.
//!
//! Queued and applied at the next tick boundary.

use serde::{Deserialize, Serialize};

use crate::types::Viewer;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineCommand {
    /// Manually show or hide one aircraft; disables auto visibility.
    SetVisible { key: String, visible: bool },
    /// Hand visibility back to the auto-hide rules.
    SetAutoVisible { key: String },
    /// Drop an aircraft at the next tick boundary.
    RemoveAircraft { key: String },
    /// Update the observer position used for AI priority.
    SetViewer { viewer: Option<Viewer> },
    /// Put the external camera on one aircraft, or on none.
    SetCameraView { key: Option<String> },
}
