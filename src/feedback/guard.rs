//! Screenshot availability guard.
//!
//! Asking FreeCAD for a screenshot while a spreadsheet or drawing page is the
//! active view raises inside the addon. The guard runs a probe script first
//! and only requests the image when the view can render one.

use tracing::{debug, error, warn};

use crate::feedback::{Screenshot, ScreenshotOutcome, UnavailableReason};
use crate::freecad::scripts::{VIEW_PROBE, VIEW_PROBE_MARKER};
use crate::freecad::{CadSession, RemoteResult};

/// View types that never produce a screenshot.
pub const UNSUPPORTED_VIEWS: [&str; 3] = [
    "SpreadsheetGui::SheetView",
    "DrawingGui::DrawingView",
    "TechDrawGui::MDIViewPage",
];

/// What the probe reported about the active view.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ViewProbe {
    NoView,
    View { type_name: String, can_save: bool },
}

/// Finds the marker in the probe output.
///
/// The addon reports captured stdout after an `Output: ` label, so the marker
/// may sit anywhere in its line.
fn parse_probe(output: &str) -> Option<ViewProbe> {
    let line = output.lines().find_map(|line| {
        line.split_once(VIEW_PROBE_MARKER).map(|(_, rest)| rest.trim())
    })?;

    if line == "<none>" {
        return Some(ViewProbe::NoView);
    }

    let (type_name, flag) = line.rsplit_once('|')?;
    let can_save = match flag {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    Some(ViewProbe::View {
        type_name: type_name.to_string(),
        can_save,
    })
}

/// Tries to capture the active view from the named camera angle.
///
/// Never fails: every problem is folded into the returned outcome, and no
/// screenshot request is sent unless the probe says the view can take one.
pub async fn try_screenshot<S: CadSession>(session: &S, view_name: &str) -> ScreenshotOutcome {
    let output = match session.execute_code(VIEW_PROBE).await {
        Ok(RemoteResult::Success(output)) => output,
        Ok(RemoteResult::Failure(message)) => {
            warn!(error = %message, "View probe reported failure");
            return ScreenshotOutcome::Failed(message);
        }
        Err(e) => {
            warn!(error = %e, "View probe failed");
            return ScreenshotOutcome::Failed(e.to_string());
        }
    };

    let probe = match parse_probe(&output) {
        Some(probe) => probe,
        None => {
            warn!(output = %output.trim(), "View probe printed no marker");
            return ScreenshotOutcome::Failed("view probe printed no marker".to_string());
        }
    };

    let reason = match probe {
        ViewProbe::NoView => Some(UnavailableReason::NoActiveView),
        ViewProbe::View { type_name, .. } if UNSUPPORTED_VIEWS.contains(&type_name.as_str()) => {
            Some(UnavailableReason::UnsupportedView(type_name))
        }
        ViewProbe::View {
            can_save: false, ..
        } => Some(UnavailableReason::NoImageExport),
        ViewProbe::View { .. } => None,
    };
    if let Some(reason) = reason {
        debug!(?reason, "Screenshot unavailable");
        return ScreenshotOutcome::Unavailable(reason);
    }

    match session.get_active_screenshot(view_name).await {
        Ok(Some(png)) if !png.is_empty() => ScreenshotOutcome::Captured(Screenshot {
            view_name: view_name.to_string(),
            png,
        }),
        Ok(_) => {
            error!(view = view_name, "FreeCAD returned an empty screenshot");
            ScreenshotOutcome::Failed("empty screenshot".to_string())
        }
        Err(e) => {
            error!(view = view_name, error = %e, "Failed to get screenshot");
            ScreenshotOutcome::Failed(e.to_string())
        }
    }
}
