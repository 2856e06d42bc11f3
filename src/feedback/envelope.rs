//! Builds the content list of a tool result.

use crate::feedback::{FeedbackMode, Screenshot, ScreenshotOutcome};
use crate::mcp::protocol::{ToolCallResult, ToolContent};

/// MIME type of every screenshot.
pub const PNG_MIME: &str = "image/png";

/// Appended when a screenshot was wanted but none could be taken.
pub const PREVIEW_UNAVAILABLE_NOTE: &str = "Note: Visual preview is unavailable in the current view type (such as TechDraw or Spreadsheet). Switch to a 3D view to see visual feedback.";

/// Returned by `get_view` when nothing could be captured.
pub const VIEW_UNAVAILABLE: &str =
    "Cannot get screenshot in the current view type (such as TechDraw or Spreadsheet)";

/// Returned by `get_view` in text-only mode.
pub const SCREENSHOTS_DISABLED: &str =
    "Screenshots are disabled: the server runs in text-only feedback mode";

fn image(screenshot: Screenshot) -> ToolContent {
    ToolContent::Image {
        data: screenshot.png,
        mime_type: PNG_MIME.to_string(),
    }
}

/// Primary text, then the screenshot or a note explaining its absence.
///
/// Text-only mode stops after the primary text.
#[must_use]
pub fn build(
    primary: impl Into<String>,
    screenshot: Option<Screenshot>,
    mode: FeedbackMode,
) -> ToolCallResult {
    let mut content = vec![ToolContent::text(primary)];

    if mode == FeedbackMode::TextAndImage {
        content.push(screenshot.map_or_else(|| ToolContent::text(PREVIEW_UNAVAILABLE_NOTE), image));
    }

    ToolCallResult::from_content(content)
}

/// Result of `get_view`, whose only payload is the image.
///
/// `outcome` is `None` in text-only mode, where the view is never probed.
#[must_use]
pub fn view(outcome: Option<ScreenshotOutcome>, mode: FeedbackMode) -> ToolCallResult {
    if mode == FeedbackMode::TextOnly {
        return ToolCallResult::text(SCREENSHOTS_DISABLED);
    }

    match outcome.and_then(ScreenshotOutcome::into_screenshot) {
        Some(screenshot) => ToolCallResult::from_content(vec![image(screenshot)]),
        None => ToolCallResult::text(VIEW_UNAVAILABLE),
    }
}
