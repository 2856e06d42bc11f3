//! Visual feedback attached to tool results.
//!
//! After a state-changing call the handlers try to grab a screenshot of the
//! active FreeCAD view. Not every view can produce one (spreadsheets and
//! drawing pages cannot), so [`guard::try_screenshot`] checks first and
//! reports a [`ScreenshotOutcome`] instead of failing. [`envelope`] turns the
//! primary text and that outcome into the content list of a tool result.

pub mod envelope;
pub mod guard;

pub use guard::try_screenshot;

/// Camera angle used when a handler does not ask for a specific one.
pub const DEFAULT_VIEW: &str = "Isometric";

/// Camera angles the addon can render.
pub const VIEW_NAMES: [&str; 9] = [
    "Isometric",
    "Front",
    "Top",
    "Right",
    "Back",
    "Left",
    "Bottom",
    "Dimetric",
    "Trimetric",
];

/// Whether tool results may carry images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedbackMode {
    /// Text plus a screenshot or a note explaining its absence.
    #[default]
    TextAndImage,
    /// Text only; screenshots are never attached.
    TextOnly,
}

impl FeedbackMode {
    /// Mode for the `only_text` flag.
    #[must_use]
    pub const fn from_only_text(only_text: bool) -> Self {
        if only_text {
            Self::TextOnly
        } else {
            Self::TextAndImage
        }
    }
}

/// A rendered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Camera angle it was taken from.
    pub view_name: String,
    /// PNG bytes.
    pub png: Vec<u8>,
}

/// Why no screenshot could be taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// FreeCAD has no active view.
    NoActiveView,
    /// The active view type cannot be rendered; holds its type name.
    UnsupportedView(String),
    /// The active view has no image export.
    NoImageExport,
}

/// Result of a screenshot attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    /// An image was taken.
    Captured(Screenshot),
    /// The active view cannot provide one.
    Unavailable(UnavailableReason),
    /// The probe or the capture failed.
    Failed(String),
}

impl ScreenshotOutcome {
    /// The screenshot, if one was taken.
    #[must_use]
    pub fn into_screenshot(self) -> Option<Screenshot> {
        match self {
            Self::Captured(screenshot) => Some(screenshot),
            Self::Unavailable(_) | Self::Failed(_) => None,
        }
    }
}
