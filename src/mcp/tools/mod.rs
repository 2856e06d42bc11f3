//! Tool handlers.
//!
//! Each handler checks its arguments, obtains the FreeCAD session, makes one
//! primary remote call and wraps the outcome with visual feedback. Rejected
//! arguments become error results. Everything that goes wrong after that
//! (FreeCAD unreachable, a remote failure, a transport error) is reported as
//! ordinary text, so the model can read it and react.

pub mod args;
pub mod definitions;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::feedback::{self, envelope, FeedbackMode, DEFAULT_VIEW, VIEW_NAMES};
use crate::freecad::scripts::{
    self, Constraint, ConstraintKind, Plane, SketchRef, MAX_POLYGON_SIDES,
};
use crate::freecad::{
    CadSession, ConnectionError, Connector, ObjectEdit, ObjectSpec, RemoteResult, RpcResult,
    SessionManager,
};
use crate::mcp::protocol::ToolCallResult;

pub use definitions::tool_definitions;

use args::ArgResult;

/// Reply when the parts library is empty or missing.
pub const NO_PARTS: &str =
    "No parts found in the parts library. You must add parts_library addon.";

/// Reply when FreeCAD has no open document.
pub const NO_DOCUMENTS: &str = "No documents are open in FreeCAD.";

/// Whether a handler attaches a screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preview {
    Attach,
    Skip,
}

/// Routes tool calls to handlers and owns the FreeCAD session.
pub struct ToolDispatcher<C: Connector> {
    sessions: SessionManager<C>,
    mode: FeedbackMode,
}

impl<C: Connector> ToolDispatcher<C> {
    /// Creates a dispatcher that connects lazily through `connector`.
    #[must_use]
    pub const fn new(connector: C, mode: FeedbackMode) -> Self {
        Self {
            sessions: SessionManager::new(connector),
            mode,
        }
    }

    /// Feedback mode fixed at startup.
    #[must_use]
    pub const fn mode(&self) -> FeedbackMode {
        self.mode
    }

    /// Returns `true` while a FreeCAD session is held.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.sessions.is_connected()
    }

    /// Tries to connect once at startup. Failure is not fatal; the next tool
    /// call tries again.
    pub async fn on_startup(&mut self) {
        match self.sessions.get().await {
            Ok(session) => info!(address = %session.address(), "FreeCAD session ready"),
            Err(e) => warn!(
                error = %e,
                "Could not connect to FreeCAD at startup; start the addon's RPC server and retry"
            ),
        }
    }

    /// Releases the session.
    pub fn on_shutdown(&mut self) {
        self.sessions.shutdown();
        info!("Tool dispatcher shut down");
    }

    /// Runs the named tool.
    pub async fn call(&mut self, name: &str, arguments: &Value) -> ToolCallResult {
        match name {
            "create_document" => self.create_document(arguments).await,
            "create_object" => self.create_object(arguments).await,
            "edit_object" => self.edit_object(arguments).await,
            "delete_object" => self.delete_object(arguments).await,
            "execute_code" => self.execute_code(arguments).await,
            "get_view" => self.get_view(arguments).await,
            "insert_part_from_library" => self.insert_part_from_library(arguments).await,
            "get_objects" => self.get_objects(arguments).await,
            "get_object" => self.get_object(arguments).await,
            "get_parts_list" => self.get_parts_list().await,
            "list_documents" => self.list_documents().await,
            "create_sketch" => self.create_sketch(arguments).await,
            "sketch_add_point" => self.sketch_add_point(arguments).await,
            "sketch_add_line" => self.sketch_add_line(arguments).await,
            "sketch_add_circle" => self.sketch_add_circle(arguments).await,
            "sketch_add_arc" => self.sketch_add_arc(arguments).await,
            "sketch_add_rectangle" => self.sketch_add_rectangle(arguments).await,
            "sketch_add_polyline" => self.sketch_add_polyline(arguments).await,
            "sketch_add_ellipse" => self.sketch_add_ellipse(arguments).await,
            "sketch_add_regular_polygon" => self.sketch_add_regular_polygon(arguments).await,
            "sketch_add_constraint" => self.sketch_add_constraint(arguments).await,
            "sketch_close_edit" => self.sketch_close_edit(arguments).await,
            _ => ToolCallResult::error(format!("Unknown tool: {name}")),
        }
    }

    // === Documents and objects ===

    async fn create_document(&mut self, arguments: &Value) -> ToolCallResult {
        let name = match args::required_str(arguments, "name") {
            Ok(name) => name,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.create_document(name).await;
        conclude(session, mode, Preview::Skip, "create document", result, |doc| {
            format!("Document '{doc}' created successfully")
        })
        .await
    }

    async fn create_object(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let doc_name = args::required_str(arguments, "doc_name")?;
            let spec = ObjectSpec {
                name: args::required_str(arguments, "obj_name")?.to_string(),
                type_id: args::required_str(arguments, "obj_type")?.to_string(),
                properties: args::properties(arguments, "obj_properties", false)?,
                analysis: args::optional_str(arguments, "analysis_name")?.map(str::to_string),
            };
            Ok((doc_name, spec))
        })();
        let (doc_name, spec) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.create_object(doc_name, &spec).await;
        conclude(session, mode, Preview::Attach, "create object", result, |obj| {
            format!("Object '{obj}' created successfully")
        })
        .await
    }

    async fn edit_object(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            Ok((
                args::required_str(arguments, "doc_name")?,
                args::required_str(arguments, "obj_name")?,
                ObjectEdit {
                    properties: args::properties(arguments, "obj_properties", true)?,
                },
            ))
        })();
        let (doc_name, obj_name, edit) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.edit_object(doc_name, obj_name, &edit).await;
        conclude(session, mode, Preview::Attach, "edit object", result, |obj| {
            format!("Object '{obj}' edited successfully")
        })
        .await
    }

    async fn delete_object(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = args::required_str(arguments, "doc_name")
            .and_then(|doc| Ok((doc, args::required_str(arguments, "obj_name")?)));
        let (doc_name, obj_name) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.delete_object(doc_name, obj_name).await;
        conclude(session, mode, Preview::Attach, "delete object", result, |obj| {
            format!("Object '{obj}' deleted successfully")
        })
        .await
    }

    async fn execute_code(&mut self, arguments: &Value) -> ToolCallResult {
        let code = match args::required_str(arguments, "code") {
            Ok(code) => code,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.execute_code(code).await;
        conclude(session, mode, Preview::Attach, "execute code", result, |output| {
            format!("Code executed successfully: {output}")
        })
        .await
    }

    async fn get_view(&mut self, arguments: &Value) -> ToolCallResult {
        let view_name = match args::required_str(arguments, "view_name") {
            Ok(view) if VIEW_NAMES.contains(&view) => view,
            Ok(view) => {
                return ToolCallResult::error(format!(
                    "Invalid view_name '{view}'. Must be one of: {}",
                    VIEW_NAMES.join(", ")
                ))
            }
            Err(msg) => return ToolCallResult::error(msg),
        };

        if self.mode == FeedbackMode::TextOnly {
            return envelope::view(None, self.mode);
        }

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let outcome = feedback::try_screenshot(session, view_name).await;
        envelope::view(Some(outcome), mode)
    }

    async fn insert_part_from_library(&mut self, arguments: &Value) -> ToolCallResult {
        let path = match args::required_str(arguments, "relative_path") {
            Ok(path) => path,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.insert_part_from_library(path).await;
        conclude(
            session,
            mode,
            Preview::Attach,
            "insert part from library",
            result,
            |message| format!("Part inserted from library: {message}"),
        )
        .await
    }

    async fn get_objects(&mut self, arguments: &Value) -> ToolCallResult {
        let doc_name = match args::required_str(arguments, "doc_name") {
            Ok(doc_name) => doc_name,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        match session.get_objects(doc_name).await {
            Ok(objects) => with_preview(session, mode, objects.to_string()).await,
            Err(e) => remote_error("get objects", &e),
        }
    }

    async fn get_object(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = args::required_str(arguments, "doc_name")
            .and_then(|doc| Ok((doc, args::required_str(arguments, "obj_name")?)));
        let (doc_name, obj_name) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        match session.get_object(doc_name, obj_name).await {
            Ok(object) => with_preview(session, mode, object.to_string()).await,
            Err(e) => remote_error("get object", &e),
        }
    }

    async fn get_parts_list(&mut self) -> ToolCallResult {
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        match session.get_parts_list().await {
            Ok(parts) if parts.is_empty() => ToolCallResult::text(NO_PARTS),
            Ok(parts) => ToolCallResult::text(Value::from(parts).to_string()),
            Err(e) => remote_error("get parts list", &e),
        }
    }

    async fn list_documents(&mut self) -> ToolCallResult {
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        match session.list_documents().await {
            Ok(documents) if documents.is_empty() => ToolCallResult::text(NO_DOCUMENTS),
            Ok(documents) => ToolCallResult::text(Value::from(documents).to_string()),
            Err(e) => remote_error("list documents", &e),
        }
    }

    // === Sketcher ===

    /// Runs a generated script and reports `success` on completion.
    async fn run_script(
        &mut self,
        action: &str,
        script: String,
        success: String,
    ) -> ToolCallResult {
        let mode = self.mode;
        let session = match self.sessions.get().await {
            Ok(session) => session,
            Err(e) => return not_connected(&e),
        };
        let result = session.execute_code(&script).await;
        conclude(session, mode, Preview::Attach, action, result, |_| success).await
    }

    async fn create_sketch(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let doc_name = args::required_str(arguments, "doc_name")?;
            let sketch_name = args::required_str(arguments, "sketch_name")?;
            let plane = args::optional_str(arguments, "plane")?
                .map_or(Ok(Plane::Xy), str::parse::<Plane>)?;
            let body_name = args::optional_str(arguments, "body_name")?;
            Ok((doc_name, sketch_name, plane, body_name))
        })();
        let (doc_name, sketch_name, plane, body_name) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let script = scripts::create_sketch(doc_name, sketch_name, plane, body_name);
        let success = format!("Sketch '{sketch_name}' created successfully on {plane} plane");
        self.run_script("create sketch", script, success).await
    }

    async fn sketch_add_point(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            Ok((
                sketch_ref(arguments)?,
                args::required_f64(arguments, "x")?,
                args::required_f64(arguments, "y")?,
            ))
        })();
        let (sketch, x, y) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!("Point added to sketch '{}' at ({x}, {y})", sketch.sketch_name);
        self.run_script("add point", sketch.add_point(x, y), success)
            .await
    }

    async fn sketch_add_line(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = sketch_ref(arguments).and_then(|sketch| Ok((sketch, corners(arguments)?)));
        let (sketch, (x1, y1, x2, y2)) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Line added to sketch '{}' from ({x1}, {y1}) to ({x2}, {y2})",
            sketch.sketch_name
        );
        self.run_script("add line", sketch.add_line(x1, y1, x2, y2), success)
            .await
    }

    async fn sketch_add_circle(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            Ok((
                sketch_ref(arguments)?,
                args::required_f64(arguments, "center_x")?,
                args::required_f64(arguments, "center_y")?,
                args::positive_f64(arguments, "radius")?,
            ))
        })();
        let (sketch, cx, cy, radius) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Circle added to sketch '{}' with center at ({cx}, {cy}) and radius {radius}",
            sketch.sketch_name
        );
        self.run_script("add circle", sketch.add_circle(cx, cy, radius), success)
            .await
    }

    async fn sketch_add_arc(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            Ok((
                sketch_ref(arguments)?,
                args::required_f64(arguments, "center_x")?,
                args::required_f64(arguments, "center_y")?,
                args::positive_f64(arguments, "radius")?,
                args::required_f64(arguments, "start_angle")?,
                args::required_f64(arguments, "end_angle")?,
            ))
        })();
        let (sketch, cx, cy, radius, start, end) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Arc added to sketch '{}' with center at ({cx}, {cy}), radius {radius}, from {start}° to {end}°",
            sketch.sketch_name
        );
        let script = sketch.add_arc(cx, cy, radius, start, end);
        self.run_script("add arc", script, success).await
    }

    async fn sketch_add_rectangle(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let sketch = sketch_ref(arguments)?;
            let (x1, y1, x2, y2) = corners(arguments)?;
            if x1 == x2 || y1 == y2 {
                return Err("Rectangle corners must differ in both X and Y".to_string());
            }
            Ok((sketch, (x1, y1, x2, y2)))
        })();
        let (sketch, (x1, y1, x2, y2)) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Rectangle added to sketch '{}' from ({x1}, {y1}) to ({x2}, {y2})",
            sketch.sketch_name
        );
        self.run_script("add rectangle", sketch.add_rectangle(x1, y1, x2, y2), success)
            .await
    }

    async fn sketch_add_polyline(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let sketch = sketch_ref(arguments)?;
            let points = args::points(arguments, "points")?;
            let closed = args::optional_bool(arguments, "closed")?.unwrap_or(false);
            if points.len() < 2 {
                return Err(format!(
                    "A polyline needs at least 2 points, got {}",
                    points.len()
                ));
            }
            if closed && points.len() < 3 {
                return Err("A closed polyline needs at least 3 points".to_string());
            }
            Ok((sketch, points, closed))
        })();
        let (sketch, points, closed) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Polyline added to sketch '{}' with {} points, closed: {closed}",
            sketch.sketch_name,
            points.len()
        );
        self.run_script("add polyline", sketch.add_polyline(&points, closed), success)
            .await
    }

    async fn sketch_add_ellipse(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let sketch = sketch_ref(arguments)?;
            let cx = args::required_f64(arguments, "center_x")?;
            let cy = args::required_f64(arguments, "center_y")?;
            let major = args::positive_f64(arguments, "major_radius")?;
            let minor = args::positive_f64(arguments, "minor_radius")?;
            let angle = args::optional_f64(arguments, "angle")?.unwrap_or(0.0);
            if major < minor {
                return Err(format!(
                    "major_radius ({major}) must not be smaller than minor_radius ({minor})"
                ));
            }
            Ok((sketch, cx, cy, major, minor, angle))
        })();
        let (sketch, cx, cy, major, minor, angle) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Ellipse added to sketch '{}' with center at ({cx}, {cy}), major radius {major}, minor radius {minor}",
            sketch.sketch_name
        );
        let script = sketch.add_ellipse(cx, cy, major, minor, angle);
        self.run_script("add ellipse", script, success).await
    }

    async fn sketch_add_regular_polygon(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let sketch = sketch_ref(arguments)?;
            let cx = args::required_f64(arguments, "center_x")?;
            let cy = args::required_f64(arguments, "center_y")?;
            let radius = args::positive_f64(arguments, "radius")?;
            let sides = args::required_u32(arguments, "sides")?;
            let angle = args::optional_f64(arguments, "angle")?.unwrap_or(0.0);
            if sides < 3 {
                return Err(format!("A regular polygon needs at least 3 sides, got {sides}"));
            }
            if sides > MAX_POLYGON_SIDES {
                return Err(format!(
                    "A regular polygon can have at most {MAX_POLYGON_SIDES} sides, got {sides}"
                ));
            }
            Ok((sketch, cx, cy, radius, sides, angle))
        })();
        let (sketch, cx, cy, radius, sides, angle) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "Regular {sides}-sided polygon added to sketch '{}' with center at ({cx}, {cy}) and radius {radius}",
            sketch.sketch_name
        );
        let script = sketch.add_regular_polygon(cx, cy, radius, sides, angle);
        self.run_script("add polygon", script, success).await
    }

    async fn sketch_add_constraint(&mut self, arguments: &Value) -> ToolCallResult {
        let parsed = (|| -> ArgResult<_> {
            let sketch = sketch_ref(arguments)?;
            let kind = args::required_str(arguments, "constraint_type")?
                .parse::<ConstraintKind>()?;
            let constraint = Constraint::new(
                kind,
                args::indices(arguments, "geometry_indices", true)?,
                args::indices(arguments, "point_indices", false)?,
                args::optional_f64(arguments, "value")?,
            )?;
            Ok((sketch, constraint))
        })();
        let (sketch, constraint) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!(
            "{} constraint added to sketch '{}'",
            constraint.kind(),
            sketch.sketch_name
        );
        self.run_script("add constraint", sketch.add_constraint(&constraint), success)
            .await
    }

    async fn sketch_close_edit(&mut self, arguments: &Value) -> ToolCallResult {
        let sketch = match sketch_ref(arguments) {
            Ok(sketch) => sketch,
            Err(msg) => return ToolCallResult::error(msg),
        };

        let success = format!("Closed editing mode for sketch '{}'", sketch.sketch_name);
        self.run_script("close sketch editing", sketch.close_edit(), success)
            .await
    }
}

fn sketch_ref(arguments: &Value) -> ArgResult<SketchRef<'_>> {
    Ok(SketchRef::new(
        args::required_str(arguments, "doc_name")?,
        args::required_str(arguments, "sketch_name")?,
    ))
}

fn corners(arguments: &Value) -> ArgResult<(f64, f64, f64, f64)> {
    Ok((
        args::required_f64(arguments, "x1")?,
        args::required_f64(arguments, "y1")?,
        args::required_f64(arguments, "x2")?,
        args::required_f64(arguments, "y2")?,
    ))
}

fn not_connected(e: &ConnectionError) -> ToolCallResult {
    ToolCallResult::text(e.to_string())
}

fn remote_error(action: &str, e: &crate::freecad::RpcError) -> ToolCallResult {
    error!(action, error = %e, "FreeCAD request failed");
    ToolCallResult::text(format!("Failed to {action}: {e}"))
}

/// Turns a state-changing call's result into the tool result.
async fn conclude<S: CadSession>(
    session: &S,
    mode: FeedbackMode,
    preview: Preview,
    action: &str,
    result: RpcResult<RemoteResult>,
    success: impl FnOnce(&str) -> String,
) -> ToolCallResult {
    let text = match result {
        Ok(RemoteResult::Success(payload)) => success(&payload),
        Ok(RemoteResult::Failure(message)) => format!("Failed to {action}: {message}"),
        Err(e) => return remote_error(action, &e),
    };

    match preview {
        Preview::Attach => with_preview(session, mode, text).await,
        Preview::Skip => ToolCallResult::text(text),
    }
}

/// `text` plus the screenshot outcome, as the feedback mode allows.
async fn with_preview<S: CadSession>(
    session: &S,
    mode: FeedbackMode,
    text: String,
) -> ToolCallResult {
    let screenshot = match mode {
        FeedbackMode::TextOnly => None,
        FeedbackMode::TextAndImage => feedback::try_screenshot(session, DEFAULT_VIEW)
            .await
            .into_screenshot(),
    };
    envelope::build(text, screenshot, mode)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::feedback::envelope::PREVIEW_UNAVAILABLE_NOTE;
    use crate::freecad::fake::{FakeConnector, FakeSession};
    use crate::mcp::protocol::ToolContent;

    fn dispatcher(session: FakeSession, mode: FeedbackMode) -> ToolDispatcher<FakeConnector> {
        ToolDispatcher::new(FakeConnector::new(session), mode)
    }

    fn text_of(result: &ToolCallResult, index: usize) -> &str {
        match &result.content[index] {
            ToolContent::Text { text } => text,
            ToolContent::Image { .. } => panic!("item {index} is an image"),
        }
    }

    async fn session_calls(dispatcher: &mut ToolDispatcher<FakeConnector>) -> Vec<String> {
        dispatcher.sessions.get().await.unwrap().calls()
    }

    #[tokio::test]
    async fn create_document_is_text_only() {
        let session = FakeSession {
            reply: RemoteResult::Success("Foo".to_string()),
            ..FakeSession::default()
        };
        let mut tools = dispatcher(session, FeedbackMode::TextAndImage);

        let result = tools.call("create_document", &json!({"name": "Foo"})).await;
        assert_eq!(
            result.content,
            vec![ToolContent::text("Document 'Foo' created successfully")]
        );
        assert_eq!(session_calls(&mut tools).await, ["create_document"]);
    }

    #[tokio::test]
    async fn failed_create_in_spreadsheet_view_gets_note() {
        let session = FakeSession {
            reply: RemoteResult::Failure("DuplicateName".to_string()),
            ..FakeSession::with_view("SpreadsheetGui::SheetView")
        };
        let mut tools = dispatcher(session, FeedbackMode::TextAndImage);

        let result = tools
            .call(
                "create_object",
                &json!({"doc_name": "D", "obj_type": "Part::Box", "obj_name": "Box"}),
            )
            .await;

        assert_eq!(result.content.len(), 2);
        assert_eq!(text_of(&result, 0), "Failed to create object: DuplicateName");
        assert_eq!(text_of(&result, 1), PREVIEW_UNAVAILABLE_NOTE);
        assert!(!session_calls(&mut tools)
            .await
            .contains(&"get_active_screenshot".to_string()));
    }

    #[tokio::test]
    async fn successful_edit_carries_image() {
        let session = FakeSession {
            reply: RemoteResult::Success("Box".to_string()),
            ..FakeSession::default()
        };
        let mut tools = dispatcher(session, FeedbackMode::TextAndImage);

        let result = tools
            .call(
                "edit_object",
                &json!({"doc_name": "D", "obj_name": "Box", "obj_properties": {"Length": 5}}),
            )
            .await;

        assert_eq!(text_of(&result, 0), "Object 'Box' edited successfully");
        assert!(matches!(result.content[1], ToolContent::Image { .. }));
    }

    #[tokio::test]
    async fn text_only_mode_never_attaches_images() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextOnly);

        let calls = [
            ("execute_code", json!({"code": "print(1)"})),
            ("delete_object", json!({"doc_name": "D", "obj_name": "Box"})),
            ("get_objects", json!({"doc_name": "D"})),
            ("get_view", json!({"view_name": "Front"})),
            ("sketch_close_edit", json!({"doc_name": "D", "sketch_name": "S"})),
        ];
        for (name, arguments) in calls {
            let result = tools.call(name, &arguments).await;
            assert!(
                result
                    .content
                    .iter()
                    .all(|c| matches!(c, ToolContent::Text { .. })),
                "{name}"
            );
            assert_eq!(result.content.len(), 1, "{name}");
        }
        let calls = session_calls(&mut tools).await;
        assert!(!calls.iter().any(|c| c == "view_probe" || c == "get_active_screenshot"));
    }

    #[tokio::test]
    async fn get_view_in_text_only_mode_does_not_connect() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextOnly);
        let result = tools.call("get_view", &json!({"view_name": "Top"})).await;

        assert_eq!(result.content, vec![ToolContent::text(envelope::SCREENSHOTS_DISABLED)]);
        assert!(!tools.is_connected());
    }

    #[tokio::test]
    async fn get_view_rejects_unknown_angle() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);
        let result = tools.call("get_view", &json!({"view_name": "Sideways"})).await;
        assert!(result.is_error);
        assert!(!tools.is_connected());
    }

    #[tokio::test]
    async fn empty_catalogues_are_explained() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);

        let parts = tools.call("get_parts_list", &json!({})).await;
        assert_eq!(parts.content, vec![ToolContent::text(NO_PARTS)]);

        let docs = tools.call("list_documents", &json!({})).await;
        assert_eq!(docs.content, vec![ToolContent::text(NO_DOCUMENTS)]);
    }

    #[tokio::test]
    async fn catalogues_are_json_text() {
        let session = FakeSession {
            parts: vec!["Fasteners/M3.fcstd".to_string()],
            documents: vec!["Doc".to_string(), "Other".to_string()],
            ..FakeSession::default()
        };
        let mut tools = dispatcher(session, FeedbackMode::TextAndImage);

        let parts = tools.call("get_parts_list", &json!({})).await;
        assert_eq!(text_of(&parts, 0), r#"["Fasteners/M3.fcstd"]"#);
        let docs = tools.call("list_documents", &json!({})).await;
        assert_eq!(text_of(&docs, 0), r#"["Doc","Other"]"#);
    }

    #[tokio::test]
    async fn transport_errors_become_failure_text_without_preview() {
        let session = FakeSession {
            transport_down: true,
            ..FakeSession::default()
        };
        let mut tools = dispatcher(session, FeedbackMode::TextAndImage);

        let result = tools.call("execute_code", &json!({"code": "x"})).await;
        assert_eq!(result.content.len(), 1);
        assert!(text_of(&result, 0).starts_with("Failed to execute code: "));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn missing_argument_is_an_error_result() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);

        let result = tools.call("create_object", &json!({"doc_name": "D"})).await;
        assert!(result.is_error);
        assert_eq!(text_of(&result, 0), "Missing required parameter: obj_name");
        assert!(!tools.is_connected());
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);
        let result = tools.call("make_coffee", &json!({})).await;
        assert!(result.is_error);
        assert_eq!(text_of(&result, 0), "Unknown tool: make_coffee");
    }

    #[tokio::test]
    async fn sketch_tools_send_generated_scripts() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);

        let result = tools
            .call(
                "sketch_add_circle",
                &json!({"doc_name": "D", "sketch_name": "S", "center_x": 1, "center_y": 2, "radius": 3}),
            )
            .await;
        assert_eq!(
            text_of(&result, 0),
            "Circle added to sketch 'S' with center at (1, 2) and radius 3"
        );

        let session = tools.sessions.get().await.unwrap();
        let scripts = session.scripts.borrow();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("Part.Circle(FreeCAD.Vector(1.0, 2.0, 0)"));
    }

    #[tokio::test]
    async fn regular_polygon_side_count_is_bounded() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextOnly);
        let arguments = json!({
            "doc_name": "D",
            "sketch_name": "S",
            "center_x": 0,
            "center_y": 0,
            "radius": 5,
            "sides": 4_000_000_000_u32
        });

        let result = tools.call("sketch_add_regular_polygon", &arguments).await;
        assert!(result.is_error);
        assert!(text_of(&result, 0).contains("at most 1000 sides"));
        assert!(!tools.is_connected());

        let mut arguments = arguments;
        arguments["sides"] = json!(MAX_POLYGON_SIDES);
        let result = tools.call("sketch_add_regular_polygon", &arguments).await;
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn invalid_sketch_input_never_reaches_freecad() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);
        let base = |extra: Value| {
            let mut args = json!({"doc_name": "D", "sketch_name": "S"});
            if let (Some(map), Value::Object(extra)) = (args.as_object_mut(), extra) {
                map.extend(extra);
            }
            args
        };

        let rejected = [
            ("create_sketch", base(json!({"plane": "XW"}))),
            ("sketch_add_polyline", base(json!({"points": [{"x": 0, "y": 0}]}))),
            (
                "sketch_add_regular_polygon",
                base(json!({"center_x": 0, "center_y": 0, "radius": 5, "sides": 2})),
            ),
            (
                "sketch_add_circle",
                base(json!({"center_x": 0, "center_y": 0, "radius": -1})),
            ),
            (
                "sketch_add_constraint",
                base(json!({"constraint_type": "Distance", "geometry_indices": [0, 1], "point_indices": [1, 2]})),
            ),
            (
                "sketch_add_constraint",
                base(json!({"constraint_type": "Horizontal", "geometry_indices": [0, 1]})),
            ),
        ];
        for (name, arguments) in rejected {
            let result = tools.call(name, &arguments).await;
            assert!(result.is_error, "{name}: {arguments}");
        }
        assert!(!tools.is_connected());
    }

    #[tokio::test]
    async fn create_sketch_defaults_to_xy_plane() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextOnly);
        let result = tools
            .call("create_sketch", &json!({"doc_name": "D", "sketch_name": "S"}))
            .await;
        assert_eq!(
            result.content,
            vec![ToolContent::text("Sketch 'S' created successfully on XY plane")]
        );
    }

    #[tokio::test]
    async fn startup_connects_and_shutdown_releases() {
        let mut tools = dispatcher(FakeSession::default(), FeedbackMode::TextAndImage);
        tools.on_startup().await;
        assert!(tools.is_connected());
        tools.on_shutdown();
        assert!(!tools.is_connected());
        tools.on_shutdown();
    }
}
