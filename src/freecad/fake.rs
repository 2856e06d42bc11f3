//! In-memory [`CadSession`] for unit tests.

use std::cell::RefCell;

use serde_json::{json, Value as Json};

use crate::freecad::error::{RpcError, RpcResult};
use crate::freecad::scripts::VIEW_PROBE;
use crate::freecad::session::{CadSession, Connector};
use crate::freecad::types::{ObjectEdit, ObjectSpec, RemoteResult};

/// Scriptable session that records every request.
#[derive(Debug)]
pub struct FakeSession {
    /// Method names in call order.
    pub calls: RefCell<Vec<String>>,
    /// Scripts passed to `execute_code`, probe excluded.
    pub scripts: RefCell<Vec<String>>,
    /// Output of the view probe; `None` makes the probe fail.
    pub probe_output: Option<String>,
    /// Reply to every state-changing request.
    pub reply: RemoteResult,
    /// Primary requests fail at the transport level.
    pub transport_down: bool,
    /// Screenshot bytes; `None` makes the capture fail.
    pub screenshot: Option<Vec<u8>>,
    /// Parts library listing.
    pub parts: Vec<String>,
    /// Open documents.
    pub documents: Vec<String>,
}

/// Wraps printed text the way the addon's `execute_code` reports it.
pub fn addon_output(printed: &str) -> String {
    format!("Python code execution scheduled. \nOutput: {printed}\n")
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            scripts: RefCell::new(Vec::new()),
            probe_output: Some(addon_output("MCP_VIEW_PROBE:View3DInventorPy|1")),
            reply: RemoteResult::Success("ok".to_string()),
            transport_down: false,
            screenshot: Some(b"\x89PNG".to_vec()),
            parts: Vec::new(),
            documents: Vec::new(),
        }
    }
}

impl FakeSession {
    /// Session whose active view has the given type name.
    pub fn with_view(view_type: &str) -> Self {
        Self {
            probe_output: Some(addon_output(&format!("MCP_VIEW_PROBE:{view_type}|1"))),
            ..Self::default()
        }
    }

    /// Recorded method names.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of screenshot requests made.
    pub fn screenshot_requests(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| *c == "get_active_screenshot")
            .count()
    }

    fn record(&self, method: &str) -> RpcResult<()> {
        self.calls.borrow_mut().push(method.to_string());
        if self.transport_down {
            return Err(RpcError::Status { status: 502 });
        }
        Ok(())
    }
}

impl CadSession for FakeSession {
    fn address(&self) -> &str {
        "fake"
    }

    async fn ping(&self) -> RpcResult<bool> {
        Ok(true)
    }

    async fn create_document(&self, _name: &str) -> RpcResult<RemoteResult> {
        self.record("create_document")?;
        Ok(self.reply.clone())
    }

    async fn create_object(&self, _doc_name: &str, _spec: &ObjectSpec) -> RpcResult<RemoteResult> {
        self.record("create_object")?;
        Ok(self.reply.clone())
    }

    async fn edit_object(
        &self,
        _doc_name: &str,
        _obj_name: &str,
        _edit: &ObjectEdit,
    ) -> RpcResult<RemoteResult> {
        self.record("edit_object")?;
        Ok(self.reply.clone())
    }

    async fn delete_object(&self, _doc_name: &str, _obj_name: &str) -> RpcResult<RemoteResult> {
        self.record("delete_object")?;
        Ok(self.reply.clone())
    }

    async fn insert_part_from_library(&self, _relative_path: &str) -> RpcResult<RemoteResult> {
        self.record("insert_part_from_library")?;
        Ok(self.reply.clone())
    }

    async fn execute_code(&self, code: &str) -> RpcResult<RemoteResult> {
        if code == VIEW_PROBE {
            self.calls.borrow_mut().push("view_probe".to_string());
            return self
                .probe_output
                .clone()
                .map(RemoteResult::Success)
                .ok_or_else(|| RpcError::malformed("probe unavailable"));
        }
        self.record("execute_code")?;
        self.scripts.borrow_mut().push(code.to_string());
        Ok(self.reply.clone())
    }

    async fn get_objects(&self, doc_name: &str) -> RpcResult<Json> {
        self.record("get_objects")?;
        Ok(json!([{"Name": "Box", "Document": doc_name}]))
    }

    async fn get_object(&self, _doc_name: &str, obj_name: &str) -> RpcResult<Json> {
        self.record("get_object")?;
        Ok(json!({"Name": obj_name, "TypeId": "Part::Box"}))
    }

    async fn get_parts_list(&self) -> RpcResult<Vec<String>> {
        self.record("get_parts_list")?;
        Ok(self.parts.clone())
    }

    async fn list_documents(&self) -> RpcResult<Vec<String>> {
        self.record("list_documents")?;
        Ok(self.documents.clone())
    }

    async fn get_active_screenshot(&self, _view_name: &str) -> RpcResult<Option<Vec<u8>>> {
        self.calls
            .borrow_mut()
            .push("get_active_screenshot".to_string());
        self.screenshot
            .clone()
            .map(Some)
            .ok_or(RpcError::Status { status: 500 })
    }
}

/// Connector handing out one prepared [`FakeSession`].
#[derive(Debug)]
pub struct FakeConnector {
    session: RefCell<Option<FakeSession>>,
}

impl FakeConnector {
    /// Connector that yields `session` on the first connect.
    pub fn new(session: FakeSession) -> Self {
        Self {
            session: RefCell::new(Some(session)),
        }
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    fn address(&self) -> String {
        "fake".to_string()
    }

    fn connect(&self) -> RpcResult<FakeSession> {
        Ok(self.session.borrow_mut().take().unwrap_or_default())
    }
}
