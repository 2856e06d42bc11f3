//! XML-RPC client for the FreeCAD addon.
//!
//! The addon serves `SimpleXMLRPCServer` on `http://{host}:{port}/RPC2`.
//! One [`RpcClient`] is one session: it holds a pooled HTTP client and the
//! endpoint URL. No timeout is configured, so a long `execute_code` waits for
//! FreeCAD to answer.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::freecad::error::{RpcError, RpcResult};
use crate::freecad::session::{CadSession, Connector};
use crate::freecad::types::{ObjectEdit, ObjectSpec, RemoteResult};
use crate::freecad::xmlrpc::{self, Value};

/// Port the FreeCAD addon listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9875;

/// Returns the XML-RPC endpoint URL for a host and port.
#[must_use]
pub fn endpoint_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}/RPC2")
}

/// An XML-RPC session with one FreeCAD instance.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Creates a client for `host:port` without contacting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(host: &str, port: u16) -> RpcResult<Self> {
        // FreeCAD normally runs next to us; environment proxies would only get in the way.
        let http = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            http,
            url: endpoint_url(host, port),
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Performs one method call and decodes the response.
    async fn call(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        let body = xmlrpc::encode_call(method, params);
        debug!(method, bytes = body.len(), "XML-RPC call");

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        trace!(method, response = %text, "XML-RPC response");
        xmlrpc::parse_response(&text)
    }

    async fn call_result(
        &self,
        method: &str,
        params: &[Value],
        payload_key: &str,
    ) -> RpcResult<RemoteResult> {
        let value = self.call(method, params).await?;
        RemoteResult::decode(method, &value, payload_key)
    }

    async fn call_string_list(&self, method: &str) -> RpcResult<Vec<String>> {
        let value = self.call(method, &[]).await?;
        let items = value
            .as_array()
            .ok_or_else(|| RpcError::unexpected(method, "expected an array"))?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| RpcError::unexpected(method, "expected an array of strings"))
            })
            .collect()
    }
}

impl CadSession for RpcClient {
    fn address(&self) -> &str {
        &self.url
    }

    async fn ping(&self) -> RpcResult<bool> {
        let value = self.call("ping", &[]).await?;
        value
            .as_bool()
            .ok_or_else(|| RpcError::unexpected("ping", "expected a boolean"))
    }

    async fn create_document(&self, name: &str) -> RpcResult<RemoteResult> {
        self.call_result("create_document", &[Value::from(name)], "document_name")
            .await
    }

    async fn create_object(&self, doc_name: &str, spec: &ObjectSpec) -> RpcResult<RemoteResult> {
        self.call_result(
            "create_object",
            &[Value::from(doc_name), spec.to_value()],
            "object_name",
        )
        .await
    }

    async fn edit_object(
        &self,
        doc_name: &str,
        obj_name: &str,
        edit: &ObjectEdit,
    ) -> RpcResult<RemoteResult> {
        self.call_result(
            "edit_object",
            &[Value::from(doc_name), Value::from(obj_name), edit.to_value()],
            "object_name",
        )
        .await
    }

    async fn delete_object(&self, doc_name: &str, obj_name: &str) -> RpcResult<RemoteResult> {
        self.call_result(
            "delete_object",
            &[Value::from(doc_name), Value::from(obj_name)],
            "object_name",
        )
        .await
    }

    async fn insert_part_from_library(&self, relative_path: &str) -> RpcResult<RemoteResult> {
        self.call_result(
            "insert_part_from_library",
            &[Value::from(relative_path)],
            "message",
        )
        .await
    }

    async fn execute_code(&self, code: &str) -> RpcResult<RemoteResult> {
        self.call_result("execute_code", &[Value::from(code)], "message")
            .await
    }

    async fn get_objects(&self, doc_name: &str) -> RpcResult<Json> {
        Ok(self
            .call("get_objects", &[Value::from(doc_name)])
            .await?
            .into_json())
    }

    async fn get_object(&self, doc_name: &str, obj_name: &str) -> RpcResult<Json> {
        Ok(self
            .call(
                "get_object",
                &[Value::from(doc_name), Value::from(obj_name)],
            )
            .await?
            .into_json())
    }

    async fn get_parts_list(&self) -> RpcResult<Vec<String>> {
        self.call_string_list("get_parts_list").await
    }

    async fn list_documents(&self) -> RpcResult<Vec<String>> {
        self.call_string_list("list_documents").await
    }

    async fn get_active_screenshot(&self, view_name: &str) -> RpcResult<Option<Vec<u8>>> {
        let value = self
            .call("get_active_screenshot", &[Value::from(view_name)])
            .await?;

        let bytes = match value {
            Value::Nil => return Ok(None),
            Value::Base64(bytes) => bytes,
            Value::String(encoded) => {
                let compact: String = encoded
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                BASE64_STANDARD.decode(compact)?
            }
            _ => {
                return Err(RpcError::unexpected(
                    "get_active_screenshot",
                    "expected base64 image data",
                ))
            }
        };

        Ok((!bytes.is_empty()).then_some(bytes))
    }
}

/// Connects to FreeCAD over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    host: String,
    port: u16,
}

impl HttpConnector {
    /// Creates a connector for `host:port`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl Connector for HttpConnector {
    type Session = RpcClient;

    fn address(&self) -> String {
        endpoint_url(&self.host, self.port)
    }

    fn connect(&self) -> RpcResult<RpcClient> {
        RpcClient::new(&self.host, self.port)
    }
}
