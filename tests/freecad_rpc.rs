//! End-to-end tests against a local fake of the FreeCAD XML-RPC addon.
//!
//! The fake speaks just enough HTTP/1.1 for reqwest: it reads one request at
//! a time from each connection, records the `methodName`, and answers with a
//! canned XML-RPC document chosen by the test.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use freecad_mcp::feedback::FeedbackMode;
use freecad_mcp::freecad::{
    CadSession, ConnectionError, Connector, HttpConnector, RemoteResult, RpcError, SessionManager,
};
use freecad_mcp::mcp::protocol::ToolContent;
use freecad_mcp::mcp::ToolDispatcher;

type Responder = fn(&str, &str) -> String;

/// Recorded method names, in call order.
type Log = Arc<Mutex<Vec<String>>>;

fn response(value: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><params><param><value>{value}</value></param></params></methodResponse>"
    )
}

fn result_struct(success: bool, key: &str, text: &str) -> String {
    response(&format!(
        "<struct><member><name>success</name><value><boolean>{}</boolean></value></member>\
         <member><name>{key}</name><value><string>{text}</string></value></member></struct>",
        u8::from(success)
    ))
}

fn fault(code: i32, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>{code}</int></value></member>\
         <member><name>faultString</name><value><string>{message}</string></value></member>\
         </struct></value></fault></methodResponse>"
    )
}

fn method_name(body: &str) -> String {
    body.split_once("<methodName>")
        .and_then(|(_, rest)| rest.split_once("</methodName>"))
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}

/// Reads one request, returning its body, or `None` once the peer hangs up.
async fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<String> {
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..header_end + length]).into_owned();
    buf.drain(..header_end + length);
    Some(body)
}

async fn handle(mut stream: TcpStream, responder: Responder, log: Log) {
    let mut buf = Vec::new();
    while let Some(body) = read_request(&mut stream, &mut buf).await {
        let method = method_name(&body);
        let reply = responder(&method, &body);
        log.lock().unwrap().push(method);

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n",
            reply.len()
        );
        if stream.write_all(head.as_bytes()).await.is_err()
            || stream.write_all(reply.as_bytes()).await.is_err()
        {
            return;
        }
    }
}

async fn fake_freecad(responder: Responder) -> (SocketAddr, Log) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Log::default();

    let accept_log = Arc::clone(&log);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle(stream, responder, Arc::clone(&accept_log)));
        }
    });

    (addr, log)
}

fn calls(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A healthy FreeCAD with a 3D view open.
fn healthy(method: &str, body: &str) -> String {
    match method {
        "ping" => response("<boolean>1</boolean>"),
        "create_document" => result_struct(true, "document_name", "Foo"),
        "create_object" => result_struct(false, "error", "DuplicateName"),
        "execute_code" if body.contains("MCP_VIEW_PROBE") => result_struct(
            true,
            "message",
            "Python code execution scheduled. \nOutput: MCP_VIEW_PROBE:View3DInventorPy|1\n",
        ),
        "execute_code" => result_struct(true, "message", "42"),
        // "\x89PNG"
        "get_active_screenshot" => response("<base64>iVBORw==</base64>"),
        "get_parts_list" => response("<array><data></data></array>"),
        "list_documents" => response(
            "<array><data><value><string>Foo</string></value><value>Bar</value></data></array>",
        ),
        "get_objects" => response(
            "<array><data><value><struct><member><name>Name</name><value><string>Box</string></value></member></struct></value></data></array>",
        ),
        "delete_object" => fault(1, "&lt;class 'Exception'&gt;:Object not found"),
        _ => fault(1, "method not supported"),
    }
}

/// FreeCAD that answers `ping` with `false`.
fn refuses_ping(method: &str, _body: &str) -> String {
    match method {
        "ping" => response("<boolean>0</boolean>"),
        _ => fault(1, "unexpected"),
    }
}

#[tokio::test]
async fn client_round_trips_typed_calls() {
    let (addr, log) = fake_freecad(healthy).await;
    let client = HttpConnector::new("127.0.0.1", addr.port()).connect().unwrap();

    assert!(client.ping().await.unwrap());
    assert_eq!(
        client.create_document("Foo").await.unwrap(),
        RemoteResult::Success("Foo".to_string())
    );
    assert_eq!(
        client.list_documents().await.unwrap(),
        ["Foo".to_string(), "Bar".to_string()]
    );
    assert!(client.get_parts_list().await.unwrap().is_empty());
    assert_eq!(
        client.get_active_screenshot("Isometric").await.unwrap(),
        Some(b"\x89PNG".to_vec())
    );
    assert_eq!(
        client.get_objects("Foo").await.unwrap(),
        json!([{"Name": "Box"}])
    );

    assert_eq!(
        calls(&log),
        [
            "ping",
            "create_document",
            "list_documents",
            "get_parts_list",
            "get_active_screenshot",
            "get_objects"
        ]
    );
}

#[tokio::test]
async fn fault_surfaces_as_rpc_error() {
    let (addr, _log) = fake_freecad(healthy).await;
    let client = HttpConnector::new("127.0.0.1", addr.port()).connect().unwrap();

    match client.delete_object("Foo", "Ghost").await {
        Err(RpcError::Fault { code, message }) => {
            assert_eq!(code, 1);
            assert_eq!(message, "<class 'Exception'>:Object not found");
        }
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_fails_to_connect() {
    // Bind and drop to find a port with nothing listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut sessions = SessionManager::new(HttpConnector::new("127.0.0.1", port));
    let err = sessions.get().await.unwrap_err();
    assert!(matches!(err, ConnectionError::Unreachable { .. }));
    assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    assert!(!sessions.is_connected());
}

#[tokio::test]
async fn session_requires_ping_acknowledgement() {
    let (addr, log) = fake_freecad(refuses_ping).await;
    let mut sessions = SessionManager::new(HttpConnector::new("127.0.0.1", addr.port()));

    assert!(sessions.get().await.is_err());
    assert!(!sessions.is_connected());
    assert_eq!(calls(&log), ["ping"]);
}

#[tokio::test]
async fn session_is_reused_after_first_ping() {
    let (addr, log) = fake_freecad(healthy).await;
    let mut tools = ToolDispatcher::new(
        HttpConnector::new("127.0.0.1", addr.port()),
        FeedbackMode::TextAndImage,
    );

    tools.call("list_documents", &json!({})).await;
    tools.call("list_documents", &json!({})).await;

    assert_eq!(calls(&log), ["ping", "list_documents", "list_documents"]);
}

#[tokio::test]
async fn execute_code_attaches_screenshot() {
    let (addr, log) = fake_freecad(healthy).await;
    let mut tools = ToolDispatcher::new(
        HttpConnector::new("127.0.0.1", addr.port()),
        FeedbackMode::TextAndImage,
    );

    let result = tools
        .call("execute_code", &json!({"code": "print(6 * 7)"}))
        .await;

    assert!(!result.is_error);
    assert_eq!(result.content.len(), 2);
    assert_eq!(
        result.content[0],
        ToolContent::text("Code executed successfully: 42")
    );
    assert!(matches!(
        &result.content[1],
        ToolContent::Image { data, mime_type } if data == b"\x89PNG" && mime_type == "image/png"
    ));
    assert_eq!(
        calls(&log),
        ["ping", "execute_code", "execute_code", "get_active_screenshot"]
    );
}

#[tokio::test]
async fn remote_failure_is_reported_with_preview() {
    let (addr, _log) = fake_freecad(healthy).await;
    let mut tools = ToolDispatcher::new(
        HttpConnector::new("127.0.0.1", addr.port()),
        FeedbackMode::TextAndImage,
    );

    let result = tools
        .call(
            "create_object",
            &json!({"doc_name": "Foo", "obj_type": "Part::Box", "obj_name": "Box"}),
        )
        .await;

    assert_eq!(result.content.len(), 2);
    assert_eq!(
        result.content[0],
        ToolContent::text("Failed to create object: DuplicateName")
    );
    assert!(matches!(result.content[1], ToolContent::Image { .. }));
}

#[tokio::test]
async fn text_only_mode_never_requests_screenshots() {
    let (addr, log) = fake_freecad(healthy).await;
    let mut tools = ToolDispatcher::new(
        HttpConnector::new("127.0.0.1", addr.port()),
        FeedbackMode::TextOnly,
    );

    let result = tools.call("execute_code", &json!({"code": "x = 1"})).await;
    assert_eq!(
        result.content,
        vec![ToolContent::text("Code executed successfully: 42")]
    );
    assert_eq!(calls(&log), ["ping", "execute_code"]);
}
