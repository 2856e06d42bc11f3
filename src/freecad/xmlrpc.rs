//! XML-RPC value model and wire encoding.
//!
//! The FreeCAD addon serves Python's `SimpleXMLRPCServer`, so this module
//! speaks the dialect Python's `xmlrpc` produces and accepts:
//!
//! - `<int>`, `<i4>`, `<i8>`, `<boolean>`, `<string>`, `<double>`,
//!   `<base64>`, `<dateTime.iso8601>`, `<array>`, `<struct>` and `<nil/>`
//! - a `<value>` without a type element is a string
//! - faults are a struct with `faultCode` and `faultString`

use std::fmt::Write as _;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use indexmap::IndexMap;
use quick_xml::escape::escape;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

use crate::freecad::error::{RpcError, RpcResult};

/// A single XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<int>`, `<i4>` or `<i8>`.
    Int(i64),
    /// `<boolean>`.
    Bool(bool),
    /// `<string>` or untyped text.
    String(String),
    /// `<double>`.
    Double(f64),
    /// `<dateTime.iso8601>`, kept verbatim.
    DateTime(String),
    /// `<base64>`, already decoded.
    Base64(Vec<u8>),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<struct>`, in wire order.
    Struct(IndexMap<String, Value>),
    /// `<nil/>`.
    Nil,
}

impl Value {
    /// Returns the boolean if this is a `<boolean>`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the text if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the items if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a struct member.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Struct(members) => members.get(key),
            _ => None,
        }
    }

    /// Builds a struct from `(name, value)` pairs, keeping their order.
    pub fn structure<K: Into<String>>(members: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Struct(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Converts into JSON for reporting back to the MCP client.
    ///
    /// Binary data becomes a base64 string; non-finite doubles become `null`.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Int(i) => Json::from(i),
            Self::Bool(b) => Json::Bool(b),
            Self::String(s) | Self::DateTime(s) => Json::String(s),
            Self::Double(d) => serde_json::Number::from_f64(d).map_or(Json::Null, Json::Number),
            Self::Base64(bytes) => Json::String(BASE64_STANDARD.encode(bytes)),
            Self::Array(items) => Json::Array(items.into_iter().map(Self::into_json).collect()),
            Self::Struct(members) => Json::Object(
                members
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
            Self::Nil => Json::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<serde_json::Value> for Value {
    /// Integers that fit in `i64` stay integers; every other number becomes
    /// a double, since XML-RPC has no unsigned or big integer type.
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Nil,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Double(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Json::Object(members) => {
                Self::Struct(members.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

// ==================== Encoding ====================

/// Encodes a `<methodCall>` document.
#[must_use]
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        write_value(&mut xml, param);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>\n");
    xml
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            let _ = write!(out, "<int>{i}</int>");
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{d}</double>");
        }
        Value::DateTime(s) => {
            let _ = write!(
                out,
                "<dateTime.iso8601>{}</dateTime.iso8601>",
                escape(s.as_str())
            );
        }
        Value::Base64(bytes) => {
            let _ = write!(out, "<base64>{}</base64>", BASE64_STANDARD.encode(bytes));
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

// ==================== Decoding ====================

/// Decodes a `<methodResponse>` document.
///
/// # Errors
///
/// Returns [`RpcError::Fault`] for fault responses, and an XML or
/// malformed-message error when the document is not a valid response.
pub fn parse_response(xml: &str) -> RpcResult<Value> {
    let mut parser = Parser::new(xml);
    parser.expect_start("methodResponse")?;

    match parser.next_event()? {
        Event::Start(e) if e.name().as_ref() == b"params" => {
            parser.expect_start("param")?;
            let value = parser.value()?;
            parser.expect_end("param")?;
            parser.expect_end("params")?;
            parser.expect_end("methodResponse")?;
            Ok(value)
        }
        Event::Start(e) if e.name().as_ref() == b"fault" => Err(fault_from(&parser.value()?)),
        other => Err(unexpected_event("<params> or <fault>", &other)),
    }
}

fn fault_from(value: &Value) -> RpcError {
    let code = match value.get("faultCode") {
        Some(Value::Int(code)) => *code,
        _ => 0,
    };
    let message = value
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or("unknown fault")
        .to_string();
    RpcError::Fault { code, message }
}

fn unexpected_event(expected: &str, found: &Event<'_>) -> RpcError {
    let found = match found {
        Event::Start(e) => format!("<{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Empty(e) => format!("<{}/>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Text(_) | Event::CData(_) => "text".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "markup".to_string(),
    };
    RpcError::malformed(format!("expected {expected}, found {found}"))
}

fn is_blank(text: &BytesText<'_>) -> bool {
    text.unescape().is_ok_and(|s| s.trim().is_empty())
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
        }
    }

    /// Next structural event: prolog noise and whitespace between elements
    /// are skipped.
    fn next_event(&mut self) -> RpcResult<Event<'a>> {
        loop {
            let event = self.reader.read_event()?;
            match event {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(ref t) if is_blank(t) => {}
                _ => return Ok(event),
            }
        }
    }

    fn expect_start(&mut self, tag: &str) -> RpcResult<()> {
        match self.next_event()? {
            Event::Start(e) if e.name().as_ref() == tag.as_bytes() => Ok(()),
            other => Err(unexpected_event(&format!("<{tag}>"), &other)),
        }
    }

    fn expect_end(&mut self, tag: &str) -> RpcResult<()> {
        match self.next_event()? {
            Event::End(e) if e.name().as_ref() == tag.as_bytes() => Ok(()),
            other => Err(unexpected_event(&format!("</{tag}>"), &other)),
        }
    }

    /// Reads character data up to the closing `tag`, whitespace included.
    fn text_until(&mut self, tag: &[u8]) -> RpcResult<String> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(e) if e.name().as_ref() == tag => return Ok(text),
                Event::Comment(_) => {}
                other => {
                    let tag = String::from_utf8_lossy(tag);
                    return Err(unexpected_event(&format!("text or </{tag}>"), &other));
                }
            }
        }
    }

    /// Reads a whole `<value>` element.
    fn value(&mut self) -> RpcResult<Value> {
        match self.next_event()? {
            Event::Start(e) if e.name().as_ref() == b"value" => self.value_body(),
            Event::Empty(e) if e.name().as_ref() == b"value" => Ok(Value::String(String::new())),
            other => Err(unexpected_event("<value>", &other)),
        }
    }

    /// Reads the content of a `<value>` whose start tag is already consumed.
    fn value_body(&mut self) -> RpcResult<Value> {
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(t) => text.push_str(&t.unescape()?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(e) => {
                    let value = self.typed(e.name().as_ref())?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::Empty(e) => {
                    let value = empty_typed(e.name().as_ref())?;
                    self.expect_end("value")?;
                    return Ok(value);
                }
                Event::End(e) if e.name().as_ref() == b"value" => return Ok(Value::String(text)),
                Event::Comment(_) => {}
                other => return Err(unexpected_event("value content", &other)),
            }
        }
    }

    fn typed(&mut self, tag: &[u8]) -> RpcResult<Value> {
        match tag {
            b"string" => Ok(Value::String(self.text_until(tag)?)),
            b"int" | b"i4" | b"i8" => {
                let raw = self.text_until(tag)?;
                raw.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| RpcError::malformed(format!("invalid integer '{raw}'")))
            }
            b"boolean" => match self.text_until(tag)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(RpcError::malformed(format!("invalid boolean '{other}'"))),
            },
            b"double" => {
                let raw = self.text_until(tag)?;
                raw.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| RpcError::malformed(format!("invalid double '{raw}'")))
            }
            b"dateTime.iso8601" => Ok(Value::DateTime(self.text_until(tag)?.trim().to_string())),
            b"base64" => {
                let raw: String = self
                    .text_until(tag)?
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                Ok(Value::Base64(BASE64_STANDARD.decode(raw)?))
            }
            b"nil" => {
                self.text_until(tag)?;
                Ok(Value::Nil)
            }
            b"array" => self.array(),
            b"struct" => self.members(),
            other => Err(RpcError::malformed(format!(
                "unknown value type <{}>",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn array(&mut self) -> RpcResult<Value> {
        let mut items = Vec::new();
        match self.next_event()? {
            Event::Empty(e) if e.name().as_ref() == b"data" => {}
            Event::Start(e) if e.name().as_ref() == b"data" => loop {
                match self.next_event()? {
                    Event::Start(e) if e.name().as_ref() == b"value" => {
                        items.push(self.value_body()?);
                    }
                    Event::Empty(e) if e.name().as_ref() == b"value" => {
                        items.push(Value::String(String::new()));
                    }
                    Event::End(e) if e.name().as_ref() == b"data" => break,
                    other => return Err(unexpected_event("<value> or </data>", &other)),
                }
            },
            other => return Err(unexpected_event("<data>", &other)),
        }
        self.expect_end("array")?;
        Ok(Value::Array(items))
    }

    fn members(&mut self) -> RpcResult<Value> {
        let mut members = IndexMap::new();
        loop {
            match self.next_event()? {
                Event::Start(e) if e.name().as_ref() == b"member" => {
                    self.expect_start("name")?;
                    let name = self.text_until(b"name")?;
                    let value = self.value()?;
                    self.expect_end("member")?;
                    members.insert(name, value);
                }
                Event::End(e) if e.name().as_ref() == b"struct" => {
                    return Ok(Value::Struct(members));
                }
                other => return Err(unexpected_event("<member> or </struct>", &other)),
            }
        }
    }
}

/// Value of a self-closing type element such as `<nil/>` or `<string/>`.
fn empty_typed(tag: &[u8]) -> RpcResult<Value> {
    match tag {
        b"nil" => Ok(Value::Nil),
        b"string" => Ok(Value::String(String::new())),
        b"base64" => Ok(Value::Base64(Vec::new())),
        b"array" => Ok(Value::Array(Vec::new())),
        b"struct" => Ok(Value::Struct(IndexMap::new())),
        other => Err(RpcError::malformed(format!(
            "empty <{}/> carries no value",
            String::from_utf8_lossy(other)
        ))),
    }
}
