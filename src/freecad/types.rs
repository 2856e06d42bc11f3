//! Request and result types exchanged with FreeCAD.

use serde_json::{Map, Value as Json};

use crate::freecad::error::{RpcError, RpcResult};
use crate::freecad::xmlrpc::Value;

/// Outcome of a state-changing remote call.
///
/// The addon answers with a struct carrying a `success` flag and either a
/// payload member (`document_name`, `object_name` or `message`) or `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResult {
    /// The call succeeded; holds the payload member.
    Success(String),
    /// FreeCAD reported a failure; holds its error text.
    Failure(String),
}

impl RemoteResult {
    /// Decodes a result struct, reading the payload from `payload_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedResponse`] if the value is not a struct
    /// with a boolean `success`, or a successful result lacks its payload.
    pub fn decode(method: &str, value: &Value, payload_key: &str) -> RpcResult<Self> {
        let Some(success) = value.get("success").and_then(Value::as_bool) else {
            return Err(RpcError::unexpected(
                method,
                "missing boolean 'success' member",
            ));
        };

        if success {
            let payload = value.get(payload_key).ok_or_else(|| {
                RpcError::unexpected(method, format!("missing '{payload_key}' member"))
            })?;
            Ok(Self::Success(member_text(payload)))
        } else {
            let error = value
                .get("error")
                .map_or_else(|| "unknown error".to_string(), member_text);
            Ok(Self::Failure(error))
        }
    }

    /// Returns `true` for [`RemoteResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

fn member_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.clone().into_json().to_string(), str::to_string)
}

/// Everything needed to create one document object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    /// Object name inside the document.
    pub name: String,
    /// FreeCAD type id, e.g. `Part::Box` or `Fem::ConstraintFixed`.
    pub type_id: String,
    /// Initial property values.
    pub properties: Map<String, Json>,
    /// FEM analysis to add the object to.
    pub analysis: Option<String>,
}

impl ObjectSpec {
    /// Encodes the struct the addon's `create_object` expects.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::structure([
            ("Name", Value::from(self.name.as_str())),
            ("Type", Value::from(self.type_id.as_str())),
            ("Properties", Value::from(Json::Object(self.properties.clone()))),
            (
                "Analysis",
                self.analysis.as_deref().map_or(Value::Nil, Value::from),
            ),
        ])
    }
}

/// Property changes for an existing object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectEdit {
    /// Properties to set.
    pub properties: Map<String, Json>,
}

impl ObjectEdit {
    /// Encodes the struct the addon's `edit_object` expects.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::structure([(
            "Properties",
            Value::from(Json::Object(self.properties.clone())),
        )])
    }
}
