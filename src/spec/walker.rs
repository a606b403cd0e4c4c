//! Endpoint iteration over a document's `paths` mapping.
//!
//! Yields endpoints in declared path order, then declared method order within a path.
//! Keys outside the verb set (`parameters`, `summary`, `x-` extensions, `head`, ...) are
//! skipped. Calling [`SpecWalker::endpoints`] again restarts from the first endpoint.

use crate::error::GenerationError;
use crate::spec::{json_type_name, EndpointDescriptor, HttpMethod, Operation};
use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct SpecWalker<'a> {
    paths: &'a Map<String, Value>,
}

impl<'a> SpecWalker<'a> {
    pub fn new(paths: &'a Map<String, Value>) -> Self {
        Self { paths }
    }

    /// Locate `paths` in a document root.
    pub fn from_document(root: &'a Value) -> Result<Self, GenerationError> {
        match root.get("paths") {
            Some(Value::Object(paths)) => Ok(Self::new(paths)),
            Some(other) => Err(GenerationError::Input(format!(
                "`paths` must be a mapping, got {}",
                json_type_name(other)
            ))),
            None => Err(GenerationError::Input(
                "Document has no `paths` mapping".to_string(),
            )),
        }
    }

    /// Lazily decode endpoints in declaration order.
    pub fn endpoints(&self) -> impl Iterator<Item = EndpointDescriptor> + 'a {
        self.paths
            .iter()
            .filter_map(|(path, item)| match item.as_object() {
                Some(methods) => Some((path, methods)),
                None => {
                    warn!(path = %path, "Path item is not a mapping; skipping");
                    None
                }
            })
            .flat_map(|(path, methods)| {
                methods
                    .iter()
                    .filter_map(move |(key, op)| decode_endpoint(path, key, op))
            })
    }
}

fn decode_endpoint(path: &str, key: &str, op: &Value) -> Option<EndpointDescriptor> {
    let Some(method) = HttpMethod::from_key(key) else {
        debug!(path = %path, key = %key, "Skipping non-operation key");
        return None;
    };
    if !op.is_object() {
        warn!(
            path = %path,
            method = %method,
            found = json_type_name(op),
            "Operation is not a mapping; generating without its details"
        );
    }
    Some(EndpointDescriptor {
        method,
        path: path.to_string(),
        operation: Operation::from_value(op),
    })
}
