//! Request bodies accepted by the gateway and their validation
//!
//! Each body is checked once: required fields first (400), then the shared
//! password (403). Only a fully validated request reaches the relay.

use serde::Deserialize;
use serde_json::Value;

use crate::config::DEFAULT_TOP_K;
use crate::errors::{RelayError, RelayResult};
use crate::relay::{CreateIndexParams, Document, SearchParams, UpsertParams};

const SEARCH_FIELDS: &str = "password, indexName, query, and nameSpace are required fields.";
const UPSERT_FIELDS: &str =
    "password, indexName, document, nameSpace, and chunkSize are required fields.";
const CREATE_INDEX_FIELDS: &str = "password and indexName are required fields.";

// Fields stay untyped JSON so a value of the wrong type is judged by the same
// presence and password checks as everything else.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub password: Option<Value>,
    pub index_name: Option<Value>,
    pub name_space: Option<Value>,
    pub query: Option<Value>,
    pub top_k: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRequest {
    pub password: Option<Value>,
    pub index_name: Option<Value>,
    pub name_space: Option<Value>,
    pub document: Option<Value>,
    pub chunk_size: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndexRequest {
    pub password: Option<Value>,
    pub index_name: Option<Value>,
}

impl SearchRequest {
    pub fn validate(self, secret: &str) -> RelayResult<SearchParams> {
        let missing = || RelayError::MissingField(SEARCH_FIELDS.to_string());
        let password = required(self.password).ok_or_else(missing)?;
        let index_name = required(self.index_name).ok_or_else(missing)?;
        let namespace = required(self.name_space).ok_or_else(missing)?;
        let query = required(self.query).ok_or_else(missing)?;
        check_password(&password, secret)?;

        Ok(SearchParams {
            index_name: text_field("indexName", index_name)?,
            namespace: text_field("nameSpace", namespace)?,
            query: text_field("query", query)?,
            top_k: top_k(self.top_k)?,
        })
    }
}

impl UpsertRequest {
    pub fn validate(self, secret: &str) -> RelayResult<UpsertParams> {
        let missing = || RelayError::MissingField(UPSERT_FIELDS.to_string());
        let password = required(self.password).ok_or_else(missing)?;
        let index_name = required(self.index_name).ok_or_else(missing)?;
        let namespace = required(self.name_space).ok_or_else(missing)?;
        let document = required(self.document)
            .filter(has_memory_text)
            .ok_or_else(missing)?;
        let chunk_size = required(self.chunk_size).ok_or_else(missing)?;
        check_password(&password, secret)?;

        let document: Document = serde_json::from_value(document)
            .map_err(|e| RelayError::MalformedField(format!("document is invalid: {}", e)))?;

        Ok(UpsertParams {
            index_name: text_field("indexName", index_name)?,
            namespace: text_field("nameSpace", namespace)?,
            chunk_size,
            document,
        })
    }
}

impl CreateIndexRequest {
    pub fn validate(self, secret: &str) -> RelayResult<CreateIndexParams> {
        let missing = || RelayError::MissingField(CREATE_INDEX_FIELDS.to_string());
        let password = required(self.password).ok_or_else(missing)?;
        let index_name = required(self.index_name).ok_or_else(missing)?;
        check_password(&password, secret)?;

        Ok(CreateIndexParams {
            index_name: text_field("indexName", index_name)?,
        })
    }
}

fn required(field: Option<Value>) -> Option<Value> {
    field.filter(truthy)
}

/// JSON values that count as "not provided": null, false, 0 and "".
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// An object document needs its text up front; any other shape fails later.
fn has_memory_text(document: &Value) -> bool {
    match document {
        Value::Object(fields) => fields.get("memoryText").map_or(false, truthy),
        _ => true,
    }
}

fn check_password(password: &Value, secret: &str) -> RelayResult<()> {
    match password {
        Value::String(password) if password == secret => Ok(()),
        _ => Err(RelayError::Unauthorized),
    }
}

fn text_field(name: &str, value: Value) -> RelayResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RelayError::MalformedField(format!(
            "{} must be a string, got {}",
            name, other
        ))),
    }
}

fn top_k(value: Option<Value>) -> RelayResult<usize> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_TOP_K),
        Some(value) => value
            .as_u64()
            .filter(|&k| k > 0)
            .and_then(|k| usize::try_from(k).ok())
            .ok_or_else(|| {
                RelayError::InvalidArguments("topK must be a positive integer.".to_string())
            }),
    }
}
