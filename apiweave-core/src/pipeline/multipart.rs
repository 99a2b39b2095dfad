use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::HttpError;
use crate::http::body::Body;
use crate::http::extract::{FromRequest, Multipart, Request};
use crate::http::{HeaderMap, CONTENT_TYPE};
use crate::schema::Schema;

/// A file received in a `multipart/form-data` body.
///
/// Deserializable from the validated `files` input, so typed inputs can
/// hold `UploadedFile` (or `Vec<UploadedFile>`) fields directly.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// The original file name provided by the client.
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The file name with any client-side directory stripped.
    pub fn secure_filename(&self) -> &str {
        self.filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.filename)
    }

    /// The file as seen by schemas and validators:
    /// `{"filename", "content_type", "size", "data"}`, data in base64.
    pub fn descriptor(&self) -> Value {
        json!({
            "filename": self.filename,
            "content_type": self.content_type,
            "size": self.data.len(),
            "data": STANDARD.encode(&self.data),
        })
    }
}

#[derive(Deserialize)]
struct Descriptor {
    filename: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    data: String,
}

impl<'de> Deserialize<'de> for UploadedFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let descriptor = Descriptor::deserialize(deserializer)?;
        let data = STANDARD
            .decode(descriptor.data.as_bytes())
            .map_err(D::Error::custom)?;
        Ok(UploadedFile {
            filename: descriptor.filename,
            content_type: descriptor.content_type,
            data: Bytes::from(data),
        })
    }
}

impl Serialize for UploadedFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.descriptor().serialize(serializer)
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

fn malformed(message: String) -> HttpError {
    HttpError::bad_request("Malformed multipart body.")
        .detail(json!({ "files": [message] }))
}

/// Collect a buffered multipart body into `{name: value}`: text parts as
/// strings, file parts as [`UploadedFile::descriptor`]s. Names declared as
/// list fields in `schema` gather every part; others keep the first.
///
/// A request that is not multipart yields an empty map, so required fields
/// are reported as missing.
pub(crate) async fn collect_multipart(
    headers: &HeaderMap,
    bytes: Bytes,
    schema: Option<&Schema>,
) -> Result<Map<String, Value>, HttpError> {
    let mut out = Map::new();
    if !is_multipart(headers) {
        return Ok(out);
    }

    let mut request = Request::new(Body::from(bytes));
    *request.headers_mut() = headers.clone();
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| malformed(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| malformed(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| malformed(e.body_text()))?;

        let value = match filename {
            Some(filename) => UploadedFile {
                filename,
                content_type,
                data,
            }
            .descriptor(),
            None => Value::String(String::from_utf8_lossy(&data).into_owned()),
        };

        let is_list = schema
            .and_then(|s| s.fields().iter().find(|(n, f)| f.external_key(n) == name))
            .is_some_and(|(_, f)| f.is_list());
        if is_list {
            match out.entry(name).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        } else {
            out.entry(name).or_insert(value);
        }
    }
    Ok(out)
}
