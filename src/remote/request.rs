//! Request descriptions handed to [`RemoteClient`](super::RemoteClient).

use reqwest::Method;
use serde_json::Value;

use super::ApiError;

/// How a request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Multipart,
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormField {
    Text(String, String),
    File(String, FilePart),
}

/// Multipart form kept as plain data until send time, so requests stay `Clone`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<FormField>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::Text(name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.fields.push(FormField::File(name.into(), file));
        self
    }

    /// Attach `file` only when present.
    pub fn maybe_file(self, name: impl Into<String>, file: Option<FilePart>) -> Self {
        match file {
            Some(file) => self.file(name, file),
            None => self,
        }
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|f| match f {
                FormField::Text(name, _) | FormField::File(name, _) => name.as_str(),
            })
            .collect()
    }

    pub(crate) fn into_reqwest(self) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for field in self.fields {
            form = match field {
                FormField::Text(name, value) => form.text(name, value),
                FormField::File(name, file) => {
                    let part = reqwest::multipart::Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.mime)
                        .map_err(|e| ApiError::invalid(format!("Invalid mime type: {}", e)))?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Request body in one of the two supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn encoding(&self) -> Encoding {
        match self {
            RequestBody::Json(_) => Encoding::Json,
            RequestBody::Multipart(_) => Encoding::Multipart,
        }
    }
}

/// One API call: method, path relative to the base URL, optional body, and
/// whether the bearer credential should be attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<RequestBody>,
    pub auth_required: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth_required: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach the stored credential as a bearer token.
    pub fn authenticated(mut self) -> Self {
        self.auth_required = true;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Encoding of the body; bodiless requests count as JSON.
    pub fn encoding(&self) -> Encoding {
        self.body
            .as_ref()
            .map_or(Encoding::Json, RequestBody::encoding)
    }
}
