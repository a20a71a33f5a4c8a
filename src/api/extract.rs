// src/api/extract.rs
//! Request extractors whose rejections use the JSON envelope instead of
//! axum's plain-text defaults.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use ulid::Ulid;

use crate::error::AppError;
use crate::store::Store;

/// `Query<T>` with envelope-shaped rejections.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(QueryParams(value))
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Body of a create/update request: a JSON object, or `multipart/form-data`
/// whose text parts become string fields and whose `image` part is kept
/// as an [`Upload`].
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub fields: Map<String, Value>,
    pub image: Option<Upload>,
}

impl<S> FromRequest<S> for FormInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !multipart {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            return Ok(FormInput { fields, image: None });
        }

        let mut form = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        let mut input = FormInput::default();
        while let Some(field) = form
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                if !bytes.is_empty() {
                    input.image = Some(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(e.body_text()))?;
                input.fields.insert(name, Value::String(text));
            }
        }
        Ok(input)
    }
}

impl FormInput {
    pub fn from_json(fields: Value) -> Self {
        Self {
            fields: fields.as_object().cloned().unwrap_or_default(),
            image: None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, AppError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| AppError::validation(format!("{key} must be a whole number"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| AppError::validation(format!("{key} must be a whole number"))),
            Some(_) => Err(AppError::validation(format!("{key} must be a whole number"))),
        }
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, AppError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "true" | "1" | "on" | "yes" => Ok(Some(true)),
                "false" | "0" | "off" | "no" => Ok(Some(false)),
                _ => Err(AppError::validation(format!("{key} must be true or false"))),
            },
            Some(_) => Err(AppError::validation(format!("{key} must be true or false"))),
        }
    }
}

/// Optional JSON body of a PATCH toggle, e.g. `{"active": false}`. An empty
/// body (or a missing key) means "flip the current value".
pub fn toggle_value(body: &Bytes, key: &str) -> Result<Option<bool>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::validation(format!("invalid JSON body: {e}")))?;
    FormInput::from_json(value).flag(key)
}

/// Upload an image part and return its public URL.
pub async fn store_image(store: &Store, bucket: &str, upload: Upload) -> Result<String, AppError> {
    if !upload.content_type.starts_with("image/") {
        return Err(AppError::validation("image must be an image file"));
    }
    let clean: String = upload
        .file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let path = format!("{}-{}", Ulid::new().to_string().to_lowercase(), clean);
    store
        .backend()
        .upload(bucket, &path, upload.bytes, &upload.content_type)
        .await
        .map_err(AppError::upstream("uploading the image"))
}
