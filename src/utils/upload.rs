use std::collections::HashMap;
use std::io;
use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::app_state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Metadata of one uploaded file after it has been written to the upload
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub field_name: String,
    pub original_name: String,
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to process multipart data: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store uploaded file: {0}")]
    Io(#[from] io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Multipart(_) => AppError::validation(err.to_string()),
            UploadError::Io(e) => AppError::dependency("Failed to store uploaded file", e),
        }
    }
}

/// A request body split into text fields and stored files.
///
/// Multipart bodies have every file part written to the upload directory
/// before the handler runs. JSON bodies are accepted too and yield text
/// fields only, so the same handler serves both kinds of client.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: Vec<StoredFile>,
}

impl FromRequest<AppState> for UploadForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation(rejection.body_text()))?;
            let form = UploadForm::from_multipart(multipart, &state.config.upload_dir).await?;
            return Ok(form);
        }

        if content_type.starts_with("application/json") {
            let JsonBody(map) = JsonBody::<Map<String, Value>>::from_request(req, state).await?;
            return Ok(UploadForm::from_json(map));
        }

        Err(AppError::validation(
            "Expected a multipart/form-data or application/json body",
        ))
    }
}

impl UploadForm {
    /// Reads every part of `multipart`, storing file parts under `upload_dir`.
    /// Files written before a failure are removed again.
    pub async fn from_multipart(
        mut multipart: Multipart,
        upload_dir: &Path,
    ) -> Result<Self, UploadError> {
        let mut form = UploadForm::default();
        if let Err(err) = form.read_parts(&mut multipart, upload_dir).await {
            form.discard().await;
            return Err(err);
        }
        Ok(form)
    }

    pub fn from_json(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .filter_map(|(key, value)| json_text(value).map(|text| (key, text)))
            .collect();
        UploadForm {
            fields,
            files: Vec::new(),
        }
    }

    async fn read_parts(
        &mut self,
        multipart: &mut Multipart,
        upload_dir: &Path,
    ) -> Result<(), UploadError> {
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_owned);
            match file_name.as_deref() {
                // A file input left empty by the browser.
                Some("") => continue,
                Some(_) => {
                    let stored = store_file(upload_dir, name, field).await?;
                    self.files.push(stored);
                }
                None => {
                    let value = field.text().await?;
                    self.fields.insert(name, value);
                }
            }
        }
        Ok(())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    pub fn files_for<'a>(&'a self, field_name: &'a str) -> impl Iterator<Item = &'a StoredFile> {
        self.files.iter().filter(move |file| file.field_name == field_name)
    }

    /// Keeps only the files stored under `field_name`; the rest are removed
    /// from disk.
    pub async fn retain_field(&mut self, field_name: &str) {
        let (kept, others): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|file| file.field_name == field_name);
        self.files = kept;
        remove_paths(&stored_paths(&others)).await;
    }

    /// The file stored under `field_name`, if any. More than one is a
    /// validation error carrying `message`.
    pub fn single_file<'a>(
        &'a self,
        field_name: &'a str,
        message: &str,
    ) -> Result<Option<&'a StoredFile>, AppError> {
        let mut files = self.files_for(field_name);
        let first = files.next();
        if files.next().is_some() {
            return Err(AppError::validation(message));
        }
        Ok(first)
    }

    /// Removes every stored file from disk. Best-effort.
    pub async fn discard(&self) {
        remove_paths(&stored_paths(self.files.iter())).await;
    }

    /// Passes `result` through, discarding the stored files when it is an
    /// error so a rejected request leaves nothing behind in the upload dir.
    pub async fn discard_on_err<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        if result.is_err() {
            self.discard().await;
        }
        result
    }
}

/// Owned copies of the paths of `files`, collected before any removal is
/// awaited so no borrowing iterator lives inside the handler future.
pub fn stored_paths<'a>(files: impl IntoIterator<Item = &'a StoredFile>) -> Vec<String> {
    files.into_iter().map(|file| file.file_path.clone()).collect()
}

/// Deletes files from the upload directory. Missing files are only logged.
pub async fn remove_paths(paths: &[String]) {
    for path in paths {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed uploaded file {path}"),
            Err(err) => warn!("Failed to remove uploaded file {path}: {err}"),
        }
    }
}

/// `<timestamp>-<fieldname><extension>`, with the field name and extension
/// reduced to filename-safe characters.
pub fn generate_file_name(millis: i64, field_name: &str, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(sanitize)
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{millis}-{}{extension}", sanitize(field_name))
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(false) => Some(String::new()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

async fn store_file(
    upload_dir: &Path,
    field_name: String,
    mut field: Field<'_>,
) -> Result<StoredFile, UploadError> {
    let original_name = field.file_name().unwrap_or_default().to_owned();
    let file_type = field
        .content_type()
        .map(str::to_owned)
        .unwrap_or_else(|| {
            mime_guess::from_path(&original_name)
                .first_or_octet_stream()
                .to_string()
        });

    fs::create_dir_all(upload_dir).await?;
    let (file_name, mut file) = create_unique(upload_dir, &field_name, &original_name).await?;
    let file_path = upload_dir.join(&file_name);

    if let Err(err) = copy_field(&mut field, &mut file).await {
        drop(file);
        fs::remove_file(&file_path).await.ok();
        return Err(err);
    }

    debug!("Stored upload {original_name} as {}", file_path.display());
    Ok(StoredFile {
        field_name,
        original_name,
        file_name,
        file_type,
        file_path: file_path.to_string_lossy().into_owned(),
    })
}

async fn copy_field(field: &mut Field<'_>, file: &mut fs::File) -> Result<(), UploadError> {
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Opens a fresh file for the upload. Two uploads landing on the same
/// millisecond with the same field name get consecutive timestamps.
async fn create_unique(
    upload_dir: &Path,
    field_name: &str,
    original_name: &str,
) -> io::Result<(String, fs::File)> {
    let mut millis = Utc::now().timestamp_millis();
    for _ in 0..MAX_NAME_ATTEMPTS {
        let file_name = generate_file_name(millis, field_name, original_name);
        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(upload_dir.join(&file_name))
            .await;
        match opened {
            Ok(file) => return Ok((file_name, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => millis += 1,
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "could not allocate a unique upload file name",
    ))
}
