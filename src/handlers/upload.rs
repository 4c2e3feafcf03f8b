use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::StatusCode,
};

use crate::{
    errors::{AppError, Result},
    handlers::{ApiResponse, AppState},
    middleware::AuthenticatedUser,
    models::{MultiUploadResponse, RejectedFile, UploadQuery, UploadType, UploadedFile},
    utils::file,
};

pub const MAX_FILES_PER_REQUEST: usize = 20;

struct PendingFile {
    original_name: String,
    mime_type: String,
    data: Vec<u8>,
}

/// Files under `file_field` plus the optional `type` form field.
struct UploadForm {
    files: Vec<PendingFile>,
    type_field: Option<String>,
}

fn multipart_error(e: MultipartError, max_file_size: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge(max_file_size)
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", e.body_text()))
    }
}

async fn read_form(
    multipart: &mut Multipart,
    file_field: &str,
    max_files: usize,
    max_file_size: usize,
) -> Result<UploadForm> {
    let mut form = UploadForm {
        files: Vec::new(),
        type_field: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "type" {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_file_size))?;
            form.type_field = Some(value);
            continue;
        }

        if name != file_field {
            continue;
        }

        if form.files.len() >= max_files {
            return Err(AppError::Validation(format!(
                "At most {} files can be uploaded at once",
                max_files
            )));
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = file::resolve_mime_type(field.content_type(), &original_name);
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_file_size))?
            .to_vec();

        form.files.push(PendingFile {
            original_name,
            mime_type,
            data,
        });
    }

    Ok(form)
}

/// Query string wins over the form field; absent means wardrobe.
fn upload_type(query: Option<&str>, form: Option<&str>) -> Result<UploadType> {
    match query.or(form).map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(UploadType::default()),
        Some(value) => UploadType::parse(value)
            .ok_or_else(|| AppError::Validation(format!("Unknown upload type: {}", value))),
    }
}

async fn store(state: &AppState, upload_type: UploadType, pending: PendingFile) -> Result<UploadedFile> {
    let max = state.config.max_file_size;
    if pending.data.len() > max {
        return Err(AppError::FileTooLarge(max));
    }

    let extension = file::validate_image(&pending.original_name, &pending.mime_type, &pending.data)?;
    let filename = file::generate_filename(&extension);
    let url = state
        .storage
        .store_bytes(upload_type, &filename, &pending.data)
        .await?;

    Ok(UploadedFile {
        url,
        filename,
        original_name: pending.original_name,
        size: pending.data.len(),
        mimetype: pending.mime_type,
    })
}

pub async fn upload_image(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadedFile>> {
    let form = read_form(&mut multipart, "image", 1, state.config.max_file_size).await?;
    let upload_type = upload_type(query.upload_type.as_deref(), form.type_field.as_deref())?;

    let pending = form.files.into_iter().next().ok_or(AppError::NoFile)?;
    let uploaded = store(&state, upload_type, pending).await?;

    tracing::info!("Uploaded {} ({} bytes)", uploaded.url, uploaded.size);
    Ok(ApiResponse::ok(uploaded))
}

pub async fn upload_images(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<ApiResponse<MultiUploadResponse>> {
    let form = read_form(
        &mut multipart,
        "images",
        MAX_FILES_PER_REQUEST,
        state.config.max_file_size,
    )
    .await?;
    let upload_type = upload_type(query.upload_type.as_deref(), form.type_field.as_deref())?;

    if form.files.is_empty() {
        return Err(AppError::NoFiles);
    }

    let mut files = Vec::new();
    let mut errors = Vec::new();
    for pending in form.files {
        let filename = pending.original_name.clone();
        match store(&state, upload_type, pending).await {
            Ok(uploaded) => files.push(uploaded),
            Err(AppError::InvalidFileType) => errors.push(RejectedFile {
                filename,
                error: "Invalid file type".to_string(),
            }),
            Err(AppError::FileTooLarge(_)) => errors.push(RejectedFile {
                filename,
                error: "File too large".to_string(),
            }),
            Err(other) => return Err(other),
        }
    }

    tracing::info!("Uploaded {} file(s), rejected {}", files.len(), errors.len());
    Ok(ApiResponse::ok(MultiUploadResponse {
        files,
        errors: (!errors.is_empty()).then_some(errors),
    }))
}
