use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use entity::{activity, file, project, task};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Action, Resource, can_perform};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    activity::record,
    content::ContentStore,
    http::AppState,
    routes::{UserSummary, user_summaries},
    session::CurrentUser,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub size: i64,
    pub mime_type: String,
    pub uploaded_by: Uuid,
    pub uploader: Option<UserSummary>,
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FilePayload {
    fn new(model: file::Model, uploader: Option<UserSummary>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: format!("/uploads/{}", model.storage_name),
            size: model.size,
            mime_type: model.mime_type,
            uploaded_by: model.uploaded_by,
            uploader,
            task_id: model.task_id,
            project_id: model.project_id,
            description: model.description,
            created_at: model.created_at.into(),
        }
    }
}

async fn shape_one(state: &AppState, model: file::Model) -> ApiResult<FilePayload> {
    let summaries = user_summaries(&state.pool, &[model.uploaded_by]).await?;
    let uploader = summaries.get(&model.uploaded_by).cloned();
    Ok(FilePayload::new(model, uploader))
}

struct UploadForm {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
    task_id: Option<Uuid>,
    project_id: Option<Uuid>,
    description: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut file_part: Option<(String, String, Vec<u8>)> = None;
    let mut task_id = None;
    let mut project_id = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::validation(format!("invalid multipart payload: {err}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::validation(format!("failed to read upload: {err}")))?;
                file_part = Some((file_name, mime_type, bytes.to_vec()));
            }
            "task_id" | "taskId" => {
                task_id = Some(parse_field_uuid("task_id", field).await?);
            }
            "project_id" | "projectId" => {
                project_id = Some(parse_field_uuid("project_id", field).await?);
            }
            "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::validation(format!("invalid description: {err}")))?;
                description = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, mime_type, bytes) =
        file_part.ok_or_else(|| ApiError::validation("multipart field 'file' is required"))?;
    Ok(UploadForm {
        file_name,
        mime_type,
        bytes,
        task_id,
        project_id,
        description,
    })
}

async fn parse_field_uuid(
    name: &'static str,
    field: axum::extract::multipart::Field<'_>,
) -> ApiResult<Uuid> {
    let text = field
        .text()
        .await
        .map_err(|err| ApiError::validation(format!("invalid {name}: {err}")))?;
    Uuid::parse_str(text.trim()).map_err(|_| ApiError::validation(format!("invalid {name}")))
}

pub async fn upload(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<FilePayload>)> {
    let form = read_upload_form(multipart).await?;
    if form.bytes.is_empty() {
        return Err(ApiError::validation("uploaded file is empty"));
    }
    if let Some(task_id) = form.task_id {
        task::Entity::find_by_id(task_id)
            .one(&state.pool)
            .await?
            .ok_or(ApiError::NotFound("task"))?;
    }
    if let Some(project_id) = form.project_id {
        project::Entity::find_by_id(project_id)
            .one(&state.pool)
            .await?
            .ok_or(ApiError::NotFound("project"))?;
    }

    // Content first, metadata second: a failed metadata write may orphan the
    // stored bytes, which is tolerated.
    let storage_name = ContentStore::storage_name(&form.file_name);
    state
        .content
        .save(&storage_name, &form.bytes)
        .await
        .map_err(|err| ApiError::internal(anyhow::anyhow!("failed to store upload: {err}")))?;

    let inserted = file::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(form.file_name),
        storage_name: Set(storage_name),
        size: Set(form.bytes.len() as i64),
        mime_type: Set(form.mime_type),
        uploaded_by: Set(current.id),
        task_id: Set(form.task_id),
        project_id: Set(form.project_id),
        description: Set(form.description),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.pool)
    .await?;
    record(
        &state.pool,
        activity::Action::UploadFile,
        format!("uploaded file \"{}\"", inserted.name),
        current.id,
        inserted.project_id,
        inserted.task_id,
    )
    .await?;
    let payload = shape_one(&state, inserted).await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

#[derive(Deserialize)]
pub struct FileQuery {
    #[serde(rename = "taskId")]
    pub task_id: Option<Uuid>,
    #[serde(rename = "projectId")]
    pub project_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<Vec<FilePayload>>> {
    let mut select = file::Entity::find();
    if let Some(task_id) = query.task_id {
        select = select.filter(file::Column::TaskId.eq(task_id));
    }
    if let Some(project_id) = query.project_id {
        select = select.filter(file::Column::ProjectId.eq(project_id));
    }
    let records = select
        .order_by_desc(file::Column::CreatedAt)
        .all(&state.pool)
        .await?;
    let uploader_ids: Vec<Uuid> = records.iter().map(|f| f.uploaded_by).collect();
    let summaries = user_summaries(&state.pool, &uploader_ids).await?;
    Ok(Json(
        records
            .into_iter()
            .map(|model| {
                let uploader = summaries.get(&model.uploaded_by).cloned();
                FilePayload::new(model, uploader)
            })
            .collect(),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FilePayload>> {
    let model = file::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("file"))?;
    Ok(Json(shape_one(&state, model).await?))
}

pub async fn download(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    if filename.contains('/') || filename.contains("..") {
        return Err(ApiError::validation("invalid file name"));
    }
    let model = file::Entity::find()
        .filter(file::Column::StorageName.eq(filename))
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("file"))?;
    let bytes = state
        .content
        .read(&model.storage_name)
        .await
        .map_err(|_| ApiError::NotFound("file content"))?;
    let headers = [
        (header::CONTENT_TYPE, model.mime_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", model.name),
        ),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let model = file::Entity::find_by_id(id)
        .one(&state.pool)
        .await?
        .ok_or(ApiError::NotFound("file"))?;
    let project_owner_id = match model.project_id {
        Some(project_id) => project::Entity::find_by_id(project_id)
            .one(&state.pool)
            .await?
            .map(|p| p.owner_id),
        None => None,
    };
    can_perform(
        &current.actor(),
        Action::DeleteFile,
        &Resource::File {
            uploaded_by: model.uploaded_by,
            project_owner_id,
        },
    )
    .map_err(|denial| ApiError::forbidden(denial.to_string()))?;

    // Physical removal is best-effort: already-missing content must not keep
    // the metadata row alive.
    if let Err(err) = state.content.remove(&model.storage_name).await {
        warn!(storage_name = %model.storage_name, error = %err, "failed to remove file content");
    }
    file::Entity::delete_by_id(model.id)
        .exec(&state.pool)
        .await?;
    record(
        &state.pool,
        activity::Action::DeleteFile,
        format!("deleted file \"{}\"", model.name),
        current.id,
        model.project_id,
        model.task_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
