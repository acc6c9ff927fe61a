use crate::config::Config;
use galleria_core::operations::{
    AddPhotoOperation, AddPhotoOperationRequest, CreateGalleryOperation,
    CreateGalleryOperationRequest, EmptyGalleryOperation, EmptyGalleryOperationRequest,
    HealChainOperation, HealChainOperationOutcome, HealChainOperationRequest,
    InsertPhotoOperation, InsertPhotoOperationRequest, InsertPosition, ListGalleriesOperation,
    ListPhotosOperation, ListPhotosOperationRequest, MovePhotoOperation,
    MovePhotoOperationRequest, PhotoIndexOperation, PhotoIndexOperationRequest, PhotoUpload,
    ReadPhotoOperation, ReadPhotoOperationRequest, RemoveGalleryOperation,
    RemoveGalleryOperationRequest, RemovePhotoOperation, RemovePhotoOperationRequest,
    RenameGalleryOperation, RenameGalleryOperationRequest, ReorderPhotosOperation,
    ReorderPhotosOperationRequest, SwapPhotosOperation, SwapPhotosOperationRequest,
    UpdateDetailsOperation, UpdateGalleryDetailsRequest, UpdatePhotoDetailsRequest,
};
use galleria_core::{
    DynBlobStore, DynRecordStore, DynTranscoder, FsBlobStore, GalleryError, ImageTranscoder,
    MetadataStore, Photo, PhotoId, Result,
};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub struct ServerState {
    pub records: DynRecordStore,
    pub blobs: DynBlobStore,
    pub transcoder: DynTranscoder,
    pub config: Config,
}

impl ServerState {
    pub fn from_config(config: Config) -> Result<Self> {
        let records = MetadataStore::new(config.database_path())?;
        let blobs = FsBlobStore::new(config.data_dir.clone())?;
        let transcoder = ImageTranscoder::new(config.transcode);

        Ok(Self {
            records: Arc::new(records),
            blobs: Arc::new(blobs),
            transcoder: Arc::new(transcoder),
            config,
        })
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateGalleryBody {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct UpdateGalleryBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListPhotosQuery {
    #[serde(default)]
    sorted: bool,
    #[serde(default)]
    quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReorderBody {
    order: Vec<PhotoId>,
}

#[derive(Debug, Deserialize)]
struct UpdatePhotoBody {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MovePhotoBody {
    gallery: String,
}

#[derive(Debug, Deserialize)]
struct SwapPhotosBody {
    first: PhotoId,
    second: PhotoId,
}

pub async fn run_server(config: Config) -> Result<()> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(ServerState::from_config(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/galleries", get(list_galleries).post(create_gallery))
        .route(
            "/galleries/:name",
            get(get_gallery).patch(update_gallery).delete(remove_gallery),
        )
        .route("/galleries/:name/empty", post(empty_gallery))
        .route(
            "/galleries/:name/photos",
            get(list_photos).post(upload_to_gallery),
        )
        .route("/galleries/:name/order", put(reorder_photos))
        .route("/galleries/:name/check", get(check_chain))
        .route("/galleries/:name/repair", post(repair_chain))
        .route("/photos", post(upload_to_default))
        .route("/photos/swap", post(swap_photos))
        .route(
            "/photos/:id",
            get(get_photo).patch(update_photo).delete(remove_photo),
        )
        .route("/photos/:id/data/:quality", get(read_photo_data))
        .route("/photos/:id/index", get(photo_index))
        .route("/photos/:id/move", post(move_photo))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn status_for(error: &GalleryError) -> StatusCode {
    match error {
        GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
        GalleryError::DuplicateKey(_) => StatusCode::CONFLICT,
        GalleryError::InvalidArgument(_)
        | GalleryError::IndexOutOfRange { .. }
        | GalleryError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
        GalleryError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn success<T: Serialize>(status: StatusCode, data: T) -> Response {
    let resp = ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    };
    (status, axum::Json(resp)).into_response()
}

fn failure(error: GalleryError) -> Response {
    let status = status_for(&error);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", error);
    }

    let resp = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
    };
    (status, axum::Json(resp)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T>) -> Response {
    match result {
        Ok(data) => success(status, data),
        Err(error) => failure(error),
    }
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let galleries = state.records.list_galleries().await.map(|g| g.len());
    respond(
        StatusCode::OK,
        galleries.map(|count| serde_json::json!({ "status": "ok", "galleries": count })),
    )
}

async fn list_galleries(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let result = ListGalleriesOperation::new(state.records.clone())
        .run()
        .await
        .map(|result| result.galleries);
    respond(StatusCode::OK, result)
}

async fn create_gallery(
    State(state): State<Arc<ServerState>>,
    axum::Json(body): axum::Json<CreateGalleryBody>,
) -> impl IntoResponse {
    let result = CreateGalleryOperation::new(state.records.clone())
        .run(CreateGalleryOperationRequest {
            name: body.name,
            description: body.description,
        })
        .await
        .map(|result| result.gallery);
    respond(StatusCode::CREATED, result)
}

async fn get_gallery(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let result = ListGalleriesOperation::new(state.records.clone())
        .get(&name)
        .await;
    respond(StatusCode::OK, result)
}

async fn update_gallery(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    axum::Json(body): axum::Json<UpdateGalleryBody>,
) -> impl IntoResponse {
    let mut name = name;

    if let Some(new_name) = body.name {
        let renamed = RenameGalleryOperation::new(state.records.clone())
            .run(RenameGalleryOperationRequest {
                name: name.clone(),
                new_name,
            })
            .await;
        match renamed {
            Ok(result) => name = result.gallery.name,
            Err(error) => return failure(error),
        }
    }

    let result = match body.description {
        Some(description) => {
            UpdateDetailsOperation::new(state.records.clone())
                .update_gallery(UpdateGalleryDetailsRequest {
                    name: name.clone(),
                    description,
                })
                .await
        }
        None => state.records.get_gallery(&name).await,
    };
    respond(StatusCode::OK, result)
}

async fn remove_gallery(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let result = RemoveGalleryOperation::new(state.records.clone())
        .run(RemoveGalleryOperationRequest { name: name.clone() })
        .await
        .map(|_| serde_json::json!({ "name": name }));
    respond(StatusCode::OK, result)
}

async fn empty_gallery(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let result = EmptyGalleryOperation::new(state.records.clone(), state.blobs.clone())
        .run(EmptyGalleryOperationRequest { name })
        .await
        .map(|result| serde_json::json!({ "removed": result.removed }));
    respond(StatusCode::OK, result)
}

async fn list_photos(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    Query(query): Query<ListPhotosQuery>,
) -> impl IntoResponse {
    let result = ListPhotosOperation::new(state.records.clone(), state.blobs.clone())
        .run(ListPhotosOperationRequest {
            gallery: name,
            sorted: query.sorted,
            quality: query.quality,
        })
        .await
        .map(|result| result.items);
    respond(StatusCode::OK, result)
}

async fn reorder_photos(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    axum::Json(body): axum::Json<ReorderBody>,
) -> impl IntoResponse {
    let result = ReorderPhotosOperation::new(state.records.clone())
        .run(ReorderPhotosOperationRequest {
            gallery: name,
            order: body.order,
        })
        .await
        .map(|result| result.order);
    respond(StatusCode::OK, result)
}

async fn check_chain(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    heal(&state, name, false).await
}

async fn repair_chain(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    heal(&state, name, true).await
}

async fn heal(state: &ServerState, gallery: String, repair: bool) -> Response {
    let outcome = HealChainOperation::new(state.records.clone())
        .run(HealChainOperationRequest { gallery, repair })
        .await;

    match outcome {
        Ok(HealChainOperationOutcome::Checked(report)) => success(StatusCode::OK, report),
        Ok(HealChainOperationOutcome::Repaired(outcome)) => success(StatusCode::OK, outcome),
        Err(error) => failure(error),
    }
}

/// Multipart upload fields: `file` plus optional `title`, `description`,
/// `gallery`, and at most one of `index`, `before` and `after`.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Bytes>,
    title: Option<String>,
    description: Option<String>,
    gallery: Option<String>,
    index: Option<String>,
    before: Option<String>,
    after: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let invalid = |error: axum::extract::multipart::MultipartError| {
        GalleryError::InvalidArgument(format!("malformed upload: {}", error))
    };

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            form.file = Some(field.bytes().await.map_err(invalid)?);
            continue;
        }

        let value = field.text().await.map_err(invalid)?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "gallery" => form.gallery = Some(value),
            "index" => form.index = Some(value),
            "before" => form.before = Some(value),
            "after" => form.after = Some(value),
            other => tracing::debug!("Ignoring upload field {}", other),
        }
    }
    Ok(form)
}

/// `pinned` is set when the caller named the gallery; anchored inserts must
/// then land in that gallery.
async fn store_upload(
    state: &ServerState,
    gallery: String,
    pinned: bool,
    form: UploadForm,
) -> Result<Photo> {
    let UploadForm {
        file,
        title,
        description,
        gallery: _,
        index,
        before,
        after,
    } = form;

    let data = file.ok_or_else(|| {
        GalleryError::InvalidArgument("upload has no file field".to_string())
    })?;
    let upload = PhotoUpload {
        data,
        title,
        description,
    };

    let position = match (index, before, after) {
        (None, None, None) => None,
        (Some(index), None, None) => {
            let index = index.trim().parse::<i64>().map_err(|_| {
                GalleryError::InvalidArgument(format!("invalid index: {}", index))
            })?;
            Some(InsertPosition::AtIndex {
                gallery: gallery.clone(),
                index,
            })
        }
        (None, Some(before), None) => Some(InsertPosition::Before(PhotoId::from(before))),
        (None, None, Some(after)) => Some(InsertPosition::After(PhotoId::from(after))),
        _ => {
            return Err(GalleryError::InvalidArgument(
                "at most one of index, before and after may be given".to_string(),
            ));
        }
    };

    if pinned {
        if let Some(InsertPosition::Before(anchor) | InsertPosition::After(anchor)) = &position {
            let anchor = state.records.get_photo(anchor).await?;
            if anchor.gallery != gallery {
                return Err(GalleryError::InvalidArgument(format!(
                    "photo {} belongs to gallery {}, not {}",
                    anchor.id, anchor.gallery, gallery
                )));
            }
        }
    }

    match position {
        None => {
            AddPhotoOperation::new(
                state.records.clone(),
                state.blobs.clone(),
                state.transcoder.clone(),
            )
            .run(AddPhotoOperationRequest { gallery, upload })
            .await
            .map(|result| result.photo)
        }
        Some(position) => {
            InsertPhotoOperation::new(
                state.records.clone(),
                state.blobs.clone(),
                state.transcoder.clone(),
            )
            .run(InsertPhotoOperationRequest { position, upload })
            .await
            .map(|result| result.photo)
        }
    }
}

async fn upload_to_gallery(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    multipart: Multipart,
) -> impl IntoResponse {
    let result = match read_upload_form(multipart).await {
        Ok(form) => store_upload(&state, name, true, form).await,
        Err(error) => Err(error),
    };
    respond(StatusCode::CREATED, result)
}

async fn upload_to_default(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let result = match read_upload_form(multipart).await {
        Ok(form) => {
            let named = form
                .gallery
                .clone()
                .filter(|gallery| !gallery.trim().is_empty());
            let pinned = named.is_some();
            let gallery = named.unwrap_or_else(|| state.config.default_gallery.clone());
            store_upload(&state, gallery, pinned, form).await
        }
        Err(error) => Err(error),
    };
    respond(StatusCode::CREATED, result)
}

async fn get_photo(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let result = ReadPhotoOperation::new(state.records.clone(), state.blobs.clone())
        .run(ReadPhotoOperationRequest {
            photo_id: PhotoId::from(id),
            quality: None,
        })
        .await
        .map(|result| result.photo);
    respond(StatusCode::OK, result)
}

async fn read_photo_data(
    State(state): State<Arc<ServerState>>,
    Path((id, quality)): Path<(String, String)>,
) -> Response {
    let result = ReadPhotoOperation::new(state.records.clone(), state.blobs.clone())
        .run(ReadPhotoOperationRequest {
            photo_id: PhotoId::from(id),
            quality: Some(quality),
        })
        .await;

    match result {
        Ok(result) => match result.data {
            Some(data) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, data.content_type)],
                data.body,
            )
                .into_response(),
            None => failure(GalleryError::NotFound(format!(
                "data of photo {}",
                result.photo.id
            ))),
        },
        Err(error) => failure(error),
    }
}

async fn update_photo(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<UpdatePhotoBody>,
) -> impl IntoResponse {
    let result = UpdateDetailsOperation::new(state.records.clone())
        .update_photo(UpdatePhotoDetailsRequest {
            photo_id: PhotoId::from(id),
            title: body.title,
            description: body.description.map(Some),
        })
        .await;
    respond(StatusCode::OK, result)
}

async fn remove_photo(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let result = RemovePhotoOperation::new(state.records.clone(), state.blobs.clone())
        .run(RemovePhotoOperationRequest {
            photo_id: PhotoId::from(id),
        })
        .await
        .map(|result| result.photo);
    respond(StatusCode::OK, result)
}

async fn photo_index(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let result = PhotoIndexOperation::new(state.records.clone())
        .run(PhotoIndexOperationRequest {
            photo_id: PhotoId::from(id),
        })
        .await
        .map(|result| serde_json::json!({ "gallery": result.gallery, "index": result.index }));
    respond(StatusCode::OK, result)
}

async fn move_photo(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    axum::Json(body): axum::Json<MovePhotoBody>,
) -> impl IntoResponse {
    let result = MovePhotoOperation::new(state.records.clone())
        .run(MovePhotoOperationRequest {
            photo_id: PhotoId::from(id),
            gallery: body.gallery,
        })
        .await
        .map(|result| result.photo);
    respond(StatusCode::OK, result)
}

async fn swap_photos(
    State(state): State<Arc<ServerState>>,
    axum::Json(body): axum::Json<SwapPhotosBody>,
) -> impl IntoResponse {
    let result = SwapPhotosOperation::new(state.records.clone())
        .run(SwapPhotosOperationRequest {
            first: body.first,
            second: body.second,
        })
        .await
        .map(|result| serde_json::json!({ "gallery": result.gallery, "writes": result.writes }));
    respond(StatusCode::OK, result)
}
