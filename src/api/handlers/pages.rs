use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        AddFeedbackRequest, CreatePageInput, Feedback, GratitudePage, PageWithFeedback,
        PhotoUpload,
    },
    services::pages::PagesService,
    AppState,
};

fn pages_service(state: &AppState) -> PagesService {
    PagesService::new(
        state.pages.clone(),
        state.media.clone(),
        state.config.pages.clone(),
    )
}

pub async fn create_page(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<GratitudePage>)> {
    let mut input = CreatePageInput::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "photos" | "photos[]" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;

                // Browsers send an empty part for an untouched file input.
                if data.is_empty() {
                    continue;
                }

                input.photos.push(PhotoUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            "creatorName" | "lovedOneName" | "nickname" | "message" | "wishes" | "theme" => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read {}: {}", name, e))
                })?;
                let slot = match name.as_str() {
                    "creatorName" => &mut input.creator_name,
                    "lovedOneName" => &mut input.loved_one_name,
                    "nickname" => &mut input.nickname,
                    "message" => &mut input.message,
                    "wishes" => &mut input.wishes,
                    _ => &mut input.theme,
                };
                *slot = Some(value);
            }
            _ => {}
        }
    }

    let page = pages_service(&state).create_page(input).await?;

    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> AppResult<Json<PageWithFeedback>> {
    let view = pages_service(&state).get_page(&page_id).await?;

    Ok(Json(view))
}

pub async fn add_feedback(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Feedback>)> {
    let req = feedback_request(&body)?;
    let feedback = pages_service(&state).add_feedback(&page_id, req).await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Every feedback field is optional, so an empty body means "all defaults".
fn feedback_request(body: &[u8]) -> AppResult<AddFeedbackRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AddFeedbackRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid feedback body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_feedback_body_uses_defaults() {
        for body in [&b""[..], &b"  \n"[..]] {
            let req = feedback_request(body).unwrap();
            assert!(req.name.is_none() && req.emoji.is_none() && req.message.is_none());
        }
    }

    #[test]
    fn malformed_feedback_body_is_bad_request() {
        let err = feedback_request(b"{\"name\":").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
