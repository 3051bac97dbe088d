//! Upload storage: classifies incoming files by extension into the
//! kind-specific areas of the uploads tree and hands back their public
//! `/uploads/...` references.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use log::warn;
use serde_json::{json, Value};

use crate::config::StorageConfig;
use crate::shared::errors::ApiError;
use crate::shared::state::AppState;
use crate::shared::utils::next_record_id;
use crate::store::models::LessonContent;

const DOCUMENT_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];
const SLIDE_DECK_EXTENSIONS: [&str; 2] = ["ppt", "pptx"];
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    SlideDeck,
    Video,
    Other,
}

pub fn classify(file_name: &str) -> FileKind {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Document
    } else if SLIDE_DECK_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::SlideDeck
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Video
    } else {
        FileKind::Other
    }
}

/// Collision-resistant stored name: timestamp prefix + original name.
pub fn stored_name(original: &str) -> String {
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), original)
}

/// Writes one uploaded lesson file into its kind-specific directory and
/// records its reference in the content bundle. Files matching none of the
/// known kinds land in the lessons root and are logged, not attached.
/// The single handout slot goes to the first document file; later documents
/// are stored but not referenced.
pub async fn store_lesson_file(
    storage: &StorageConfig,
    original: &str,
    data: &[u8],
    content: &mut LessonContent,
) -> Result<(), ApiError> {
    let name = stored_name(original);
    let kind = classify(original);
    let (dir, reference) = match kind {
        FileKind::Document => (
            storage.handouts_dir(),
            Some(format!("/uploads/lessons/handouts/{}", name)),
        ),
        FileKind::SlideDeck => (
            storage.slide_decks_dir(),
            Some(format!("/uploads/lessons/slidedecks/{}", name)),
        ),
        FileKind::Video => (
            storage.videos_dir(),
            Some(format!("/uploads/lessons/videos/{}", name)),
        ),
        FileKind::Other => (storage.lessons_dir(), None),
    };
    tokio::fs::write(dir.join(&name), data)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store upload '{}': {}", name, e)))?;
    match kind {
        FileKind::Document => {
            if content.handout.is_none() {
                content.handout = reference;
            }
        }
        FileKind::SlideDeck => {
            if let Some(r) = reference {
                content.slide_decks.push(r);
            }
        }
        FileKind::Video => {
            if let Some(r) = reference {
                content.videos.push(r);
            }
        }
        FileKind::Other => {
            warn!("unrecognized file type, left unattached: {}", original);
        }
    }
    Ok(())
}

/// Stores one standalone file (course images and other frontend assets) in
/// the uploads tree and returns its descriptor.
async fn upload_content(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut stored: Option<(String, String, String)> = None;
    let mut content_type: Option<String> = None;
    let mut course_id: Option<String> = None;
    let mut lesson_id: Option<String> = None;
    let mut description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        if let Some(original) = field.file_name().map(|n| n.to_string()) {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            let name = stored_name(&original);
            let dir = match field_name.as_str() {
                "courseImage" => state.config.storage.courses_dir(),
                _ => state.config.storage.uploads_dir.clone(),
            };
            let reference = match field_name.as_str() {
                "courseImage" => format!("/uploads/courses/{}", name),
                _ => format!("/uploads/{}", name),
            };
            tokio::fs::write(dir.join(&name), &data).await.map_err(|e| {
                ApiError::Internal(format!("failed to store upload '{}': {}", name, e))
            })?;
            stored = Some((name, original, reference));
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            match field_name.as_str() {
                "type" => content_type = Some(text),
                "courseId" => course_id = Some(text),
                "lessonId" => lesson_id = Some(text),
                "description" => description = Some(text),
                _ => {}
            }
        }
    }

    let (file_name, original_name, reference) =
        stored.ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;
    Ok(Json(json!({
        "id": next_record_id(),
        "fileName": file_name,
        "originalName": original_name,
        "type": content_type,
        "courseId": course_id,
        "lessonId": lesson_id,
        "description": description,
        "path": reference,
    })))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new().route("/api/upload-content", post(upload_content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("notes.PDF"), FileKind::Document);
        assert_eq!(classify("deck.PpTx"), FileKind::SlideDeck);
        assert_eq!(classify("clip.MOV"), FileKind::Video);
    }

    #[test]
    fn unknown_extensions_are_other() {
        assert_eq!(classify("archive.zip"), FileKind::Other);
        assert_eq!(classify("no_extension"), FileKind::Other);
    }

    #[test]
    fn stored_name_keeps_the_original() {
        let name = stored_name("handout.pdf");
        assert!(name.ends_with("-handout.pdf"));
    }

    #[tokio::test]
    async fn lesson_files_land_in_their_kind_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = StorageConfig {
            data_dir: dir.path().join("db"),
            uploads_dir: dir.path().join("uploads"),
        };
        for d in [
            storage.handouts_dir(),
            storage.slide_decks_dir(),
            storage.videos_dir(),
            storage.lessons_dir(),
        ] {
            std::fs::create_dir_all(d).expect("mkdir");
        }

        let mut content = LessonContent::default();
        store_lesson_file(&storage, "a.pdf", b"pdf", &mut content)
            .await
            .expect("store");
        store_lesson_file(&storage, "b.pdf", b"pdf", &mut content)
            .await
            .expect("store");
        store_lesson_file(&storage, "deck.pptx", b"ppt", &mut content)
            .await
            .expect("store");
        store_lesson_file(&storage, "clip.mp4", b"vid", &mut content)
            .await
            .expect("store");
        store_lesson_file(&storage, "stray.zip", b"zip", &mut content)
            .await
            .expect("store");

        // First document wins the single handout slot.
        assert!(content
            .handout
            .as_deref()
            .is_some_and(|h| h.ends_with("-a.pdf")));
        assert_eq!(content.videos.len(), 1);
        assert_eq!(content.slide_decks.len(), 1);

        // The stray file was stored in the lessons root but not attached.
        let lessons_root: Vec<_> = std::fs::read_dir(storage.lessons_dir())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(lessons_root.len(), 1);
    }
}
