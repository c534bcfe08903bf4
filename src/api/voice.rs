//! Voice API endpoints: command dispatch, speech-to-text and text-to-speech

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::{ApiState, auth};
use crate::db::{Kitchen, User};
use crate::voice::{
    CANONICAL_UNITS, CATEGORY_KEYWORDS, Category, CommandOutcome, CommandProcessor, Destination,
    FeedbackLog,
};

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/command", post(command))
        .route("/transcribe", post(transcribe))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/synthesize", post(synthesize))
        .route("/capabilities", get(capabilities))
        .route("/vocabulary", get(vocabulary))
        .merge(protected)
        .with_state(state)
}

/// Voice capabilities response
#[derive(Debug, Serialize)]
pub struct VoiceCapabilities {
    pub enabled: bool,
    pub stt_available: bool,
    pub tts_available: bool,
}

async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    Json(VoiceCapabilities {
        enabled: state.voice_enabled,
        stt_available: state.stt.is_some(),
        tts_available: state.tts.is_some(),
    })
}

/// Words the command interpreter understands
#[derive(Debug, Serialize)]
pub struct Vocabulary {
    pub units: Vec<&'static str>,
    pub categories: Vec<CategoryVocabulary>,
    pub destinations: Vec<DestinationVocabulary>,
}

#[derive(Debug, Serialize)]
pub struct CategoryVocabulary {
    pub category: Category,
    pub keywords: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DestinationVocabulary {
    pub destination: Destination,
    pub phrases: Vec<&'static str>,
}

async fn vocabulary() -> Json<Vocabulary> {
    let categories = Category::ALL
        .iter()
        .map(|category| CategoryVocabulary {
            category: *category,
            keywords: CATEGORY_KEYWORDS
                .iter()
                .find(|(c, _)| c == category)
                .map(|(_, words)| words.to_vec())
                .unwrap_or_default(),
        })
        .collect();

    let destinations = Destination::ALL
        .iter()
        .map(|destination| DestinationVocabulary {
            destination: *destination,
            phrases: destination.phrases().to_vec(),
        })
        .collect();

    Json(Vocabulary {
        units: CANONICAL_UNITS.to_vec(),
        categories,
        destinations,
    })
}

/// Text command request
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub text: String,
    /// Defaults to the user's selected kitchen
    #[serde(default)]
    pub kitchen_id: Option<String>,
}

/// Result of a dispatched command
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    #[serde(flatten)]
    pub outcome: CommandOutcome,
    /// Text spoken back to the user
    pub message: String,
    pub kitchen_id: String,
}

/// Interpret a command and apply it to a kitchen
async fn command(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("empty command".to_string()));
    }

    let kitchen = resolve_kitchen(&state, &user, request.kitchen_id.as_deref())?;
    Ok(Json(run_command(&state, &kitchen, text)))
}

/// Transcription query
#[derive(Debug, Default, Deserialize)]
pub struct TranscribeQuery {
    /// Defaults to the user's selected kitchen
    #[serde(default)]
    pub kitchen_id: Option<String>,
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandResponse>,
}

/// Transcribe audio and run the transcript as a command
///
/// Accepts audio in WAV format (audio/wav). Silence transcribes to empty text
/// and dispatches nothing.
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Query(query): Query<TranscribeQuery>,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let stt = state
        .stt
        .as_ref()
        .ok_or(ApiError::NotConfigured("speech-to-text not configured"))?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("empty audio data".to_string()));
    }

    let kitchen = resolve_kitchen(&state, &user, query.kitchen_id.as_deref())?;
    let text = stt.transcribe(&body).await?;
    tracing::debug!(text = %text, kitchen_id = %kitchen.id, "audio transcribed");

    let command = if text.is_empty() {
        None
    } else {
        Some(run_command(&state, &kitchen, &text.to_lowercase()))
    };

    Ok(Json(TranscribeResponse { text, command }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    #[serde(default)]
    pub text: String,
}

/// Synthesize text to speech
///
/// Returns audio in MP3 format
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let tts = state
        .tts
        .as_ref()
        .ok_or(ApiError::NotConfigured("text-to-speech not configured"))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("empty text".to_string()));
    }

    let audio = tts.synthesize(&request.text).await?;

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

fn resolve_kitchen(
    state: &ApiState,
    user: &User,
    kitchen_id: Option<&str>,
) -> Result<Kitchen, ApiError> {
    let kitchen = match kitchen_id {
        Some(id) => state.kitchens.get(&user.id, id)?,
        None => state.kitchens.selected(&user.id)?,
    };
    Ok(kitchen)
}

fn run_command(state: &ApiState, kitchen: &Kitchen, text: &str) -> CommandResponse {
    let feedback = FeedbackLog::new();
    let processor = CommandProcessor::new(state.store(&kitchen.id), Arc::new(feedback.clone()));
    let outcome = processor.process(text);

    CommandResponse {
        message: feedback.last_spoken().unwrap_or_else(|| outcome.message()),
        outcome,
        kitchen_id: kitchen.id.clone(),
    }
}
