use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use uuid::Uuid;

use super::runner::CommandRunner;
use crate::providers::base::{Provider, ToolOffer};
use crate::providers::types::message::{ImageContent, Message};
use crate::providers::types::tool::{ParamSpec, ToolSpec};

const DEFAULT_PROMPT: &str = "Describe what you see in this image in detail.";

#[derive(Debug, Deserialize)]
pub struct InspectArgs {
    #[serde(default)]
    pub prompt: String,
}

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "inspect_surroundings",
        "Take a photo with the camera and analyze it using AI vision. Use this to 'see' things.",
        vec![ParamSpec::optional(
            "prompt",
            "What to look for in the photo. Defaults to a detailed description.",
        )],
    )
}

/// Photograph with the back camera and ask `vision` to describe the picture.
///
/// The capture is written under `capture_dir` and removed before returning.
pub async fn inspect_surroundings(
    runner: &dyn CommandRunner,
    vision: Option<&dyn Provider>,
    capture_dir: &Path,
    prompt: &str,
    timeout: Duration,
) -> String {
    tracing::info!("inspecting surroundings");
    let Some(provider) = vision else {
        return "Failed to connect to AI for vision analysis.".to_string();
    };

    let path = capture_path(capture_dir);
    let args = [
        "-c".to_string(),
        "0".to_string(),
        path.display().to_string(),
    ];
    let captured = match runner.run("termux-camera-photo", &args, timeout).await {
        Ok(output) => match output.failure_reason() {
            None => Ok(()),
            Some(reason) => Err(format!(
                "Failed to capture photo: {}. Output: {}",
                reason,
                output.stdout.trim()
            )),
        },
        Err(e) => Err(format!("Failed to capture photo: {}", e)),
    };

    let description = match captured {
        Ok(()) => describe(provider, &path, prompt).await,
        Err(message) => message,
    };

    if let Err(e) = tokio::fs::remove_file(&path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "could not remove capture");
        }
    }
    description
}

fn capture_path(capture_dir: &Path) -> PathBuf {
    capture_dir.join(format!("tna_capture_{}.jpg", Uuid::new_v4().simple()))
}

async fn describe(provider: &dyn Provider, path: &Path, prompt: &str) -> String {
    let Ok(bytes) = tokio::fs::read(path).await else {
        return "Failed to read captured image file.".to_string();
    };

    let prompt = match prompt.trim() {
        "" => DEFAULT_PROMPT,
        prompt => prompt,
    };
    let image = ImageContent::new(BASE64.encode(bytes), "image/jpeg");
    let request = [Message::user_with_image(prompt, image)];

    match provider.complete(&request, ToolOffer::Withheld).await {
        Ok((message, _)) => match message.content.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => "Image captured, but no description generated.".to_string(),
        },
        Err(e) => format!("AI Vision Analysis Failed: {}", e),
    }
}
