use std::time::Duration;

use serde::Deserialize;
use strum_macros::{Display, EnumString};

use super::runner::CommandRunner;
use crate::providers::types::tool::{ParamSpec, ToolSpec};

#[derive(Debug, Deserialize)]
pub struct LaunchArgs {
    pub app_name: String,
    #[serde(default)]
    pub query: String,
}

/// Apps reachable through deep links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum App {
    Spotify,
    Maps,
    Youtube,
    Browser,
    Camera,
}

impl App {
    /// Program and arguments that open this app for `query`.
    fn command(self, query: &str) -> (&'static str, Vec<String>) {
        match self {
            App::Spotify => ("termux-open-url", vec![format!("spotify:search:{}", query)]),
            App::Maps => ("termux-open-url", vec![format!("geo:0,0?q={}", query)]),
            App::Youtube => (
                "termux-open-url",
                vec![format!(
                    "https://www.youtube.com/results?search_query={}",
                    query
                )],
            ),
            App::Browser => ("termux-open-url", vec![query.to_string()]),
            App::Camera => (
                "am",
                ["start", "-a", "android.media.action.IMAGE_CAPTURE"]
                    .map(String::from)
                    .to_vec(),
            ),
        }
    }
}

pub fn spec() -> ToolSpec {
    ToolSpec::new(
        "launch_app",
        "Launch an Android app or deep link. Apps: spotify, maps, youtube, browser, camera.",
        vec![
            ParamSpec::required("app_name", "One of: spotify, maps, youtube, browser, camera"),
            ParamSpec::optional(
                "query",
                "Search text for the app, or the URL to open when app_name is browser",
            ),
        ],
    )
}

pub async fn launch_app(runner: &dyn CommandRunner, args: &LaunchArgs, timeout: Duration) -> String {
    tracing::info!(app = %args.app_name, query = %args.query, "launching app");
    let Ok(app) = args.app_name.trim().parse::<App>() else {
        return "App not supported for deep linking yet.".to_string();
    };

    let (program, command_args) = app.command(&args.query);
    match runner.run(program, &command_args, timeout).await {
        Ok(output) => match output.failure_reason() {
            None => format!("Launched {}", app),
            Some(reason) => format!("Failed to launch {}: {}", app, reason),
        },
        Err(e) => format!("Failed to launch {}: {}", app, e),
    }
}
