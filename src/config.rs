use std::{collections::HashMap, env, fs, path::PathBuf, time::Duration};

use color_eyre::Result;
use directories::BaseDirs;
use lazy_static::lazy_static;
use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, de::Deserializer};
use url::Url;

use crate::dialog::Severity;
use crate::services::search_service::DEFAULT_ENDPOINT;

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Settings for the user lookup endpoint and the autocomplete widget
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: Url,
    pub endpoint: String,
    pub debounce_ms: u64,
    pub min_query_chars: usize,
    pub timeout_secs: u64,
    pub session_cookie: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:5000/").expect("static url"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            debounce_ms: 300,
            min_query_chars: 2,
            timeout_secs: 10,
            session_cookie: None,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub download_dir: Option<PathBuf>,
    pub trim_last_column: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            trim_last_column: true,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub styles: Styles,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Load the embedded defaults overlaid with the user's config file.
    ///
    /// Without an explicit path the file is `~/.tempus-config.json5`, which
    /// is seeded with the defaults the first time.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        let selected_path = if let Some(p) = config_path {
            expand_tilde(p)
        } else {
            let home_cfg = default_home_config_path();
            if !home_cfg.exists() {
                if let Some(parent) = home_cfg.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                let _ = fs::write(&home_cfg, CONFIG);
            }
            home_cfg
        };

        builder = builder.add_source(
            config::File::from(selected_path)
                .format(config::FileFormat::Json5)
                .required(config_path.is_some()),
        );

        builder.build()?.try_deserialize()
    }

    /// Directory exports are delivered to, if one is configured
    pub fn download_dir(&self) -> Option<PathBuf> {
        self.export.download_dir.as_ref().map(expand_tilde)
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str()
        && s.starts_with('~')
        && let Some(base) = BaseDirs::new()
    {
        return PathBuf::from(s.replacen('~', &base.home_dir().to_string_lossy(), 1));
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".tempus-config.json5");
    }
    PathBuf::from(".tempus-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}

/// Dialog styles per severity, written as `"bold white on red"`
#[derive(Clone, Debug)]
pub struct Styles(pub HashMap<Severity, Style>);

impl Default for Styles {
    fn default() -> Self {
        Styles(
            [
                (Severity::Danger, "bold white on red"),
                (Severity::Success, "bold white on green"),
                (Severity::Warning, "bold black on yellow"),
                (Severity::Info, "bold white on blue"),
            ]
            .into_iter()
            .map(|(severity, line)| (severity, parse_style(line)))
            .collect(),
        )
    }
}

impl Styles {
    pub fn for_severity(&self, severity: Severity) -> Style {
        self.0.get(&severity).copied().unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for Styles {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed_map = HashMap::<Severity, String>::deserialize(deserializer)?;
        Ok(Styles(
            parsed_map
                .into_iter()
                .map(|(severity, line)| (severity, parse_style(&line)))
                .collect(),
        ))
    }
}

/// Parse `"[bold] [underline] <fg> [on <bg>]"` into a style
pub fn parse_style(line: &str) -> Style {
    let lower = line.to_lowercase();
    let (foreground, background) = match lower.find("on ") {
        Some(idx) => (&lower[..idx], &lower[idx + 3..]),
        None => (lower.as_str(), ""),
    };
    let (fg, fg_mods) = split_modifiers(foreground);
    let (bg, bg_mods) = split_modifiers(background);

    let mut style = Style::default();
    if let Some(color) = parse_color(&fg) {
        style = style.fg(color);
    }
    if let Some(color) = parse_color(&bg) {
        style = style.bg(color);
    }
    style.add_modifier(fg_mods | bg_mods)
}

fn split_modifiers(part: &str) -> (String, Modifier) {
    let mut modifiers = Modifier::empty();
    let mut color = Vec::new();
    for word in part.split_whitespace() {
        match word {
            "bold" => modifiers |= Modifier::BOLD,
            "underline" => modifiers |= Modifier::UNDERLINED,
            "inverse" => modifiers |= Modifier::REVERSED,
            other => color.push(other),
        }
    }
    (color.join(" "), modifiers)
}

fn parse_color(s: &str) -> Option<Color> {
    let color = match s.trim() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        other => {
            let index = other.strip_prefix("color")?.parse::<u8>().ok()?;
            Color::Indexed(index)
        }
    };
    Some(color)
}
