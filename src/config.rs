use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::frame::{ColorFormat, CHANNELS};
use crate::model::{CustomProfile, ProfileChoice};
use crate::pipeline::{
    PipelineSettings, DEFAULT_BACKLOG_WARN, DEFAULT_CAPTURE_INTERVAL, DEFAULT_DISPLAY_DURATION,
    DEFAULT_POLL_INTERVAL,
};
use crate::preprocess::ChannelNormParams;

const DEFAULT_IMAGES_DIR: &str = "assets/images";
const DEFAULT_MODEL_PATH: &str = "assets/model/mobilenetv2-12.onnx";
const DEFAULT_LABELS_PATH: &str = "assets/labels/synset.txt";
const DEFAULT_PROFILE: &str = "mobilenetv2";
const DEFAULT_BATCH_SIZE: usize = 1;

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    images: Option<ImagesConfigFile>,
    model: Option<ModelConfigFile>,
    pipeline: Option<PipelineConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ImagesConfigFile {
    dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    labels: Option<PathBuf>,
    profile: Option<String>,
    batch_size: Option<usize>,
    custom: Option<CustomProfileConfigFile>,
}

#[derive(Debug, Deserialize)]
struct CustomProfileConfigFile {
    name: Option<String>,
    height: u32,
    width: u32,
    classes: usize,
    color: Option<String>,
    mean: Option<[f32; CHANNELS]>,
    std: Option<[f32; CHANNELS]>,
    strip_label_prefix: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    capture_interval_ms: Option<u64>,
    display_duration_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    backlog_warn: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    backend: Option<String>,
    max_results: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Image directory, or a `stub://WxH` synthetic source.
    pub images_dir: String,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub profile: ProfileChoice,
    pub batch_size: usize,
    pub pipeline: PipelineSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub backend: DisplayBackend,
    /// Headless only: request close after this many results.
    pub max_results: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayBackend {
    Window,
    Headless,
}

impl DisplayBackend {
    /// `Window` when the crate is built with a window toolkit, `Headless` otherwise.
    pub fn platform_default() -> Self {
        if cfg!(feature = "display-minifb") {
            Self::Window
        } else {
            Self::Headless
        }
    }
}

impl FromStr for DisplayBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "window" => Ok(Self::Window),
            "headless" => Ok(Self::Headless),
            other => Err(anyhow!(
                "unknown display backend '{}' (expected window|headless)",
                other
            )),
        }
    }
}

impl ClassifierConfig {
    /// Built-in defaults, then the file named by `CLASSIFIER_CONFIG`, then environment
    /// overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("CLASSIFIER_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like `load`, with an explicit config file in place of `CLASSIFIER_CONFIG`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ClassifierConfigFile) -> Result<Self> {
        let images_dir = file
            .images
            .and_then(|images| images.dir)
            .unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string());

        let model = file.model.unwrap_or_default();
        let model_path = model
            .path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));
        let labels_path = model
            .labels
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_PATH));
        let profile = parse_profile(
            model.profile.as_deref().unwrap_or(DEFAULT_PROFILE),
            model.custom,
        )?;
        let batch_size = model.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

        let pipeline_file = file.pipeline.unwrap_or_default();
        let millis = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_millis).unwrap_or(default)
        };
        let pipeline = PipelineSettings {
            capture_interval: millis(
                pipeline_file.capture_interval_ms,
                DEFAULT_CAPTURE_INTERVAL,
            ),
            display_duration: millis(
                pipeline_file.display_duration_ms,
                DEFAULT_DISPLAY_DURATION,
            ),
            poll_interval: millis(pipeline_file.poll_interval_ms, DEFAULT_POLL_INTERVAL),
            backlog_warn: pipeline_file.backlog_warn.unwrap_or(DEFAULT_BACKLOG_WARN),
        };

        let display_file = file.display.unwrap_or_default();
        let display = DisplaySettings {
            backend: match display_file.backend.as_deref() {
                Some(backend) => backend.parse()?,
                None => DisplayBackend::platform_default(),
            },
            max_results: display_file.max_results,
        };

        Ok(Self {
            images_dir,
            model_path,
            labels_path,
            profile,
            batch_size,
            pipeline,
            display,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("CLASSIFIER_IMAGES_DIR") {
            if !dir.trim().is_empty() {
                self.images_dir = dir;
            }
        }
        if let Ok(path) = std::env::var("CLASSIFIER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("CLASSIFIER_LABELS_PATH") {
            if !path.trim().is_empty() {
                self.labels_path = PathBuf::from(path);
            }
        }
        if let Ok(backend) = std::env::var("CLASSIFIER_DISPLAY") {
            if !backend.trim().is_empty() {
                self.display.backend = backend.parse()?;
            }
        }
        if let Ok(interval) = std::env::var("CLASSIFIER_CAPTURE_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("CLASSIFIER_CAPTURE_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.pipeline.capture_interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    /// Check cross-field constraints. Called by `load`; call again after applying
    /// command-line overrides.
    pub fn validate(&self) -> Result<()> {
        if self.images_dir.trim().is_empty() {
            return Err(anyhow!("images directory must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be >= 1"));
        }
        if self.pipeline.capture_interval.is_zero() {
            return Err(anyhow!("capture_interval_ms must be greater than zero"));
        }
        if self.pipeline.poll_interval.is_zero() {
            return Err(anyhow!("poll_interval_ms must be greater than zero"));
        }
        if let ProfileChoice::Custom(custom) = &self.profile {
            custom.validate()?;
        }
        if self.display.backend == DisplayBackend::Window && !cfg!(feature = "display-minifb") {
            return Err(anyhow!(
                "display backend 'window' requires the display-minifb feature"
            ));
        }
        Ok(())
    }
}

fn parse_profile(name: &str, custom: Option<CustomProfileConfigFile>) -> Result<ProfileChoice> {
    match name.trim().to_ascii_lowercase().as_str() {
        "mobilenetv2" | "mobilenet_v2" => Ok(ProfileChoice::MobileNetV2),
        "custom" => {
            let custom = custom
                .ok_or_else(|| anyhow!("profile 'custom' requires a [model.custom] section"))?;
            let color = match custom.color.as_deref() {
                None => ColorFormat::Rgb,
                Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                    "rgb" => ColorFormat::Rgb,
                    "bgr" => ColorFormat::Bgr,
                    other => return Err(anyhow!("unknown color format '{}'", other)),
                },
            };
            let mean = custom.mean.unwrap_or([0.0; CHANNELS]);
            let std = custom.std.unwrap_or([1.0; CHANNELS]);
            Ok(ProfileChoice::Custom(CustomProfile {
                name: custom.name.unwrap_or_else(|| "custom".to_string()),
                height: custom.height,
                width: custom.width,
                classes: custom.classes,
                color,
                norm: std::array::from_fn(|c| ChannelNormParams::new(mean[c], std[c])),
                strip_label_prefix: custom.strip_label_prefix.unwrap_or(false),
            }))
        }
        other => Err(anyhow!(
            "unknown model profile '{}' (expected mobilenetv2|custom)",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<ClassifierConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let cfg = ClassifierConfig::from_file(ClassifierConfigFile::default())?;
        assert_eq!(cfg.images_dir, DEFAULT_IMAGES_DIR);
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.labels_path, PathBuf::from(DEFAULT_LABELS_PATH));
        assert!(matches!(cfg.profile, ProfileChoice::MobileNetV2));
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.pipeline.capture_interval, Duration::from_millis(500));
        assert_eq!(cfg.pipeline.display_duration, Duration::from_millis(1500));
        assert_eq!(cfg.display.backend, DisplayBackend::platform_default());
        Ok(())
    }

    #[test]
    fn parses_custom_profile_section() -> Result<()> {
        let file: ClassifierConfigFile = toml::from_str(
            r#"
            [model]
            profile = "custom"

            [model.custom]
            name = "digits"
            height = 28
            width = 28
            classes = 10
            color = "bgr"
            mean = [0.5, 0.5, 0.5]
            std = [0.25, 0.25, 0.25]
            "#,
        )?;
        let cfg = ClassifierConfig::from_file(file)?;
        let ProfileChoice::Custom(custom) = &cfg.profile else {
            panic!("expected custom profile");
        };
        assert_eq!(custom.name, "digits");
        assert_eq!((custom.height, custom.width, custom.classes), (28, 28, 10));
        assert_eq!(custom.color, ColorFormat::Bgr);
        assert_eq!(custom.norm[2].std, 0.25);
        assert!(!custom.strip_label_prefix);
        Ok(())
    }

    #[test]
    fn rejects_unknown_profile_and_backend() {
        assert!(parse_profile("resnet", None).is_err());
        assert!(parse_profile("custom", None).is_err());
        assert!("fullscreen".parse::<DisplayBackend>().is_err());
        assert_eq!(
            " Headless ".parse::<DisplayBackend>().unwrap(),
            DisplayBackend::Headless
        );
    }
}
