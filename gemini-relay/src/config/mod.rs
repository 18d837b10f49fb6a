use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// MIME type attached to every uploaded image unless overridden.
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/png";

/// Default request body limit (20MB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    pub api_key: String,
    /// Bare model name, e.g. `gemini-1.5-flash`.
    pub model: String,
    pub api_base: String,
    /// Optional timeout for the remote call. Unset means wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Directory that receives temporary uploads.
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub image_mime: ImageMimePolicy,
}

/// How the image route labels uploaded images.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ImageMimePolicy {
    /// Every image is sent with this MIME type, whatever the client declared.
    Fixed(String),
    /// Use the declared content type of the upload, falling back to
    /// [`DEFAULT_IMAGE_MIME_TYPE`].
    Declared,
}

impl ImageMimePolicy {
    fn parse(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("declared") => ImageMimePolicy::Declared,
            "" => ImageMimePolicy::Fixed(DEFAULT_IMAGE_MIME_TYPE.to_string()),
            v => ImageMimePolicy::Fixed(v.to_string()),
        }
    }

    /// Resolve the MIME type for an upload with the given declared type.
    pub fn resolve<'a>(&'a self, declared: Option<&'a str>) -> &'a str {
        match self {
            ImageMimePolicy::Fixed(mime) => mime.as_str(),
            ImageMimePolicy::Declared => declared.unwrap_or(DEFAULT_IMAGE_MIME_TYPE),
        }
    }
}

impl Default for ImageMimePolicy {
    fn default() -> Self {
        ImageMimePolicy::Fixed(DEFAULT_IMAGE_MIME_TYPE.to_string())
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let request_timeout_secs = match env::var("GEMINI_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(parse_setting::<u64>("GEMINI_REQUEST_TIMEOUT_SECS", &raw)?),
            Err(_) => None,
        };

        Ok(RelayConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                model: normalize_model_name(&get_env(
                    "GEMINI_MODEL",
                    Some(DEFAULT_GEMINI_MODEL),
                    is_prod,
                )?),
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                request_timeout_secs,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(get_env("RELAY_UPLOAD_DIR", Some("uploads"), is_prod)?),
                max_bytes: parse_setting(
                    "RELAY_MAX_UPLOAD_BYTES",
                    &get_env(
                        "RELAY_MAX_UPLOAD_BYTES",
                        Some(&DEFAULT_MAX_UPLOAD_BYTES.to_string()),
                        is_prod,
                    )?,
                )?,
                image_mime: ImageMimePolicy::parse(&get_env(
                    "RELAY_IMAGE_MIME_TYPE",
                    Some(DEFAULT_IMAGE_MIME_TYPE),
                    is_prod,
                )?),
            },
        })
    }
}

/// Accept both `gemini-1.5-flash` and `models/gemini-1.5-flash`.
fn normalize_model_name(model: &str) -> String {
    model.trim().trim_start_matches("models/").to_string()
}

/// Parse a numeric setting, rejecting values that do not parse instead of
/// falling back to a default.
fn parse_setting<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_prefix_is_stripped() {
        assert_eq!(
            normalize_model_name("models/gemini-1.5-flash"),
            "gemini-1.5-flash"
        );
        assert_eq!(normalize_model_name("gemini-2.0-flash"), "gemini-2.0-flash");
    }

    #[test]
    fn image_policy_parsing() {
        assert_eq!(ImageMimePolicy::parse("declared"), ImageMimePolicy::Declared);
        assert_eq!(ImageMimePolicy::parse("DECLARED"), ImageMimePolicy::Declared);
        assert_eq!(
            ImageMimePolicy::parse("image/jpeg"),
            ImageMimePolicy::Fixed("image/jpeg".to_string())
        );
        assert_eq!(ImageMimePolicy::parse(""), ImageMimePolicy::default());
    }

    #[test]
    fn fixed_policy_ignores_declared_type() {
        let policy = ImageMimePolicy::default();
        assert_eq!(policy.resolve(Some("image/jpeg")), "image/png");
        assert_eq!(policy.resolve(None), "image/png");
    }

    #[test]
    fn declared_policy_falls_back_to_png() {
        let policy = ImageMimePolicy::Declared;
        assert_eq!(policy.resolve(Some("image/webp")), "image/webp");
        assert_eq!(policy.resolve(None), "image/png");
    }

    #[test]
    fn missing_required_value_is_config_error() {
        let err = get_env("RELAY_TEST_SURELY_UNSET_KEY", None, false).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn unparsable_upload_limit_is_config_error() {
        let err = parse_setting::<usize>("RELAY_MAX_UPLOAD_BYTES", "20MB").unwrap_err();

        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("RELAY_MAX_UPLOAD_BYTES"));
        assert!(err.to_string().contains("20MB"));
    }

    #[test]
    fn numeric_settings_parse() {
        assert_eq!(
            parse_setting::<usize>("RELAY_MAX_UPLOAD_BYTES", "1048576").unwrap(),
            1_048_576
        );
        assert_eq!(
            parse_setting::<u64>("GEMINI_REQUEST_TIMEOUT_SECS", " 30 ").unwrap(),
            30
        );
        assert!(parse_setting::<u64>("GEMINI_REQUEST_TIMEOUT_SECS", "-1").is_err());
    }

    #[test]
    fn default_used_outside_production() {
        let value = get_env("RELAY_TEST_SURELY_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }
}
