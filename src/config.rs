//! Run configuration: defaults, config-file/env/flag merge, clamping and
//! pattern validation, plus generation of the `init` config file.
//!
//! The config file is plain `KEY="value"` lines, which is dotenv format, so
//! it is loaded with the dotenv crate. Real environment variables keep
//! precedence over file values; CLI flags beat both.

use clap::Args;
use regex::RegexBuilder;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "vidlift";

const DEFAULT_DOWNLOAD_DIR: &str = ".";
const DEFAULT_UPLOAD_ACL: &str = "public-read";
const DEFAULT_UPLOAD_DIR: &str = "videos";
const DEFAULT_UPLOAD_REGION: &str = "us-east-1";
const DEFAULT_UPLOAD_STORAGE_CLASS: &str = "REDUCED_REDUNDANCY";
const DEFAULT_INPUT_KEY: &str = "videos";
const DEFAULT_INFO_CONCURRENCY: i64 = 10;
const DEFAULT_DOWNLOAD_CONCURRENCY: i64 = 2;

const ACL_PATTERN: &str =
    "^(private|public-read|public-read-write|authenticated-read|aws-exec-read|bucket-owner-read|bucket-owner-full-control)$";
const BUCKET_PATTERN: &str = "^[a-z0-9-]+$";
const UPLOAD_DIR_PATTERN: &str = "^[a-zA-Z0-9_-]+$";
const REGION_PATTERN: &str = "^(us-east-1)$";
const STORAGE_CLASS_PATTERN: &str = "^(STANDARD|REDUCED_REDUNDANCY|STANDARD_IA)$";
const CONFIG_NAME_PATTERN: &str = "^[a-zA-Z0-9-]+$";

#[derive(Debug)]
pub enum ConfigError {
    /// No config file on disk for a non-init run - fatal, exit 1
    MissingConfigFile(String),
    /// A value failed its constraint pattern or a required value is absent
    Invalid { key: &'static str, message: String },
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingConfigFile(path) => write!(f, "config file not found: {}", path),
            ConfigError::Invalid { key, message } => write!(f, "{}: {}", key, message),
            ConfigError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

/// CLI options shared by the main run and `init`. Every option can also be
/// supplied through its environment variable; a flag takes precedence.
#[derive(Debug, Clone, Default, Args)]
pub struct Options {
    /// Config file to use env.CONFIG_FILE
    #[arg(short = 'c', long, env = "CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Video download directory env.DOWNLOAD_DIR
    #[arg(short = 'd', long)]
    pub download_dir: Option<String>,

    /// Delete downloads after upload to S3 env.DELETE_DOWNLOADS
    #[arg(short = 'x', long)]
    pub delete_downloads: Option<i64>,

    /// S3 ACL env.UPLOAD_ACL
    #[arg(short = 'a', long)]
    pub upload_acl: Option<String>,

    /// S3 Bucket env.UPLOAD_BUCKET
    #[arg(short = 'b', long)]
    pub upload_bucket: Option<String>,

    /// S3 Directory env.UPLOAD_DIR
    #[arg(short = 'D', long)]
    pub upload_dir: Option<String>,

    /// S3 Region env.UPLOAD_REGION
    #[arg(short = 'r', long)]
    pub upload_region: Option<String>,

    /// S3 Storage Class env.UPLOAD_STORAGE_CLASS
    #[arg(short = 's', long)]
    pub upload_storage_class: Option<String>,

    /// Input JSON key to get videos eg. object.video_urls env.INPUT_KEY
    #[arg(short = 'k', long)]
    pub input_key: Option<String>,

    /// How many files to download info for at the same time env.INFO_CONCURRENCY
    #[arg(short = 'I', long)]
    pub info_concurrency: Option<i64>,

    /// How many files to download at the same time env.DOWNLOAD_CONCURRENCY
    #[arg(short = 'X', long)]
    pub download_concurrency: Option<i64>,

    /// AWS access key id (falls back to the local credentials file)
    #[arg(long)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret access key (falls back to the local credentials file)
    #[arg(long)]
    pub aws_secret_access_key: Option<String>,
}

/// Immutable snapshot of all tunables for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config_file: String,
    pub download_dir: String,
    pub delete_downloads: bool,
    pub upload_acl: String,
    pub upload_bucket: String,
    pub upload_dir: String,
    pub upload_region: String,
    pub upload_storage_class: String,
    pub input_key: String,
    pub info_concurrency: usize,
    pub download_concurrency: usize,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl RunConfig {
    /// Build the configuration for a main run. Fails when the config file
    /// is missing; loads it into the environment otherwise.
    pub fn resolve(options: &Options) -> Result<Self, ConfigError> {
        let config_file = options
            .config_file
            .clone()
            .unwrap_or_else(|| format!(".{}", APP_NAME));

        if !Path::new(&config_file).exists() {
            return Err(ConfigError::MissingConfigFile(config_file));
        }
        dotenv::from_path(&config_file).ok();

        Self::merge(options, config_file)
    }

    /// Merge flag > env > default for every option and validate constraints.
    fn merge(options: &Options, config_file: String) -> Result<Self, ConfigError> {
        let credentials = AwsCredentials::discover();

        let download_dir = pick(&options.download_dir, "DOWNLOAD_DIR")
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.to_owned());
        let delete_downloads =
            pick_int(options.delete_downloads, "DELETE_DOWNLOADS").unwrap_or(1) != 0;
        let upload_acl =
            pick(&options.upload_acl, "UPLOAD_ACL").unwrap_or_else(|| DEFAULT_UPLOAD_ACL.to_owned());
        let upload_bucket = pick(&options.upload_bucket, "UPLOAD_BUCKET").ok_or_else(|| {
            ConfigError::Invalid {
                key: "upload-bucket",
                message: "UPLOAD_BUCKET is required".to_owned(),
            }
        })?;
        let upload_dir =
            pick(&options.upload_dir, "UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_owned());
        let upload_region = pick(&options.upload_region, "UPLOAD_REGION")
            .unwrap_or_else(|| DEFAULT_UPLOAD_REGION.to_owned());
        let upload_storage_class = pick(&options.upload_storage_class, "UPLOAD_STORAGE_CLASS")
            .unwrap_or_else(|| DEFAULT_UPLOAD_STORAGE_CLASS.to_owned());
        let input_key =
            pick(&options.input_key, "INPUT_KEY").unwrap_or_else(|| DEFAULT_INPUT_KEY.to_owned());
        let info_concurrency = clamp(
            pick_int(options.info_concurrency, "INFO_CONCURRENCY")
                .unwrap_or(DEFAULT_INFO_CONCURRENCY),
            1,
            100,
        );
        let download_concurrency = clamp(
            pick_int(options.download_concurrency, "DOWNLOAD_CONCURRENCY")
                .unwrap_or(DEFAULT_DOWNLOAD_CONCURRENCY),
            1,
            10,
        );
        let aws_access_key_id = pick(&options.aws_access_key_id, "AWS_ACCESS_KEY_ID")
            .or(credentials.access_key_id)
            .unwrap_or_default();
        let aws_secret_access_key = pick(&options.aws_secret_access_key, "AWS_SECRET_ACCESS_KEY")
            .or(credentials.secret_access_key)
            .unwrap_or_default();

        validate(
            "upload-acl",
            &upload_acl,
            ACL_PATTERN,
            true,
            "UPLOAD_ACL must be one of private, public-read, public-read-write, authenticated-read, aws-exec-read, bucket-owner-read or bucket-owner-full-control",
        )?;
        validate(
            "upload-bucket",
            &upload_bucket,
            BUCKET_PATTERN,
            false,
            "UPLOAD_BUCKET must be only lowercase letters, numbers, or dashes",
        )?;
        validate(
            "upload-dir",
            &upload_dir,
            UPLOAD_DIR_PATTERN,
            false,
            "UPLOAD_DIR must be only letters, numbers, dashes or underscores",
        )?;
        validate(
            "upload-region",
            &upload_region,
            REGION_PATTERN,
            true,
            "UPLOAD_REGION must be us-east-1",
        )?;
        validate(
            "upload-storage-class",
            &upload_storage_class,
            STORAGE_CLASS_PATTERN,
            true,
            "UPLOAD_STORAGE_CLASS must be one of STANDARD, REDUCED_REDUNDANCY or STANDARD_IA",
        )?;

        Ok(RunConfig {
            config_file,
            download_dir,
            delete_downloads,
            upload_acl,
            upload_bucket,
            upload_dir,
            upload_region,
            upload_storage_class,
            input_key,
            info_concurrency,
            download_concurrency,
            aws_access_key_id,
            aws_secret_access_key,
        })
    }

    /// `KEY="value"` lines for every recognized option except config-file,
    /// upper-cased, dashes to underscores. This is what `init` writes.
    pub fn render(&self) -> String {
        let delete_downloads = if self.delete_downloads { "1" } else { "0" };
        [
            ("AWS_ACCESS_KEY_ID", self.aws_access_key_id.clone()),
            ("AWS_SECRET_ACCESS_KEY", self.aws_secret_access_key.clone()),
            ("DOWNLOAD_DIR", self.download_dir.clone()),
            ("DELETE_DOWNLOADS", delete_downloads.to_owned()),
            ("UPLOAD_ACL", self.upload_acl.clone()),
            ("UPLOAD_BUCKET", self.upload_bucket.clone()),
            ("UPLOAD_DIR", self.upload_dir.clone()),
            ("UPLOAD_REGION", self.upload_region.clone()),
            ("UPLOAD_STORAGE_CLASS", self.upload_storage_class.clone()),
            ("INPUT_KEY", self.input_key.clone()),
            ("INFO_CONCURRENCY", self.info_concurrency.to_string()),
            ("DOWNLOAD_CONCURRENCY", self.download_concurrency.to_string()),
        ]
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, value))
        .collect::<Vec<_>>()
        .join("\n")
    }

    /// Effective-config banner printed at the start of a run.
    pub fn banner(&self) -> String {
        let mut output = format!("[{}] running with config {}", APP_NAME, self.config_file);
        output += &format!("\n- UPLOAD_ACL {}", self.upload_acl);
        output += &format!("\n- UPLOAD_BUCKET {}", self.upload_bucket);
        output += &format!("\n- UPLOAD_DIR {}", self.upload_dir);
        output += &format!("\n- UPLOAD_REGION {}", self.upload_region);
        output += &format!("\n- UPLOAD_STORAGE_CLASS {}", self.upload_storage_class);
        output += &format!("\n- DOWNLOAD_DIR {}", self.download_dir);
        output += &format!(
            "\n- DELETE_DOWNLOADS {}",
            if self.delete_downloads { "1" } else { "0" }
        );
        output += &format!("\n- INFO_CONCURRENCY {}", self.info_concurrency);
        output += &format!("\n- DOWNLOAD_CONCURRENCY {}", self.download_concurrency);
        output += &format!("\n- INPUT_KEY {}", self.input_key);
        output
    }
}

pub enum InitOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Generate the config file for `init`. Refuses to overwrite an existing
/// file unless `force` is set.
///
/// There is no interactive prompt, so every required value must arrive via
/// flag or environment; in particular a bare `init` without UPLOAD_BUCKET
/// fails instead of writing an incomplete file.
pub fn init_config(options: &Options, force: bool) -> Result<InitOutcome, ConfigError> {
    let name = options
        .config_file
        .clone()
        .unwrap_or_else(|| APP_NAME.to_owned());
    validate(
        "config-file",
        name.trim_start_matches('.'),
        CONFIG_NAME_PATTERN,
        false,
        "CONFIG_FILE must be only letters, numbers, or dashes",
    )?;
    let path = PathBuf::from(format!(".{}", name.trim_start_matches('.')));

    if path.exists() && !force {
        return Ok(InitOutcome::AlreadyExists(path));
    }

    let config = RunConfig::merge(options, path.display().to_string())?;
    fs::write(&path, config.render())?;
    Ok(InitOutcome::Created(path))
}

fn pick(flag: &Option<String>, var: &str) -> Option<String> {
    flag.clone()
        .or_else(|| env::var(var).ok())
        .filter(|value| !value.is_empty())
}

fn pick_int(flag: Option<i64>, var: &str) -> Option<i64> {
    flag.or_else(|| env::var(var).ok()?.parse().ok())
}

fn clamp(value: i64, min: i64, max: i64) -> usize {
    value.max(min).min(max) as usize
}

fn validate(
    key: &'static str,
    value: &str,
    pattern: &str,
    case_insensitive: bool,
    message: &str,
) -> Result<(), ConfigError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .expect("constraint pattern is valid");
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            message: message.to_owned(),
        })
    }
}

/// AWS credentials picked up from a local ini file, weakest source in the
/// merge order: `./.aws/credentials` first, then `$HOME/.aws/credentials`.
#[derive(Debug, Default)]
struct AwsCredentials {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
}

impl AwsCredentials {
    fn discover() -> Self {
        let mut candidates = vec![PathBuf::from("./.aws/credentials")];
        if let Ok(home) = env::var("HOME") {
            candidates.push(Path::new(&home).join(".aws/credentials"));
        }
        for path in candidates {
            if let Ok(contents) = fs::read_to_string(&path) {
                return Self::parse_default_section(&contents);
            }
        }
        Self::default()
    }

    fn parse_default_section(contents: &str) -> Self {
        let mut credentials = Self::default();
        let mut in_default = false;
        for line in contents.lines() {
            let line = line.trim();
            if line.starts_with('[') && line.ends_with(']') {
                in_default = line == "[default]";
                continue;
            }
            if !in_default {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().to_owned();
                match key.trim() {
                    "aws_access_key_id" => credentials.access_key_id = Some(value),
                    "aws_secret_access_key" => credentials.secret_access_key = Some(value),
                    _ => {}
                }
            }
        }
        credentials
    }
}
