//! Resolves the effective run configuration from three sources.
//!
//! Precedence, highest first: command-line overrides, the process
//! environment, the override file, built-in defaults. The override file only
//! fills keys the environment does not already define.

mod env_file;

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wabc_core::validation::{self, Violations};
use wabc_core::TemplateRef;

pub use env_file::{load_env_file, parse_env_file, EnvFile};

pub mod keys {
    pub const PHONE_NUMBER_ID: &str = "WA_PHONE_NUMBER_ID";
    pub const ACCESS_TOKEN: &str = "WA_ACCESS_TOKEN";
    pub const GRAPH_VERSION: &str = "WA_GRAPH_VERSION";
    pub const API_BASE: &str = "WA_API_BASE";
    pub const CSV_PATH: &str = "CSV_PATH";
    pub const PDF_PATH: &str = "PDF_PATH";
    pub const CAPTION: &str = "CAPTION";
    pub const FILENAME: &str = "FILENAME";
    pub const RATE: &str = "RATE";
    pub const TEMPLATE: &str = "TEMPLATE";
    pub const DRY_RUN: &str = "DRY_RUN";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FILE: &str = "LOG_FILE";
    pub const FAILED_CSV: &str = "FAILED_CSV";
    pub const AUDIT_LOG: &str = "AUDIT_LOG";
}

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_GRAPH_VERSION: &str = "v20.0";
pub const DEFAULT_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_RATE: &str = "0.5";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_FAILED_CSV: &str = "failed.csv";
pub const DOCUMENT_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
#[error("invalid configuration: {}", .errors.join("; "))]
pub struct ConfigurationError {
    pub errors: Vec<String>,
}

/// Values given on the command line. `None` means the flag was absent.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub env_file: Option<PathBuf>,
    pub csv: Option<String>,
    pub pdf: Option<String>,
    pub caption: Option<String>,
    pub filename: Option<String>,
    pub rate: Option<String>,
    pub template: Option<String>,
    pub dry_run: bool,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub failed_csv: Option<String>,
    pub audit_log: Option<String>,
}

impl ConfigOverrides {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        let optional = [
            (keys::CSV_PATH, &self.csv),
            (keys::PDF_PATH, &self.pdf),
            (keys::CAPTION, &self.caption),
            (keys::FILENAME, &self.filename),
            (keys::RATE, &self.rate),
            (keys::TEMPLATE, &self.template),
            (keys::LOG_LEVEL, &self.log_level),
            (keys::LOG_FILE, &self.log_file),
            (keys::FAILED_CSV, &self.failed_csv),
            (keys::AUDIT_LOG, &self.audit_log),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                out.push((key, v.clone()));
            }
        }
        if self.dry_run {
            out.push((keys::DRY_RUN, "true".to_string()));
        }
        out
    }
}

/// Settings for a single run. Built once by [`resolve`] and never mutated.
#[derive(Clone)]
pub struct EffectiveConfig {
    pub phone_number_id: String,
    pub access_token: String,
    pub graph_version: String,
    pub api_base: String,
    pub csv_path: PathBuf,
    pub pdf_path: PathBuf,
    pub filename: String,
    pub caption: String,
    pub mime_type: String,
    pub template: Option<TemplateRef>,
    pub delay: Duration,
    pub dry_run: bool,
    pub failed_csv: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"<redacted>")
            .field("graph_version", &self.graph_version)
            .field("api_base", &self.api_base)
            .field("csv_path", &self.csv_path)
            .field("pdf_path", &self.pdf_path)
            .field("filename", &self.filename)
            .field("caption", &self.caption)
            .field("mime_type", &self.mime_type)
            .field("template", &self.template)
            .field("delay", &self.delay)
            .field("dry_run", &self.dry_run)
            .field("failed_csv", &self.failed_csv)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("audit_log", &self.audit_log)
            .finish()
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub config: EffectiveConfig,
    /// Non-fatal findings, to be logged once logging is up.
    pub warnings: Vec<String>,
}

/// Applies the precedence rules to already-loaded sources.
pub fn merge_sources(
    file: &HashMap<String, String>,
    process_env: &HashMap<String, String>,
    overrides: &ConfigOverrides,
) -> HashMap<String, String> {
    let mut merged = file.clone();
    merged.extend(process_env.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (key, value) in overrides.pairs() {
        merged.insert(key.to_string(), value);
    }
    merged
}

/// Reads the override file, merges all sources and validates the result,
/// reporting every violation rather than the first.
pub fn resolve(
    overrides: &ConfigOverrides,
    process_env: &HashMap<String, String>,
) -> Result<Resolution, ConfigurationError> {
    let mut warnings = Vec::new();
    let mut violations = Violations::new();

    let env_path = overrides
        .env_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
    let file_values = match load_env_file(&env_path) {
        Ok(Some(parsed)) => {
            tracing::debug!(path = %env_path.display(), keys = parsed.values.len(), "loaded override file");
            warnings.extend(parsed.warnings);
            parsed.values
        }
        Ok(None) => {
            if overrides.env_file.is_some() {
                warnings.push(format!("override file not found: {}", env_path.display()));
            }
            HashMap::new()
        }
        Err(e) => {
            violations.push(format!("cannot read override file {}: {e}", env_path.display()));
            HashMap::new()
        }
    };

    let merged = merge_sources(&file_values, process_env, overrides);
    let config = build(&merged, &mut violations, &mut warnings);

    violations
        .into_result()
        .map_err(|errors| ConfigurationError { errors })?;
    let config = config.ok_or_else(|| ConfigurationError {
        errors: vec!["configuration incomplete".to_string()],
    })?;
    Ok(Resolution { config, warnings })
}

fn build(
    merged: &HashMap<String, String>,
    violations: &mut Violations,
    warnings: &mut Vec<String>,
) -> Option<EffectiveConfig> {
    let get = |key: &str| merged.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
    let or_default = |key: &str, default: &str| get(key).unwrap_or(default).to_string();

    let phone_number_id = get(keys::PHONE_NUMBER_ID);
    let access_token = get(keys::ACCESS_TOKEN);
    if phone_number_id.is_none() || access_token.is_none() {
        violations.push(format!(
            "{} and {} are required (set in the override file or environment)",
            keys::PHONE_NUMBER_ID,
            keys::ACCESS_TOKEN
        ));
    }
    if let Some(id) = phone_number_id {
        violations.check(validation::validate_account_id(id));
    }

    let csv_path = get(keys::CSV_PATH).map(PathBuf::from);
    let pdf_path = get(keys::PDF_PATH).map(PathBuf::from);
    if csv_path.is_none() || pdf_path.is_none() {
        violations.push(format!(
            "{} and {} are required (set in the override file, environment or via --csv/--pdf)",
            keys::CSV_PATH,
            keys::PDF_PATH
        ));
    }
    if let Some(p) = &pdf_path {
        violations.check(readable_file(p, "PDF"));
    }
    if let Some(p) = &csv_path {
        violations.check(readable_file(p, "CSV"));
    }

    let delay = violations.check(validation::parse_delay(&or_default(keys::RATE, DEFAULT_RATE)));
    let template = match get(keys::TEMPLATE) {
        Some(raw) => violations.check(validation::parse_template_ref(raw)).map(Some),
        None => Some(None),
    };
    let log_level = violations.check(validation::validate_log_level(&or_default(
        keys::LOG_LEVEL,
        DEFAULT_LOG_LEVEL,
    )));

    let pdf_path = pdf_path?;
    let filename = match get(keys::FILENAME) {
        Some(name) => name.to_string(),
        None => pdf_path.file_name()?.to_string_lossy().into_owned(),
    };
    let (mime_type, mime_warning) = document_mime_type(&pdf_path);
    warnings.extend(mime_warning);

    Some(EffectiveConfig {
        phone_number_id: phone_number_id?.to_string(),
        access_token: access_token?.to_string(),
        graph_version: or_default(keys::GRAPH_VERSION, DEFAULT_GRAPH_VERSION),
        api_base: or_default(keys::API_BASE, DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string(),
        csv_path: csv_path?,
        pdf_path,
        filename,
        caption: merged.get(keys::CAPTION).cloned().unwrap_or_default(),
        mime_type,
        template: template?,
        delay: delay?,
        dry_run: get(keys::DRY_RUN).map(validation::parse_flag).unwrap_or(false),
        failed_csv: PathBuf::from(or_default(keys::FAILED_CSV, DEFAULT_FAILED_CSV)),
        log_level: log_level?,
        log_file: get(keys::LOG_FILE).map(PathBuf::from),
        audit_log: get(keys::AUDIT_LOG).map(PathBuf::from),
    })
}

fn readable_file(path: &Path, label: &str) -> Result<(), String> {
    if !path.is_file() {
        return Err(format!("{label} not found: {}", path.display()));
    }
    File::open(path)
        .map(|_| ())
        .map_err(|e| format!("{label} not readable: {}: {e}", path.display()))
}

/// The guess from the file extension is only advisory: the document is
/// always sent as [`DOCUMENT_MIME_TYPE`].
pub fn document_mime_type(path: &Path) -> (String, Option<String>) {
    let warning = match mime_guess::from_path(path).first() {
        Some(m) if m.essence_str() == DOCUMENT_MIME_TYPE => None,
        Some(m) => Some(format!(
            "detected MIME '{}', forcing {DOCUMENT_MIME_TYPE}",
            m.essence_str()
        )),
        None => Some(format!(
            "could not detect MIME type of {}, assuming {DOCUMENT_MIME_TYPE}",
            path.display()
        )),
    };
    (DOCUMENT_MIME_TYPE.to_string(), warning)
}
