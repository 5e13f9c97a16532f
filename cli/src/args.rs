use clap::Parser;
use config::ConfigOverrides;
use std::path::PathBuf;

/// Every flag also accepts `--flag=value`. Values given here win over the
/// override file and the environment.
#[derive(Debug, Parser)]
#[command(name = "wa-broadcast", version)]
#[command(
    about = "Upload a PDF to the WhatsApp Cloud API and send it to every number in a CSV",
    long_about = None
)]
pub struct Cli {
    /// KEY=VALUE override file [default: ./.env]
    #[arg(long, value_name = "PATH")]
    pub env: Option<PathBuf>,

    /// Numbers file, no header, number in the first column (CSV_PATH)
    #[arg(long, value_name = "PATH")]
    pub csv: Option<String>,

    /// Document to upload (PDF_PATH)
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<String>,

    /// Caption shown under the document (CAPTION)
    #[arg(long, allow_hyphen_values = true)]
    pub caption: Option<String>,

    /// File name shown to recipients (FILENAME)
    #[arg(long)]
    pub filename: Option<String>,

    /// Seconds to wait between recipients (RATE)
    #[arg(long, value_name = "SECONDS")]
    pub rate: Option<String>,

    /// Template sent before the document, as name:lang (TEMPLATE)
    #[arg(long, value_name = "NAME:LANG")]
    pub template: Option<String>,

    /// Validate and walk the list without calling the API (DRY_RUN)
    #[arg(long)]
    pub dry_run: bool,

    /// trace, debug, info, warn or error (LOG_LEVEL)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Also append logs to this file (LOG_FILE)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<String>,

    /// Where failed numbers are written (FAILED_CSV)
    #[arg(long, value_name = "PATH")]
    pub failed_csv: Option<String>,

    /// Append run events as JSON lines to this file (AUDIT_LOG)
    #[arg(long, value_name = "PATH")]
    pub audit_log: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            env_file: self.env.clone(),
            csv: self.csv.clone(),
            pdf: self.pdf.clone(),
            caption: self.caption.clone(),
            filename: self.filename.clone(),
            rate: self.rate.clone(),
            template: self.template.clone(),
            dry_run: self.dry_run,
            log_level: self.log_level.clone(),
            log_file: self.log_file.clone(),
            failed_csv: self.failed_csv.clone(),
            audit_log: self.audit_log.clone(),
        }
    }
}
