use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{resolve, ConfigOverrides, DEFAULT_GRAPH_VERSION, DOCUMENT_MIME_TYPE};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("numbers.csv"), "27821234567\n").unwrap();
        fs::write(dir.path().join("offer.pdf"), b"%PDF-1.4 test").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_env(&self, body: &str) -> PathBuf {
        let p = self.path("test.env");
        fs::write(&p, body).unwrap();
        p
    }

    fn base_env(&self) -> String {
        format!(
            "WA_PHONE_NUMBER_ID=1234567890\nWA_ACCESS_TOKEN=token\nCSV_PATH={}\nPDF_PATH={}\n",
            self.path("numbers.csv").display(),
            self.path("offer.pdf").display()
        )
    }

    fn overrides(&self, env_file: &Path) -> ConfigOverrides {
        ConfigOverrides {
            env_file: Some(env_file.to_path_buf()),
            ..Default::default()
        }
    }
}

#[test]
fn defaults_fill_optional_fields() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&fx.base_env());
    let res = resolve(&fx.overrides(&env_file), &HashMap::new()).unwrap();
    let cfg = res.config;

    assert_eq!(cfg.graph_version, DEFAULT_GRAPH_VERSION);
    assert_eq!(cfg.delay, Duration::from_millis(500));
    assert!(!cfg.dry_run);
    assert_eq!(cfg.filename, "offer.pdf");
    assert_eq!(cfg.caption, "");
    assert_eq!(cfg.mime_type, DOCUMENT_MIME_TYPE);
    assert_eq!(cfg.failed_csv, PathBuf::from("failed.csv"));
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.template.is_none());
    assert!(res.warnings.is_empty());
}

#[test]
fn command_line_rate_beats_override_file() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!("{}RATE=2\n", fx.base_env()));
    let overrides = ConfigOverrides {
        rate: Some("0.1".into()),
        ..fx.overrides(&env_file)
    };
    let cfg = resolve(&overrides, &HashMap::new()).unwrap().config;
    assert_eq!(cfg.delay, Duration::from_millis(100));
}

#[test]
fn real_environment_beats_override_file() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!("{}CAPTION=from file\nFILENAME=File.pdf\n", fx.base_env()));
    let env: HashMap<String, String> = [("CAPTION".to_string(), "from env".to_string())].into();
    let cfg = resolve(&fx.overrides(&env_file), &env).unwrap().config;
    assert_eq!(cfg.caption, "from env");
    assert_eq!(cfg.filename, "File.pdf");
}

#[test]
fn template_is_split() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!("{}TEMPLATE=promo:en_US\n", fx.base_env()));
    let cfg = resolve(&fx.overrides(&env_file), &HashMap::new()).unwrap().config;
    let t = cfg.template.unwrap();
    assert_eq!(t.name, "promo");
    assert_eq!(t.language, "en_US");
}

#[test]
fn template_without_language_is_a_configuration_error() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!("{}TEMPLATE=promo\n", fx.base_env()));
    let err = resolve(&fx.overrides(&env_file), &HashMap::new()).unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert!(err.errors[0].contains("TEMPLATE"));
}

#[test]
fn every_violation_is_reported() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!(
        "CSV_PATH={}\nPDF_PATH={}\nRATE=-3\nTEMPLATE=broken\n",
        fx.path("missing.csv").display(),
        fx.path("missing.pdf").display()
    ));
    let err = resolve(&fx.overrides(&env_file), &HashMap::new()).unwrap_err();
    let all = err.errors.join("\n");
    assert_eq!(err.errors.len(), 5, "{all}");
    assert!(all.contains("WA_PHONE_NUMBER_ID and WA_ACCESS_TOKEN are required"));
    assert!(all.contains("PDF not found"));
    assert!(all.contains("CSV not found"));
    assert!(all.contains("RATE"));
    assert!(all.contains("TEMPLATE"));
}

#[test]
fn dry_run_flag_and_malformed_lines() {
    let fx = Fixture::new();
    let env_file = fx.write_env(&format!("{}this is not a pair\n", fx.base_env()));
    let overrides = ConfigOverrides {
        dry_run: true,
        pdf: Some(fx.path("offer.pdf").display().to_string()),
        ..fx.overrides(&env_file)
    };
    let res = resolve(&overrides, &HashMap::new()).unwrap();
    assert!(res.config.dry_run);
    assert_eq!(res.warnings.len(), 1);
    assert!(res.warnings[0].contains("line 5"));
}

#[test]
fn non_pdf_extension_is_forced_with_warning() {
    let fx = Fixture::new();
    fs::write(fx.path("offer.docx"), b"PK").unwrap();
    let env_file = fx.write_env(&fx.base_env());
    let overrides = ConfigOverrides {
        pdf: Some(fx.path("offer.docx").display().to_string()),
        ..fx.overrides(&env_file)
    };
    let res = resolve(&overrides, &HashMap::new()).unwrap();
    assert_eq!(res.config.mime_type, DOCUMENT_MIME_TYPE);
    assert_eq!(res.config.filename, "offer.docx");
    assert_eq!(res.warnings.len(), 1);
}

#[test]
fn explicit_missing_override_file_warns() {
    let fx = Fixture::new();
    let env: HashMap<String, String> = [
        ("WA_PHONE_NUMBER_ID", "1234567890"),
        ("WA_ACCESS_TOKEN", "token"),
        ("CSV_PATH", fx.path("numbers.csv").to_str().unwrap()),
        ("PDF_PATH", fx.path("offer.pdf").to_str().unwrap()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let res = resolve(&fx.overrides(&fx.path("absent.env")), &env).unwrap();
    assert_eq!(res.warnings.len(), 1);
    assert!(res.warnings[0].contains("not found"));
}
