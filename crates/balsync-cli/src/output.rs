//! CLI output formatting
//!
//! Commands report through an [`OutputFormatter`] so the same command
//! prints readable lines or machine-readable JSON depending on `--json`.

use balsync_core::domain::BaseLocale;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Erreur : {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Attention : {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// JSON summary of a dataset, as printed by every dataset command
pub fn base_locale_json(bal: &BaseLocale) -> serde_json::Value {
    serde_json::json!({
        "id": bal.id().to_string(),
        "nom": bal.nom(),
        "commune": bal.commune().as_str(),
        "status": bal.status().as_str(),
        "habilitation": bal.habilitation_id().map(|h| h.as_str()),
        "sync": bal.sync(),
        "updatedAt": bal.updated_at(),
        "deletedAt": bal.deleted_at(),
    })
}

/// One-line human summary of a dataset
pub fn base_locale_line(bal: &BaseLocale) -> String {
    let sync = match bal.sync() {
        Some(record) if record.is_paused() => format!("{} (en pause)", record.status().as_str()),
        Some(record) => record.status().as_str().to_string(),
        None => "-".to_string(),
    };
    format!(
        "{}  {}  {:<9}  sync={}  {}",
        bal.id(),
        bal.commune(),
        bal.status().as_str(),
        sync,
        bal.nom()
    )
}
