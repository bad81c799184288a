use rand::Rng;
use std::fs;
use std::path::PathBuf;

use crate::models::TemplateSelection;

const TEMPLATES_FILE: &str = "templates.json";

pub fn templates_path() -> Result<PathBuf, String> {
    Ok(crate::modules::persistence::data_dir()?.join(TEMPLATES_FILE))
}

/// Load the ordered message template list from `templates.json` in the data
/// directory. The file is operator-supplied content; on first run an empty
/// file is created and startup validation rejects the empty list with a
/// pointer at it.
pub fn load_templates() -> Result<Vec<String>, String> {
    let path = templates_path()?;

    if !path.exists() {
        fs::write(&path, "[]\n").map_err(|e| format!("failed_to_create_templates_file: {}", e))?;
        return Ok(Vec::new());
    }

    let content =
        fs::read_to_string(&path).map_err(|e| format!("failed_to_read_templates_file: {}", e))?;
    let templates: Vec<String> = serde_json::from_str(&content)
        .map_err(|e| format!("failed_to_parse_templates_file: {}", e))?;

    Ok(templates)
}

/// Pick a template body. Round-robin is a pure function of the explicit
/// `counter` (no hidden selection state), which keeps coverage even and
/// replays reproducible; `random` matches the legacy behavior.
pub fn select(templates: &[String], policy: TemplateSelection, counter: usize) -> &str {
    debug_assert!(!templates.is_empty(), "template list must be non-empty");
    let slot = match policy {
        TemplateSelection::RoundRobin => counter % templates.len(),
        TemplateSelection::Random => rand::thread_rng().gen_range(0..templates.len()),
    };
    &templates[slot]
}
