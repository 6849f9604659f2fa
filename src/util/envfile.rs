use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, surrounding
/// quotes are removed.
pub fn parse_env_str(content: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (idx, line) in content.lines().enumerate() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = s.split_once('=') {
            let mut val = val.trim().to_string();
            if val.len() >= 2
                && ((val.starts_with('"') && val.ends_with('"'))
                    || (val.starts_with('\'') && val.ends_with('\'')))
            {
                val = val[1..val.len() - 1].to_string();
            }
            map.insert(key.trim().to_string(), val);
        } else {
            log::warn!("ignoring .env line {} without '=': {}", idx + 1, line);
        }
    }
    map
}

/// Parse a .env file if present. Does not modify the process environment.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(parse_env_str(&content))
}

/// Load `.env` from the current working directory into the process environment.
/// Existing variables are NOT overridden. Returns the keys that were applied.
pub fn load_dotenv_if_present() -> Result<Vec<String>> {
    let map = parse_env_file(Path::new(".env"))?;
    let mut applied = Vec::new();
    for (k, v) in map {
        if std::env::var_os(&k).is_none() {
            // Called from main before any worker threads exist.
            unsafe {
                std::env::set_var(&k, &v);
            }
            applied.push(k);
        }
    }
    applied.sort();
    Ok(applied)
}

/// Generate a .env template with every supported setting commented out.
pub fn write_env_template(path: &str) -> Result<()> {
    let mut f = fs::File::create(path)?;
    let template = r#"# dataset_search environment configuration template
# Copy this file to .env next to where you run dataset_search.
# Command-line flags always win over these values.

# Acceptance threshold for both name scores (0-100)
#DATASET_SEARCH_THRESHOLD=75

# Name similarity metric: ratio | levenshtein | jaro-winkler
#DATASET_SEARCH_SCORER=ratio

# Batch output
#DATASET_SEARCH_OUT=search_results.xlsx
#DATASET_SEARCH_FORMAT=xlsx

# Evaluate batch queries in parallel (true/false)
#DATASET_SEARCH_PARALLEL=false

# Resumable batch runs
#DATASET_SEARCH_CHECKPOINT=search_results.ckpt

# Logging (env_logger syntax)
#RUST_LOG=info
"#;
    f.write_all(template.as_bytes())?;
    Ok(())
}
