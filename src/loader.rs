//! Reading specifications from disk, and generator settings.
//!
//! Specifications are plain YAML (`.yaml`, `.yml`) or JSON (`.json`)
//! documents whose root is a mapping. The format is chosen by extension.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::diagnostics::{Result, RossaError};
use crate::value::Mapping;

/// Root key where loop extraction starts unless configured otherwise.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// Settings for [`Generator`](crate::sequence::Generator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub entry_point: String,
}

impl GeneratorConfig {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_POINT)
    }
}

/// Supported specification encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "yaml" | "yml" => Some(SpecFormat::Yaml),
            "json" => Some(SpecFormat::Json),
            _ => None,
        }
    }
}

/// Decodes a specification from text.
pub fn parse_specification(source: &str, format: SpecFormat, origin: &str) -> Result<Mapping> {
    let decoded = match format {
        SpecFormat::Yaml => serde_yaml::from_str::<Mapping>(source).map_err(|e| e.to_string()),
        SpecFormat::Json => serde_json::from_str::<Mapping>(source).map_err(|e| e.to_string()),
    };
    decoded.map_err(|message| RossaError::Format {
        path: origin.to_string(),
        message,
    })
}

/// Loads a specification file, choosing the decoder by extension.
pub fn load_specification<P: AsRef<Path>>(path: P) -> Result<Mapping> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    let format = SpecFormat::from_path(path).ok_or_else(|| RossaError::UnsupportedFormat {
        path: shown.clone(),
    })?;
    let source = fs::read_to_string(path).map_err(|source| RossaError::Io {
        path: shown.clone(),
        source,
    })?;
    let spec = parse_specification(&source, format, &shown)?;
    debug!(path = %shown, ?format, keys = spec.len(), "loaded specification");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::diagnostics::ErrorType;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SpecFormat::from_path(Path::new("a.yml")), Some(SpecFormat::Yaml));
        assert_eq!(SpecFormat::from_path(Path::new("a.yaml")), Some(SpecFormat::Yaml));
        assert_eq!(SpecFormat::from_path(Path::new("a.json")), Some(SpecFormat::Json));
        assert_eq!(SpecFormat::from_path(Path::new("a.toml")), None);
        assert_eq!(SpecFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_yaml_and_json_decode_alike() {
        let yaml = parse_specification("main: {loop: {t: {p: [1, 2]}}}", SpecFormat::Yaml, "a").unwrap();
        let json = parse_specification(
            r#"{"main": {"loop": {"t": {"p": [1, 2]}}}}"#,
            SpecFormat::Json,
            "b",
        )
        .unwrap();
        assert_eq!(yaml, json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "main:\n  loop:\n    t: {{p: 1}}").unwrap();
        let spec = load_specification(file.path()).unwrap();
        assert!(spec.contains_key("main"));
    }

    #[test]
    fn test_input_errors() {
        let err = load_specification("spec.toml").unwrap_err();
        assert!(matches!(err, RossaError::UnsupportedFormat { .. }));
        let err = load_specification("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, RossaError::Io { .. }));
        let err = parse_specification("[1, 2]", SpecFormat::Yaml, "list.yaml").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Input);
    }

    #[test]
    fn test_default_entry_point() {
        assert_eq!(GeneratorConfig::default().entry_point, "main");
    }
}
