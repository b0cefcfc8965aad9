//! Config loader for the proxy list
//!
//! Two YAML shapes are understood, both read in document order:
//!
//! ```yaml
//! # named mapping
//! hk-01:
//!   displayName: "Hong Kong 01"
//!   port: 42000
//! ```
//!
//! ```yaml
//! # Clash listeners document, as written by the converter
//! listeners:
//!   - name: mixed0
//!     type: mixed
//!     port: 42000
//!     proxy: "Hong Kong 01"
//! ```

use crate::proxy::error::Error;
use crate::proxy::models::ProxyDescriptor;
use crate::Result;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Entry of the named mapping form; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct NamedEntry {
    #[serde(
        default,
        rename = "displayName",
        alias = "display-name",
        alias = "display_name",
        alias = "proxy"
    )]
    display_name: Option<String>,
    port: u16,
}

/// Entry of a Clash `listeners:` sequence
#[derive(Debug, Deserialize)]
struct ListenerEntry {
    name: String,
    port: u16,
    #[serde(default, alias = "displayName")]
    proxy: Option<String>,
}

/// Loads proxy descriptors from YAML
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read and parse a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyDescriptor>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::parse(path, e),
        })?;

        Self::parse_document(&content).map_err(|reason| Error::parse(path, reason))
    }

    /// Parse descriptors from YAML text
    pub fn parse_str(content: &str) -> Result<Vec<ProxyDescriptor>> {
        Self::parse_document(content).map_err(|reason| Error::parse("<string>", reason))
    }

    fn parse_document(content: &str) -> std::result::Result<Vec<ProxyDescriptor>, String> {
        let document: Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

        match document {
            Value::Null => Ok(Vec::new()),
            Value::Mapping(mapping) => {
                if let Some(Value::Sequence(listeners)) = mapping.get("listeners") {
                    return listeners.iter().map(Self::parse_listener).collect();
                }
                mapping
                    .into_iter()
                    .map(|(key, value)| Self::parse_named(key, value))
                    .collect()
            }
            _ => Err("expected a mapping of proxy names at the top level".to_string()),
        }
    }

    fn parse_named(key: Value, value: Value) -> std::result::Result<ProxyDescriptor, String> {
        let name = match key {
            Value::String(name) => name,
            Value::Number(number) => number.to_string(),
            other => return Err(format!("unsupported proxy name: {:?}", other)),
        };

        let entry: NamedEntry =
            serde_yaml::from_value(value).map_err(|e| format!("entry '{}': {}", name, e))?;
        check_port(&name, entry.port)?;

        let descriptor = ProxyDescriptor::new(name, entry.port);
        Ok(match entry.display_name {
            Some(display_name) => descriptor.with_display_name(display_name),
            None => descriptor,
        })
    }

    fn parse_listener(value: &Value) -> std::result::Result<ProxyDescriptor, String> {
        let entry: ListenerEntry = serde_yaml::from_value(value.clone())
            .map_err(|e| format!("listener entry: {}", e))?;
        check_port(&entry.name, entry.port)?;

        let descriptor = ProxyDescriptor::new(entry.name, entry.port);
        Ok(match entry.proxy {
            Some(proxy) => descriptor.with_display_name(proxy),
            None => descriptor,
        })
    }
}

fn check_port(name: &str, port: u16) -> std::result::Result<(), String> {
    if port == 0 {
        return Err(format!("entry '{}': port must be between 1 and 65535", name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_mapping_keeps_order() {
        let yaml = r#"
zulu:
  displayName: "Zulu node"
  port: 42002
alpha:
  port: 42000
mike:
  display-name: Mike
  port: 42001
  type: mixed
"#;
        let descriptors = ConfigLoader::parse_str(yaml).unwrap();
        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["zulu", "alpha", "mike"]);

        assert_eq!(descriptors[0].display_name, "Zulu node");
        assert_eq!(descriptors[0].port, 42002);
        assert_eq!(descriptors[1].display_name, "alpha");
        assert_eq!(descriptors[2].display_name, "Mike");
    }

    #[test]
    fn test_parse_listeners_document() {
        let yaml = r#"
allow-lan: true
listeners:
  - name: mixed0
    type: mixed
    port: 42000
    proxy: "🇭🇰 Hong Kong 01"
  - name: mixed1
    type: mixed
    port: 42001
    proxy: "🇯🇵 Japan 01"
proxies:
  - name: "🇭🇰 Hong Kong 01"
    type: ss
"#;
        let descriptors = ConfigLoader::parse_str(yaml).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "mixed0");
        assert_eq!(descriptors[0].display_name, "🇭🇰 Hong Kong 01");
        assert_eq!(descriptors[0].port, 42000);
        assert_eq!(descriptors[1].name, "mixed1");
        assert_eq!(descriptors[1].port, 42001);
    }

    #[test]
    fn test_missing_port_is_parse_error() {
        let yaml = r#"
p1:
  displayName: no port here
"#;
        let err = ConfigLoader::parse_str(yaml).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("p1"));
    }

    #[test]
    fn test_invalid_port_is_parse_error() {
        assert!(ConfigLoader::parse_str("p1:\n  port: 70000\n").is_err());
        assert!(ConfigLoader::parse_str("p1:\n  port: 0\n").is_err());
        assert!(ConfigLoader::parse_str("p1:\n  port: abc\n").is_err());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = ConfigLoader::parse_str("p1: [unclosed").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));

        let err = ConfigLoader::parse_str("- 1080\n- 1081\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_empty_document() {
        assert!(ConfigLoader::parse_str("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_ports_are_kept() {
        let yaml = "a:\n  port: 1080\nb:\n  port: 1080\n";
        let descriptors = ConfigLoader::parse_str(yaml).unwrap();
        assert_eq!(descriptors.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        let err = ConfigLoader::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(p) if p == path));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "p1:\n  port: 1080\np2:\n  port: 1081\n").unwrap();

        let descriptors = ConfigLoader::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            descriptors,
            vec![ProxyDescriptor::new("p1", 1080), ProxyDescriptor::new("p2", 1081)]
        );
    }
}
