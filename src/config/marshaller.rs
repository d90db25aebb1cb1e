//! Textual representation of the routing configuration.
//!
//! # Format
//! ```text
//! {
//!   "containers": [ { "<unit>": ["<url>", ...] }, ... ],
//!   "servers":    [ { "<server>": ["<url>", ...] }, ... ]
//! }
//! ```
//!
//! # Design Decisions
//! - Parsing walks a `serde_json::Value` so shape errors name the offending path
//! - Missing `containers`/`servers` arrays read as empty (older snapshots)
//! - Output is sorted by name and url so hand edits diff cleanly

use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::io::Read;

use crate::registry::{Configuration, HostMap, RoutingTable, Scope};

/// The persisted file does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum MalformedConfigError {
    #[error("configuration is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("malformed configuration at {path}: expected {expected}")]
    Shape { path: String, expected: &'static str },
}

fn shape(path: impl Into<String>, expected: &'static str) -> MalformedConfigError {
    MalformedConfigError::Shape {
        path: path.into(),
        expected,
    }
}

/// Converts configurations to and from their JSON file form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigurationMarshaller;

impl ConfigurationMarshaller {
    pub fn new() -> Self {
        Self
    }

    /// Render the current snapshot of `configuration`.
    pub fn marshall(&self, configuration: &Configuration) -> String {
        self.marshall_table(&configuration.snapshot())
    }

    pub fn marshall_table(&self, table: &RoutingTable) -> String {
        let doc = json!({
            "containers": scope_entries(table.hosts_per_container()),
            "servers": scope_entries(table.hosts_per_server()),
        });
        format!("{:#}", doc)
    }

    /// Parse text into a fresh configuration.
    pub fn unmarshall(&self, text: &str) -> Result<Configuration, MalformedConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Configuration::from_table(parse_document(&value)?))
    }

    pub fn unmarshall_reader<R: Read>(&self, reader: R) -> Result<Configuration, MalformedConfigError> {
        let value: Value = serde_json::from_reader(reader)?;
        Ok(Configuration::from_table(parse_document(&value)?))
    }
}

fn scope_entries(map: &HostMap) -> Value {
    let mut names: Vec<&String> = map.keys().collect();
    names.sort();

    let entries = names
        .into_iter()
        .map(|name| {
            let urls: BTreeSet<&String> = map[name].iter().collect();
            let urls = urls.into_iter().map(|url| Value::String(url.clone())).collect();
            let mut entry = Map::new();
            entry.insert(name.clone(), Value::Array(urls));
            Value::Object(entry)
        })
        .collect();
    Value::Array(entries)
}

fn parse_document(value: &Value) -> Result<RoutingTable, MalformedConfigError> {
    let root = value
        .as_object()
        .ok_or_else(|| shape("$", "an object"))?;

    let containers = parse_scope(root, Scope::Container)?;
    let servers = parse_scope(root, Scope::Server)?;
    Ok(RoutingTable::from_maps(containers, servers))
}

fn parse_scope(root: &Map<String, Value>, scope: Scope) -> Result<HostMap, MalformedConfigError> {
    let key = match scope {
        Scope::Container => "containers",
        Scope::Server => "servers",
    };

    let mut hosts = HostMap::new();
    let entries = match root.get(key) {
        None | Some(Value::Null) => return Ok(hosts),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(shape(format!("$.{}", key), "an array")),
    };

    for (index, entry) in entries.iter().enumerate() {
        let path = format!("$.{}[{}]", key, index);
        let object = entry.as_object().ok_or_else(|| shape(&path, "an object"))?;

        for (name, urls) in object {
            let name_path = format!("{}.{}", path, name);
            if name.is_empty() {
                return Err(shape(name_path, "a non-empty name"));
            }
            let urls = urls
                .as_array()
                .ok_or_else(|| shape(&name_path, "an array of urls"))?;

            let set: &mut HashSet<String> = hosts.entry(name.clone()).or_default();
            for (url_index, url) in urls.iter().enumerate() {
                let url = url
                    .as_str()
                    .ok_or_else(|| shape(format!("{}[{}]", name_path, url_index), "a string"))?;
                let url = crate::registry::endpoint::normalize_url(url);
                if !url.is_empty() {
                    set.insert(url);
                }
            }
        }
    }

    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Configuration {
        let config = Configuration::new();
        config.add_container_host("unit-1", "http://h1:8080");
        config.add_container_host("unit-1", "http://h2:8080");
        config.add_container_host("unit-2", "http://h2:8080");
        config.add_server_host("server-1", "http://h1:8080");
        config.add_server_host("unit-1", "http://h9:8080");
        config
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let marshaller = ConfigurationMarshaller::new();
        let original = sample();
        let text = marshaller.marshall(&original);
        let parsed = marshaller.unmarshall(&text).unwrap();
        assert_eq!(*parsed.snapshot(), *original.snapshot());

        let empty = Configuration::new();
        let parsed = marshaller.unmarshall(&marshaller.marshall(&empty)).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_single_container_document() {
        let marshaller = ConfigurationMarshaller::new();
        let config = Configuration::new();
        config.add_container_host("unit-1", "http://h1:8080");

        let value: Value = serde_json::from_str(&marshaller.marshall(&config)).unwrap();
        assert_eq!(
            value,
            json!({"containers": [{"unit-1": ["http://h1:8080"]}], "servers": []})
        );
    }

    #[test]
    fn test_missing_arrays_are_empty() {
        let marshaller = ConfigurationMarshaller::new();
        let parsed = marshaller
            .unmarshall(r#"{"servers": [{"server-1": ["http://h1:9000"]}]}"#)
            .unwrap();
        assert!(parsed.hosts_per_container().is_empty());
        assert_eq!(parsed.hosts(Scope::Server, "server-1"), vec!["http://h1:9000"]);

        assert!(marshaller.unmarshall("{}").unwrap().is_empty());
    }

    #[test]
    fn test_entries_for_same_name_merge() {
        let marshaller = ConfigurationMarshaller::new();
        let parsed = marshaller
            .unmarshall(
                r#"{"containers": [{"u": ["http://a"]}, {"u": ["http://b", "http://a/"]}, {"empty": []}]}"#,
            )
            .unwrap();
        assert_eq!(parsed.hosts(Scope::Container, "u").len(), 2);
        assert!(!parsed.hosts_per_container().contains_key("empty"));
    }

    #[test]
    fn test_malformed_shapes() {
        let marshaller = ConfigurationMarshaller::new();
        let cases = [
            ("[]", "$"),
            (r#"{"containers": {}}"#, "$.containers"),
            (r#"{"containers": ["unit-1"]}"#, "$.containers[0]"),
            (r#"{"servers": [{"s": "http://h1"}]}"#, "$.servers[0].s"),
            (r#"{"servers": [{"s": [42]}]}"#, "$.servers[0].s[0]"),
        ];
        for (text, expected_path) in cases {
            match marshaller.unmarshall(text) {
                Err(MalformedConfigError::Shape { path, .. }) => assert_eq!(path, expected_path),
                other => panic!("expected shape error for {}, got {:?}", text, other.map(|_| ())),
            }
        }

        assert!(matches!(
            marshaller.unmarshall(r#"{"containers": [{"u": ["http://a"]"#),
            Err(MalformedConfigError::Syntax(_))
        ));
    }

    #[test]
    fn test_unmarshall_reader() {
        let text = r#"{"servers": [{"server-1": ["http://h1:9000/"]}]}"#;
        let parsed = ConfigurationMarshaller::new()
            .unmarshall_reader(text.as_bytes())
            .unwrap();
        assert_eq!(parsed.hosts(Scope::Server, "server-1"), vec!["http://h1:9000"]);
        assert!(ConfigurationMarshaller::new()
            .unmarshall_reader("[]".as_bytes())
            .is_err());
    }
}
