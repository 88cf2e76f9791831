//! Lenient query-string access. Repeated keys never fail a request; the last
//! occurrence wins.

use std::collections::HashMap;

use url::form_urlencoded;

#[derive(Debug, Clone, Default)]
pub struct QueryValues(HashMap<String, String>);

impl QueryValues {
    pub fn parse(raw: Option<&str>) -> Self {
        let values = raw
            .map(|raw| form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}
