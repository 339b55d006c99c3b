// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON-over-HTTP value source.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::error::{ConfigError, Error, TransportError};
use crate::unsupported::UnsupportedAddresses;
use crate::value::NamedValueMap;

use super::{ValueSource, timeout_millis};

/// Configuration of a [`JsonHttpSource`].
///
/// # Examples
///
/// ```
/// use polltree::poll::HttpSourceConfig;
/// use std::time::Duration;
///
/// let config = HttpSourceConfig::new("192.168.1.1")
///     .with_https()
///     .with_port(8443)
///     .with_path("/api/s/default/stat/health")
///     .with_query("type", "wan")
///     .with_pointer("/data")
///     .with_field("wan_ip", "WAN IP")
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(
///     config.url(),
///     "https://192.168.1.1:8443/api/s/default/stat/health?type=wan"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    host: String,
    port: u16,
    use_https: bool,
    credentials: Option<(String, String)>,
    timeout: Duration,
    path: String,
    query: Vec<(String, String)>,
    pointer: Option<String>,
    fields: Vec<(String, String)>,
}

impl HttpSourceConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a configuration fetching `/` from `host` over plain HTTP.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            use_https: false,
            credentials: None,
            timeout: Self::DEFAULT_TIMEOUT,
            path: "/".to_string(),
            query: Vec::new(),
            pointer: None,
            fields: Vec::new(),
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS, switching the default port to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Sets basic authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Selects the sub-document at a JSON pointer such as `/data/0`.
    #[must_use]
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    /// Keeps field `source` under the name `name`.
    ///
    /// Once a field is configured, unlisted fields are dropped and the
    /// listed ones appear in configuration order.
    #[must_use]
    pub fn with_field(mut self, source: impl Into<String>, name: impl Into<String>) -> Self {
        self.fields.push((source.into(), name.into()));
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the credentials if set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let default_port = if self.use_https {
            Self::DEFAULT_HTTPS_PORT
        } else {
            Self::DEFAULT_PORT
        };
        if self.port == default_port {
            format!("{scheme}://{}", self.host)
        } else {
            format!("{scheme}://{}:{}", self.host, self.port)
        }
    }

    /// Builds the full request URL with an encoded query string.
    #[must_use]
    pub fn url(&self) -> String {
        let mut url = self.base_url();
        url.push_str(&self.path);
        for (index, (key, value)) in self.query.iter().enumerate() {
            url.push(if index == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSource`] for an empty host, a zero
    /// timeout or a JSON pointer not starting with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidSource("host is required".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidSource(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if let Some(pointer) = &self.pointer
            && !pointer.is_empty()
            && !pointer.starts_with('/')
        {
            return Err(ConfigError::InvalidSource(format!(
                "JSON pointer must start with '/': {pointer}"
            )));
        }
        Ok(())
    }

    /// Creates the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn into_source(self) -> Result<JsonHttpSource, Error> {
        self.validate()?;
        let url = self.url();
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(JsonHttpSource {
            client,
            url,
            credentials: self.credentials,
            pointer: self.pointer,
            fields: self.fields,
        })
    }
}

/// Fetches a JSON document and turns it into named values.
///
/// Objects become nested groups; arrays and nulls are dropped. A document
/// that is an array of objects is merged object by object, later objects
/// overriding earlier ones.
#[derive(Debug, Clone)]
pub struct JsonHttpSource {
    client: Client,
    url: String,
    credentials: Option<(String, String)>,
    pointer: Option<String>,
    fields: Vec<(String, String)>,
}

impl JsonHttpSource {
    /// Returns the request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Projects a fetched document onto named values.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Malformed`] if the configured pointer
    /// selects nothing.
    pub fn project(&self, document: &serde_json::Value) -> Result<NamedValueMap, TransportError> {
        let selected = match self.pointer.as_deref() {
            Some(pointer) if !pointer.is_empty() => document.pointer(pointer).ok_or_else(|| {
                TransportError::Malformed(format!("no value at JSON pointer {pointer}"))
            })?,
            _ => document,
        };

        match selected {
            serde_json::Value::Array(items) => {
                let mut values = NamedValueMap::new();
                for item in items {
                    values.merge(self.map_object(item));
                }
                Ok(values)
            }
            other => Ok(self.map_object(other)),
        }
    }

    fn map_object(&self, object: &serde_json::Value) -> NamedValueMap {
        if self.fields.is_empty() {
            return NamedValueMap::from_json(object);
        }

        let mut renamed = serde_json::Map::new();
        for (source, name) in &self.fields {
            if let Some(value) = object.get(source) {
                renamed.insert(name.clone(), value.clone());
            }
        }
        NamedValueMap::from_json(&serde_json::Value::Object(renamed))
    }

    async fn fetch_document(&self, read_timeout: Duration) -> Result<serde_json::Value, TransportError> {
        let mut request = self.client.get(&self.url);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        tracing::debug!(url = %self.url, "Fetching JSON document");

        let response = tokio::time::timeout(read_timeout, request.send())
            .await
            .map_err(|_| {
                TransportError::ConnectionFailed(format!(
                    "no response within {} ms",
                    timeout_millis(read_timeout)
                ))
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

impl ValueSource for JsonHttpSource {
    fn fetch(
        &mut self,
        read_timeout: Duration,
        _unsupported: &mut UnsupportedAddresses,
    ) -> impl Future<Output = Result<NamedValueMap, TransportError>> + Send {
        async move {
            let document = self.fetch_document(read_timeout).await?;
            self.project(&document)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Item, Value};

    fn source(config: HttpSourceConfig) -> JsonHttpSource {
        config.into_source().unwrap()
    }

    #[test]
    fn default_values() {
        let config = HttpSourceConfig::new("10.0.0.2");
        assert_eq!(config.port(), 80);
        assert!(!config.use_https());
        assert!(config.credentials().is_none());
        assert_eq!(config.timeout(), HttpSourceConfig::DEFAULT_TIMEOUT);
        assert_eq!(config.url(), "http://10.0.0.2/");
    }

    #[test]
    fn https_switches_default_port() {
        let config = HttpSourceConfig::new("unifi").with_https();
        assert_eq!(config.port(), 443);
        assert_eq!(config.base_url(), "https://unifi");
    }

    #[test]
    fn query_is_encoded() {
        let config = HttpSourceConfig::new("host")
            .with_path("api/v1")
            .with_query("name", "Power Today")
            .with_query("unit", "kWh&more");
        assert_eq!(
            config.url(),
            "http://host/api/v1?name=Power%20Today&unit=kWh%26more"
        );
    }

    #[test]
    fn validation() {
        assert!(HttpSourceConfig::new("").validate().is_err());
        assert!(
            HttpSourceConfig::new("h")
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            HttpSourceConfig::new("h")
                .with_pointer("data")
                .validate()
                .is_err()
        );
        assert!(HttpSourceConfig::new("h").with_pointer("/data").validate().is_ok());
    }

    #[test]
    fn project_selects_pointer() {
        let source = source(HttpSourceConfig::new("h").with_pointer("/data/0"));
        let document = serde_json::json!({"data": [{"latency": 12, "wan_ip": "1.2.3.4"}]});

        let values = source.project(&document).unwrap();
        assert_eq!(values.value("latency"), Some(&Value::Int(12)));
    }

    #[test]
    fn project_missing_pointer_is_malformed() {
        let source = source(HttpSourceConfig::new("h").with_pointer("/missing"));
        let err = source.project(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[test]
    fn project_merges_arrays() {
        let source = source(HttpSourceConfig::new("h").with_pointer("/data"));
        let document = serde_json::json!({"data": [
            {"subsystem": "wan", "latency": 12},
            {"subsystem": "www", "xput_up": 9.5}
        ]});

        let values = source.project(&document).unwrap();
        assert_eq!(values.names().collect::<Vec<_>>(), ["subsystem", "latency", "xput_up"]);
        assert_eq!(values.value("subsystem"), Some(&Value::from("www")));
    }

    #[test]
    fn field_mapper_renames_and_orders() {
        let source = source(
            HttpSourceConfig::new("h")
                .with_field("xput_down", "Download")
                .with_field("latency", "Latency"),
        );
        let document = serde_json::json!({"latency": 12, "xput_down": 80.5, "noise": true});

        let values = source.project(&document).unwrap();
        assert_eq!(values.names().collect::<Vec<_>>(), ["Download", "Latency"]);
    }

    #[test]
    fn nested_objects_become_groups() {
        let source = source(HttpSourceConfig::new("h"));
        let document = serde_json::json!({"station": {"temperature": 21.5}});

        let values = source.project(&document).unwrap();
        assert!(matches!(values.get("station"), Some(Item::Group(_))));
    }
}
