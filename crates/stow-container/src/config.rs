//! Container connection configuration.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Endpoint suffix of the public Azure cloud.
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration identifying one blob container within a storage account.
///
/// # Environment Variables
///
/// - `STOW_ACCOUNT_NAME` - Storage account name
/// - `STOW_ACCOUNT_KEY` - Storage account access key (base64)
/// - `STOW_CONTAINER` - Container name
/// - `STOW_ENDPOINT` - Blob service endpoint override (e.g. Azurite)
/// - `STOW_REQUEST_TIMEOUT_SECS` - Timeout for container management calls
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ContainerConfig {
    /// Storage account name
    #[cfg_attr(
        feature = "config",
        arg(long = "account-name", env = "STOW_ACCOUNT_NAME")
    )]
    pub account_name: String,

    /// Storage account access key (base64)
    #[cfg_attr(
        feature = "config",
        arg(long = "account-key", env = "STOW_ACCOUNT_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub account_key: String,

    /// Container name
    #[cfg_attr(feature = "config", arg(long = "container", env = "STOW_CONTAINER"))]
    pub container_name: String,

    /// Blob service endpoint override (defaults to the account's public endpoint)
    #[cfg_attr(feature = "config", arg(long = "endpoint", env = "STOW_ENDPOINT"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Timeout in seconds for container management calls (optional)
    #[cfg_attr(
        feature = "config",
        arg(long = "request-timeout", env = "STOW_REQUEST_TIMEOUT_SECS")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

impl ContainerConfig {
    /// Create a configuration from account credentials and a container name.
    pub fn new(
        account_name: impl Into<String>,
        account_key: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            account_key: account_key.into(),
            container_name: container_name.into(),
            endpoint: None,
            request_timeout: None,
        }
    }

    /// Parse a storage connection string such as
    /// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...`.
    ///
    /// `BlobEndpoint` overrides the endpoint; otherwise a non-default
    /// `EndpointSuffix` or `DefaultEndpointsProtocol` is folded into one.
    pub fn from_connection_string(
        connection_string: &str,
        container_name: impl Into<String>,
    ) -> Result<Self> {
        let mut account_name = None;
        let mut account_key = None;
        let mut blob_endpoint = None;
        let mut protocol = "https";
        let mut suffix = DEFAULT_ENDPOINT_SUFFIX;

        for pair in connection_string.split(';').filter(|p| !p.trim().is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(Error::invalid_config(format!(
                    "connection string segment '{pair}' is not a key=value pair"
                )));
            };

            match key.trim() {
                "AccountName" => account_name = Some(value.trim()),
                "AccountKey" => account_key = Some(value.trim()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim()),
                "DefaultEndpointsProtocol" => protocol = value.trim(),
                "EndpointSuffix" => suffix = value.trim(),
                _ => {}
            }
        }

        let account_name = account_name
            .ok_or_else(|| Error::invalid_config("connection string is missing AccountName"))?;
        let account_key = account_key
            .ok_or_else(|| Error::invalid_config("connection string is missing AccountKey"))?;

        let mut config = Self::new(account_name, account_key, container_name);
        config.endpoint = match blob_endpoint {
            Some(endpoint) => Some(endpoint.trim_end_matches('/').to_owned()),
            None if protocol != "https" || suffix != DEFAULT_ENDPOINT_SUFFIX => {
                Some(format!("{protocol}://{account_name}.blob.{suffix}"))
            }
            None => None,
        };

        Ok(config)
    }

    /// Render the connection descriptor for this account.
    pub fn connection_string(&self) -> String {
        let mut descriptor = format!(
            "DefaultEndpointsProtocol=https;AccountName={};AccountKey={}",
            self.account_name, self.account_key
        );
        if let Some(endpoint) = &self.endpoint {
            descriptor.push_str(";BlobEndpoint=");
            descriptor.push_str(endpoint);
        }
        descriptor
    }

    /// Set the blob service endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the container management request timeout in seconds.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout = Some(secs);
        self
    }

    /// Returns the blob service endpoint without a trailing slash.
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_owned(),
            None => format!(
                "https://{}.blob.{DEFAULT_ENDPOINT_SUFFIX}",
                self.account_name
            ),
        }
    }

    /// Returns the management request timeout.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Decode the account key.
    pub fn decoded_key(&self) -> Result<Vec<u8>> {
        BASE64_STANDARD
            .decode(self.account_key.trim())
            .map_err(|e| Error::invalid_config(format!("account key is not valid base64: {e}")))
    }

    /// Validates the account, key, container name and endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.account_name.trim().is_empty() {
            return Err(Error::invalid_config("account name must not be empty"));
        }

        if self.decoded_key()?.is_empty() {
            return Err(Error::invalid_config("account key must not be empty"));
        }

        validate_container_name(&self.container_name)?;

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)
                .map_err(|e| Error::invalid_config(format!("invalid endpoint '{endpoint}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::invalid_config(format!(
                    "endpoint '{endpoint}' must use http or https"
                )));
            }
        }

        Ok(())
    }
}

/// Container names are 3-63 characters of lowercase letters, digits and
/// single hyphens, starting and ending with a letter or digit.
fn validate_container_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(Error::invalid_config(format!(
            "invalid container name '{name}': {reason}"
        )))
    };

    if !(3..=63).contains(&name.len()) {
        return invalid("must be between 3 and 63 characters long");
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return invalid("only lowercase letters, digits and hyphens are allowed");
    }

    if name.starts_with('-') || name.ends_with('-') {
        return invalid("must start and end with a letter or digit");
    }

    if name.contains("--") {
        return invalid("consecutive hyphens are not allowed");
    }

    Ok(())
}

impl fmt::Debug for ContainerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("account_name", &self.account_name)
            .field("container_name", &self.container_name)
            .field("endpoint", &self.endpoint)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "c3RvdyBzaGFyZWQga2V5IHRlc3QgdmVjdG9yIDAwMDE=";

    #[test]
    fn connection_string_uses_fixed_template() {
        let config = ContainerConfig::new("myaccount", KEY, "photos");
        assert_eq!(
            config.connection_string(),
            format!("DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey={KEY}")
        );
    }

    #[test]
    fn connection_string_round_trip() {
        let config = ContainerConfig::new("myaccount", KEY, "photos")
            .with_endpoint("http://127.0.0.1:10000/myaccount");
        let parsed =
            ContainerConfig::from_connection_string(&config.connection_string(), "photos")
                .unwrap();

        assert_eq!(parsed.account_name, "myaccount");
        assert_eq!(parsed.account_key, KEY);
        assert_eq!(parsed.endpoint.as_deref(), Some("http://127.0.0.1:10000/myaccount"));
    }

    #[test]
    fn connection_string_folds_custom_suffix() {
        let parsed = ContainerConfig::from_connection_string(
            &format!("AccountName=acct;AccountKey={KEY};EndpointSuffix=core.chinacloudapi.cn"),
            "photos",
        )
        .unwrap();
        assert_eq!(parsed.endpoint_url(), "https://acct.blob.core.chinacloudapi.cn");
    }

    #[test]
    fn connection_string_requires_key() {
        let err = ContainerConfig::from_connection_string("AccountName=acct", "photos")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn default_endpoint() {
        let config = ContainerConfig::new("myaccount", KEY, "photos");
        assert_eq!(config.endpoint_url(), "https://myaccount.blob.core.windows.net");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn validate_accepts_good_config() {
        ContainerConfig::new("myaccount", KEY, "photos-2024")
            .validate()
            .unwrap();
    }

    #[test]
    fn validate_rejects_malformed_key() {
        let err = ContainerConfig::new("myaccount", "not base64!", "photos")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn validate_rejects_bad_container_names() {
        for name in ["ab", "Photos", "-photos", "photos-", "pho--tos", "pho_tos"] {
            let result = ContainerConfig::new("myaccount", KEY, name).validate();
            assert!(result.is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let result = ContainerConfig::new("myaccount", KEY, "photos")
            .with_endpoint("ftp://example.com")
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn debug_hides_account_key() {
        let config = ContainerConfig::new("myaccount", KEY, "photos");
        assert!(!format!("{config:?}").contains(KEY));
    }
}
