//! Container management over the Blob service REST endpoints, authorized
//! with the storage account's Shared Key.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderValue};
use reqwest::{Client, Method, Request, Response, StatusCode};
use sha2::Sha256;
use url::Url;

use super::{ContainerAdmin, PublicAccess};
use crate::{ContainerConfig, Error, Result, TRACING_TARGET_ADMIN};

type HmacSha256 = Hmac<Sha256>;

/// REST API version sent with every management call.
const API_VERSION: &str = "2023-11-03";

const HEADER_DATE: &str = "x-ms-date";
const HEADER_VERSION: &str = "x-ms-version";
const HEADER_PUBLIC_ACCESS: &str = "x-ms-blob-public-access";
const HEADER_ERROR_CODE: &str = "x-ms-error-code";

const CONTAINER_ALREADY_EXISTS: &str = "ContainerAlreadyExists";

/// [`ContainerAdmin`] that talks to the Blob service with Shared Key auth.
#[derive(Clone)]
pub struct SharedKeyAdmin {
    http: Client,
    account: String,
    key: Vec<u8>,
    container_url: Url,
}

impl SharedKeyAdmin {
    /// Creates an admin for the container described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the account key is not valid base64, the endpoint
    /// is not a valid URL, or the HTTP client cannot be created.
    pub fn new(config: &ContainerConfig) -> Result<Self> {
        let key = config.decoded_key()?;
        let endpoint = config.endpoint_url();
        let mut container_url = Url::parse(&endpoint)
            .map_err(|e| Error::invalid_config(format!("invalid endpoint '{endpoint}': {e}")))?;
        container_url
            .path_segments_mut()
            .map_err(|()| {
                Error::invalid_config(format!("endpoint '{endpoint}' cannot be a base URL"))
            })?
            .pop_if_empty()
            .push(&config.container_name);

        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("stow/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(
            target: TRACING_TARGET_ADMIN,
            account = %config.account_name,
            container_url = %container_url,
            "Created shared key container admin"
        );

        Ok(Self {
            http,
            account: config.account_name.clone(),
            key,
            container_url,
        })
    }

    /// Build a signed container request dated `date` (RFC 9110 format).
    fn build_request(
        &self,
        method: Method,
        query: &[(&str, &str)],
        access: Option<PublicAccess>,
        date: &str,
    ) -> Result<Request> {
        let mut url = self.container_url.clone();
        url.query_pairs_mut().extend_pairs(query);

        let mut ms_headers = BTreeMap::new();
        ms_headers.insert(HEADER_DATE, date.to_owned());
        ms_headers.insert(HEADER_VERSION, API_VERSION.to_owned());
        if let Some(value) = access.and_then(PublicAccess::header_value) {
            ms_headers.insert(HEADER_PUBLIC_ACCESS, value.to_owned());
        }

        let resource = format!("/{}{}", self.account, self.container_url.path());
        let signature = sign(
            &self.key,
            &string_to_sign(method.as_str(), &ms_headers, &resource, query),
        )?;

        let mut builder = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, format!("SharedKey {}:{signature}", self.account));
        for (name, value) in &ms_headers {
            builder = builder.header(*name, value);
        }
        if method == Method::PUT {
            builder = builder.header(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        Ok(builder.build()?)
    }

    async fn send(
        &self,
        method: Method,
        query: &[(&str, &str)],
        access: Option<PublicAccess>,
    ) -> Result<Response> {
        let request = self.build_request(method, query, access, &http_date()?)?;
        tracing::debug!(
            target: TRACING_TARGET_ADMIN,
            method = %request.method(),
            url = %request.url(),
            "Sending container request"
        );
        Ok(self.http.execute(request).await?)
    }
}

/// Canonical string for the Shared Key scheme: the verb, eleven standard
/// headers (all empty for container calls), the sorted `x-ms-*` headers and
/// the canonical resource with its sorted query parameters.
fn string_to_sign(
    method: &str,
    ms_headers: &BTreeMap<&str, String>,
    resource: &str,
    query: &[(&str, &str)],
) -> String {
    let mut out = String::from(method);
    out.push_str(&"\n".repeat(12));

    for (name, value) in ms_headers {
        out.push_str(name);
        out.push(':');
        out.push_str(value.trim());
        out.push('\n');
    }

    out.push_str(resource);
    let sorted: BTreeMap<String, &str> = query
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), *v))
        .collect();
    for (name, value) in sorted {
        out.push('\n');
        out.push_str(&name);
        out.push(':');
        out.push_str(value);
    }
    out
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::Signing {
        reason: e.to_string(),
    })?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

fn http_date() -> Result<String> {
    jiff::fmt::rfc2822::DateTimePrinter::new()
        .timestamp_to_rfc9110_string(&jiff::Timestamp::now())
        .map_err(|e| Error::Signing {
            reason: e.to_string(),
        })
}

/// Turn a non-success response into [`Error::Service`].
async fn service_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let code = error_code(&response).unwrap_or_default();
    let message = response.text().await.unwrap_or_default();
    Error::Service {
        status,
        code,
        message: message.trim().to_owned(),
    }
}

fn error_code(response: &Response) -> Option<String> {
    response
        .headers()
        .get(HEADER_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[async_trait::async_trait]
impl ContainerAdmin for SharedKeyAdmin {
    fn id(&self) -> &str {
        "shared-key"
    }

    #[tracing::instrument(name = "admin.create", skip(self), fields(container = %self.container_url))]
    async fn create_if_not_exists(&self, access: PublicAccess) -> Result<bool> {
        let response = self
            .send(Method::PUT, &[("restype", "container")], Some(access))
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(true),
            StatusCode::CONFLICT
                if error_code(&response).as_deref() == Some(CONTAINER_ALREADY_EXISTS) =>
            {
                Ok(false)
            }
            _ => Err(service_error(response).await),
        }
    }

    #[tracing::instrument(name = "admin.set_access", skip(self), fields(container = %self.container_url))]
    async fn set_public_access(&self, access: PublicAccess) -> Result<()> {
        let response = self
            .send(
                Method::PUT,
                &[("restype", "container"), ("comp", "acl")],
                Some(access),
            )
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(service_error(response).await)
        }
    }

    #[tracing::instrument(name = "admin.get_access", skip(self), fields(container = %self.container_url))]
    async fn public_access(&self) -> Result<Option<PublicAccess>> {
        let response = self
            .send(Method::GET, &[("restype", "container"), ("comp", "acl")], None)
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let header = response
                    .headers()
                    .get(HEADER_PUBLIC_ACCESS)
                    .and_then(|v| v.to_str().ok());
                PublicAccess::from_header(header).map(Some)
            }
            _ => Err(service_error(response).await),
        }
    }
}

impl fmt::Debug for SharedKeyAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyAdmin")
            .field("account", &self.account)
            .field("container_url", &self.container_url.as_str())
            .finish_non_exhaustive()
    }
}
