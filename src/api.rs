//! HTTP client for the Vault API
//!
//! Only the endpoints the CLI drives are modelled here.

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::meta::GeneralOptions;
use crate::tls;

/// Header carrying the client token
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Failure to construct a [`Client`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unsupported address scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),

    #[error("failed to read CA certificate {}", .path.display())]
    ReadCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no PEM certificates found in {}", .path.display())]
    NoCertificates { path: PathBuf },

    #[error("invalid CA certificate in {}", .path.display())]
    InvalidCertificate {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
}

/// Failure of a request against the server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("{}", describe_response(.status, .errors))]
    Response {
        status: StatusCode,
        errors: Vec<String>,
    },
}

fn describe_response(status: &StatusCode, errors: &[String]) -> String {
    if errors.is_empty() {
        format!("server returned {}", status)
    } else {
        errors.join(", ")
    }
}

/// Error body returned by the server
#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Transport-configured handle to a Vault server
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    address: Url,
    token: Option<String>,
}

impl Client {
    /// Build a client from resolved connection options
    pub fn new(options: &GeneralOptions) -> Result<Self, ClientError> {
        let address =
            Url::parse(&options.address).map_err(|e| ClientError::InvalidAddress {
                address: options.address.clone(),
                reason: e.to_string(),
            })?;

        if !matches!(address.scheme(), "http" | "https") {
            return Err(ClientError::UnsupportedScheme(address.scheme().to_string()));
        }

        let mut builder = reqwest::Client::builder().use_rustls_tls();

        if let Some(source) = options.ca_source() {
            tracing::debug!(?source, "using custom CA roots");
            for cert in tls::load_root_certificates(&source)? {
                builder = builder.add_root_certificate(cert);
            }
        }

        if options.tls_skip_verify {
            tracing::debug!("TLS certificate verification disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(ClientError::Build)?;

        Ok(Self {
            http,
            address,
            token: options.token.clone(),
        })
    }

    /// System backend endpoints
    pub fn sys(&self) -> Sys<'_> {
        Sys { client: self }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.address.as_str().trim_end_matches('/'), path);
        tracing::debug!(%method, %url, "vault request");

        let request = self.http.request(method, url);
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: ErrorResponse = serde_json::from_str(&body).unwrap_or_default();

        Err(ApiError::Response {
            status,
            errors: parsed.errors,
        })
    }
}

/// `/v1/sys` endpoints
pub struct Sys<'a> {
    client: &'a Client,
}

impl Sys<'_> {
    /// Seal the server. Succeeds when the server is already sealed.
    pub async fn seal(&self) -> Result<(), ApiError> {
        let request = self.client.request(Method::PUT, "/v1/sys/seal");
        self.client.send(request).await?;
        Ok(())
    }
}
