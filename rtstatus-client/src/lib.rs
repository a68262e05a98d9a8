use rtstatus_common::{ErrorResponse, Report, Result, RtStatusError, STATUS_PATH};

/// RtStatus client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bare `host:port` of the server.
    pub addr: String,
}

/// RtStatus Client
pub struct Client {
    pub config: ClientConfig,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the URL for `path` (which must start with `/`) on the server.
    pub fn build_url(&self, path: &str) -> String {
        format!("http://{}{}", self.config.addr, path)
    }

    /// Fetch and parse the full status report.
    pub async fn report(&self) -> Result<Report> {
        let body = self.fetch_status(None).await?;
        Report::parse(&body)
    }

    /// Fetch a single report value by name. Names are matched ignoring case.
    /// Returns `UnknownAttribute` if the server does not know the name.
    pub async fn attribute(&self, name: &str) -> Result<String> {
        let body = self.fetch_status(Some(name)).await?;
        Ok(body.trim_end().to_string())
    }

    /// Like [`Client::attribute`], for numeric values.
    pub async fn attribute_u64(&self, name: &str) -> Result<u64> {
        let value = self.attribute(name).await?;
        value
            .parse()
            .map_err(|_| RtStatusError::MalformedReport(format!("{name} is not a number: {value:?}")))
    }

    /// Issue a plain GET for `path` and return the status code, whatever it is.
    /// The body is read and discarded.
    pub async fn get(&self, path: &str) -> Result<u16> {
        let response = self
            .http_client
            .get(self.build_url(path))
            .send()
            .await
            .map_err(|e| RtStatusError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        response
            .bytes()
            .await
            .map_err(|e| RtStatusError::NetworkError(e.to_string()))?;
        Ok(status)
    }

    async fn fetch_status(&self, attribute: Option<&str>) -> Result<String> {
        let url = match attribute {
            Some(name) => format!("{}?{}", self.build_url(STATUS_PATH), name),
            None => self.build_url(STATUS_PATH),
        };

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| RtStatusError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(status, attribute, response).await);
        }

        response
            .text()
            .await
            .map_err(|e| RtStatusError::NetworkError(e.to_string()))
    }
}

async fn parse_error_response(
    status: reqwest::StatusCode,
    attribute: Option<&str>,
    response: reqwest::Response,
) -> RtStatusError {
    if let (reqwest::StatusCode::NOT_FOUND, Some(name)) = (status, attribute) {
        return RtStatusError::UnknownAttribute(name.to_string());
    }

    let error_msg = response
        .json::<ErrorResponse>()
        .await
        .map(|r| r.error)
        .unwrap_or_else(|_| format!("Server returned status: {}", status));

    RtStatusError::HttpError(status.as_u16(), error_msg)
}
