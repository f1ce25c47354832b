use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use shared::{
    domain::RequestId,
    error::GatewayError,
    protocol::{FileCandidate, RequestSummary},
};
use tracing::{debug, info};

pub mod listing;
pub mod response;

pub use listing::ListingController;
pub use response::ResponseWorkflow;

/// Employee-facing request service the core consumes but does not implement.
#[async_trait]
pub trait RequestGateway: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<RequestSummary>, GatewayError>;
    async fn fetch_one(&self, tracking_number: &str) -> Result<RequestSummary, GatewayError>;
    async fn submit_correction(
        &self,
        request_id: RequestId,
        comment: &str,
    ) -> Result<(), GatewayError>;
    async fn submit_certification(
        &self,
        tracking_number: &str,
        files: &[FileCandidate],
    ) -> Result<(), GatewayError>;
}

pub struct MissingRequestGateway;

#[async_trait]
impl RequestGateway for MissingRequestGateway {
    async fn fetch_all(&self) -> Result<Vec<RequestSummary>, GatewayError> {
        Err(GatewayError::transport("request gateway is unavailable"))
    }

    async fn fetch_one(&self, tracking_number: &str) -> Result<RequestSummary, GatewayError> {
        Err(GatewayError::transport(format!(
            "request gateway is unavailable for {tracking_number}"
        )))
    }

    async fn submit_correction(
        &self,
        request_id: RequestId,
        _comment: &str,
    ) -> Result<(), GatewayError> {
        Err(GatewayError::transport(format!(
            "request gateway is unavailable for request {}",
            request_id.0
        )))
    }

    async fn submit_certification(
        &self,
        tracking_number: &str,
        _files: &[FileCandidate],
    ) -> Result<(), GatewayError> {
        Err(GatewayError::transport(format!(
            "request gateway is unavailable for {tracking_number}"
        )))
    }
}

/// Screen transitions the core requests from its host. The host owns the
/// actual routing; the core only says where to go.
pub trait ScreenNavigator: Send + Sync {
    fn open_response_screen(&self, tracking_number: &str);
    fn return_to_previous(&self);
}

pub struct MissingScreenNavigator;

impl ScreenNavigator for MissingScreenNavigator {
    fn open_response_screen(&self, tracking_number: &str) {
        debug!(tracking_number, "navigator unavailable; open request dropped");
    }

    fn return_to_previous(&self) {
        debug!("navigator unavailable; return request dropped");
    }
}

/// Side-effecting readability probe over a picked file. The probe keeps no
/// bytes; it only answers whether the file can be read to completion.
pub trait FileProbe: Send + Sync {
    fn can_read(&self, file: &FileCandidate) -> bool;
}

pub struct MissingFileProbe;

impl FileProbe for MissingFileProbe {
    fn can_read(&self, _file: &FileCandidate) -> bool {
        false
    }
}

/// `RequestGateway` over the upstream employee HTTP API. The base URL is
/// injected at construction; nothing here reads process-wide configuration.
pub struct HttpRequestGateway {
    http: Client,
    server_url: String,
}

impl HttpRequestGateway {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
        }
    }

    fn requests_url(&self) -> String {
        format!("{}/api/Solicitudes", self.server_url)
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::transport(err.to_string())
}

#[async_trait]
impl RequestGateway for HttpRequestGateway {
    async fn fetch_all(&self) -> Result<Vec<RequestSummary>, GatewayError> {
        let requests: Vec<RequestSummary> = self
            .http
            .get(self.requests_url())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;
        debug!(count = requests.len(), "gateway: fetched request collection");
        Ok(requests)
    }

    async fn fetch_one(&self, tracking_number: &str) -> Result<RequestSummary, GatewayError> {
        let response = self
            .http
            .get(format!("{}/{tracking_number}", self.requests_url()))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::not_found(tracking_number));
        }

        let request = response
            .error_for_status()
            .map_err(transport)?
            .json()
            .await
            .map_err(transport)?;
        Ok(request)
    }

    async fn submit_correction(
        &self,
        request_id: RequestId,
        comment: &str,
    ) -> Result<(), GatewayError> {
        self.http
            .post(format!("{}/{}/devolver", self.requests_url(), request_id.0))
            .json(&comment)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        info!(
            request_id = request_id.0,
            "gateway: request returned for corrections"
        );
        Ok(())
    }

    async fn submit_certification(
        &self,
        tracking_number: &str,
        files: &[FileCandidate],
    ) -> Result<(), GatewayError> {
        let mut form = multipart::Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path).await.map_err(|err| {
                GatewayError::transport(format!(
                    "failed to read {}: {err}",
                    file.path.display()
                ))
            })?;
            form = form.part(
                "archivos",
                multipart::Part::bytes(bytes).file_name(file.name.clone()),
            );
        }

        self.http
            .post(format!(
                "{}/{tracking_number}/responder",
                self.requests_url()
            ))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        info!(
            tracking_number,
            files = files.len(),
            "gateway: certification submitted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
