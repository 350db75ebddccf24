//! HTTP client for the counter server REST API
//!
//! Thin reqwest wrapper: bearer auth, the `{code, message, data}` envelope
//! decoded on success, non-success statuses mapped onto [`ClientError`]
//! variants. The request timeout comes from [`ClientConfig::timeout`], so
//! a submission against a dead network fails fast instead of hanging.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use shared::models::{Notification, Order, OrderPatch, OrderStatus, Source};

use crate::submitter::SubmitTransport;
use crate::{ClientConfig, ClientError, ClientResult};

/// Mirror of the server's JSON envelope
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

/// One page of the order listing
#[derive(Debug, Deserialize)]
pub struct OrdersPage {
    pub orders: Vec<Order>,
    pub pagination: PageInfo,
}

/// Pagination block of a listing response
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total: usize,
    pub has_more: bool,
}

/// Filters for [`HttpClient::list_orders`]; unset fields are omitted from
/// the query string
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barista_id: Option<String>,
    /// Creation-time window start, epoch millis inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<i64>,
    /// Creation-time window end, epoch millis inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

/// HTTP client for making network requests to the counter server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Build authorization header value
    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request with query parameters
    async fn get_with_query<T: DeserializeOwned, Q: serde::Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path)).query(query);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a PATCH request with JSON body
    async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.patch(self.url(path)).json(body);

        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                StatusCode::CONFLICT => Err(ClientError::Conflict(text)),
                StatusCode::PRECONDITION_FAILED => Err(ClientError::PreconditionFailed(text)),
                _ => Err(ClientError::Api {
                    status: status.as_u16(),
                    message: text,
                }),
            };
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Orders API ==========

    /// Submit an order; the returned order is the server's stored copy.
    ///
    /// A resubmission with the same id and payload succeeds too: the
    /// server answers with the original record instead of a duplicate.
    pub async fn submit_order(&self, order: &Order) -> ClientResult<Order> {
        self.post::<ApiEnvelope<Order>, _>("api/orders", order)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing order data".to_string()))
    }

    /// Fetch one order by id
    pub async fn get_order(&self, id: &str) -> ClientResult<Order> {
        self.get::<ApiEnvelope<Order>>(&format!("api/orders/{id}"))
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing order data".to_string()))
    }

    /// Merge-patch an order (status, barista, feedback, ...)
    pub async fn update_order(&self, id: &str, patch: &OrderPatch) -> ClientResult<Order> {
        self.patch::<ApiEnvelope<Order>, _>(&format!("api/orders/{id}"), patch)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing order data".to_string()))
    }

    /// List orders, newest first
    pub async fn list_orders(&self, query: &ListOrdersQuery) -> ClientResult<OrdersPage> {
        self.get_with_query::<ApiEnvelope<OrdersPage>, _>("api/orders", query)
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing order listing".to_string()))
    }

    /// Fetch the bounded recent-notification buffer, for late joiners
    pub async fn recent_notifications(&self) -> ClientResult<Vec<Notification>> {
        self.get::<ApiEnvelope<Vec<Notification>>>("api/notifications/recent")
            .await?
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Missing notifications".to_string()))
    }
}

#[async_trait]
impl SubmitTransport for HttpClient {
    async fn submit(&self, order: &Order) -> ClientResult<Order> {
        self.submit_order(order).await
    }
}
