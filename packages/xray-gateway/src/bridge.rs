//! Provisioning bridge to Xray's gRPC `HandlerService`.
//!
//! Each operation opens its own connection, issues exactly one
//! `AlterInbound` call and releases the connection when the [`Session`] is
//! dropped, on success and on every error path. Nothing is pooled or
//! retried, and no timeout is applied to the backend call.
//!
//! Per-request lifecycle: `Idle -> Connecting -> Connected -> Invoking ->
//! Done | Failed`.

use crate::error::{Error, InvalidRequest};
use crate::proto::handler_service_client::HandlerServiceClient;
use crate::proto::{
    AddUserOperation, AlterInboundRequest, RemoveUserOperation, TypedMessage, User, VlessAccount,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

/// A user to add to an inbound. Wire names follow the HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserProvisioningRequest {
    #[serde(rename = "in_tag")]
    pub inbound_tag: String,
    pub level: u32,
    pub email: String,
    #[serde(rename = "uuid")]
    pub id: String,
    pub flow: String,
}

impl UserProvisioningRequest {
    /// Parse a request body and check required fields.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidRequest(InvalidRequest::Json(e.to_string())))?;
        request.validate()?;
        Ok(request)
    }

    /// `in_tag`, `email` and `uuid` must be non-empty.
    pub fn validate(&self) -> Result<(), Error> {
        require("in_tag", &self.inbound_tag)?;
        require("email", &self.email)?;
        require("uuid", &self.id)
    }
}

/// A user to remove from an inbound, keyed by email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserRemovalRequest {
    #[serde(rename = "in_tag")]
    pub inbound_tag: String,
    pub email: String,
}

impl UserRemovalRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidRequest(InvalidRequest::Json(e.to_string())))?;
        require("in_tag", &request.inbound_tag)?;
        require("email", &request.email)?;
        Ok(request)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        Err(Error::InvalidRequest(InvalidRequest::MissingField(field)))
    } else {
        Ok(())
    }
}

/// `AlterInbound` request adding a VLESS user.
pub fn add_user_request(request: &UserProvisioningRequest) -> AlterInboundRequest {
    let account = VlessAccount {
        id: request.id.clone(),
        flow: request.flow.clone(),
        encryption: String::new(),
    };
    let operation = AddUserOperation {
        user: Some(User {
            level: request.level,
            email: request.email.clone(),
            account: Some(TypedMessage::pack(&account)),
        }),
    };
    AlterInboundRequest {
        tag: request.inbound_tag.clone(),
        operation: Some(TypedMessage::pack(&operation)),
    }
}

/// `AlterInbound` request removing a user by email.
pub fn remove_user_request(inbound_tag: &str, email: &str) -> AlterInboundRequest {
    AlterInboundRequest {
        tag: inbound_tag.to_string(),
        operation: Some(TypedMessage::pack(&RemoveUserOperation {
            email: email.to_string(),
        })),
    }
}

/// Opens connections to the backend management service.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Address connections are opened to, for logging.
    fn endpoint(&self) -> &str;

    async fn connect(&self) -> Result<Box<dyn Backend>, Error>;
}

/// One open connection. Released when dropped.
#[async_trait]
pub trait Backend: Send {
    async fn alter_inbound(&mut self, request: AlterInboundRequest) -> Result<(), tonic::Status>;
}

/// Plaintext HTTP/2 gRPC connector.
pub struct GrpcConnector {
    uri: String,
    endpoint: Endpoint,
}

impl GrpcConnector {
    pub fn new(uri: &str) -> Result<Self, Error> {
        let endpoint = Endpoint::from_shared(uri.to_string())
            .map_err(|e| Error::Config(format!("Invalid backend address {uri:?}: {e}")))?;
        Ok(Self {
            uri: uri.to_string(),
            endpoint,
        })
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    fn endpoint(&self) -> &str {
        &self.uri
    }

    async fn connect(&self) -> Result<Box<dyn Backend>, Error> {
        let channel = self
            .endpoint
            .connect()
            .await
            .map_err(|e| Error::ConnectFailed(error_chain(&e)))?;
        Ok(Box::new(GrpcBackend {
            client: HandlerServiceClient::new(channel),
        }))
    }
}

struct GrpcBackend {
    client: HandlerServiceClient<Channel>,
}

#[async_trait]
impl Backend for GrpcBackend {
    async fn alter_inbound(&mut self, request: AlterInboundRequest) -> Result<(), tonic::Status> {
        self.client.alter_inbound(request).await.map(|_| ())
    }
}

/// Backend connection owned by a single operation.
pub struct Session {
    backend: Box<dyn Backend>,
    endpoint: String,
}

impl Session {
    /// Add a VLESS user to `request.inbound_tag`.
    pub async fn add_user(&mut self, request: &UserProvisioningRequest) -> Result<(), Error> {
        info!(
            in_tag = %request.inbound_tag,
            email = %request.email,
            level = request.level,
            flow = %request.flow,
            "Adding user"
        );
        self.invoke(add_user_request(request)).await
    }

    /// Remove the user with `email` from `inbound_tag`.
    pub async fn remove_user(&mut self, inbound_tag: &str, email: &str) -> Result<(), Error> {
        info!(in_tag = %inbound_tag, email = %email, "Removing user");
        self.invoke(remove_user_request(inbound_tag, email)).await
    }

    async fn invoke(&mut self, request: AlterInboundRequest) -> Result<(), Error> {
        debug!(endpoint = %self.endpoint, tag = %request.tag, "Invoking AlterInbound");
        self.backend.alter_inbound(request).await.map_err(|status| {
            warn!(code = ?status.code(), message = %status.message(), "AlterInbound failed");
            Error::ProvisioningFailed(format!("{:?}: {}", status.code(), status.message()))
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(endpoint = %self.endpoint, "Backend connection released");
    }
}

/// Entry point for provisioning operations.
#[derive(Clone)]
pub struct ProvisioningBridge {
    connector: Arc<dyn Connector>,
}

impl ProvisioningBridge {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Open a connection. The returned session releases it on drop.
    pub async fn connect(&self) -> Result<Session, Error> {
        let endpoint = self.connector.endpoint().to_string();
        debug!(endpoint = %endpoint, "Connecting to backend");
        let backend = self.connector.connect().await.inspect_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Backend connect failed");
        })?;
        debug!(endpoint = %endpoint, "Backend connected");
        Ok(Session { backend, endpoint })
    }

    /// Connect, add the user, release.
    pub async fn add_user(&self, request: &UserProvisioningRequest) -> Result<(), Error> {
        let mut session = self.connect().await?;
        session.add_user(request).await
    }

    /// Connect, remove the user, release.
    pub async fn remove_user(&self, inbound_tag: &str, email: &str) -> Result<(), Error> {
        let mut session = self.connect().await?;
        session.remove_user(inbound_tag, email).await
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
