//! Xray management API messages and the `HandlerService` client.
//!
//! Subset of Xray's protobuf definitions needed to alter inbound users:
//! `common/serial/typed_message.proto`, `common/protocol/user.proto`,
//! `proxy/vless/account.proto` and `app/proxyman/command/command.proto`.

/// `xray.common.serial.TypedMessage`: a type name plus the encoded message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypedMessage {
    #[prost(string, tag = "1")]
    pub r#type: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}
impl ::prost::Name for TypedMessage {
    const NAME: &'static str = "TypedMessage";
    const PACKAGE: &'static str = "xray.common.serial";
}

/// `xray.common.protocol.User`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct User {
    #[prost(uint32, tag = "1")]
    pub level: u32,
    #[prost(string, tag = "2")]
    pub email: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub account: ::core::option::Option<TypedMessage>,
}
impl ::prost::Name for User {
    const NAME: &'static str = "User";
    const PACKAGE: &'static str = "xray.common.protocol";
}

/// `xray.proxy.vless.Account`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VlessAccount {
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub flow: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub encryption: ::prost::alloc::string::String,
}
impl ::prost::Name for VlessAccount {
    const NAME: &'static str = "Account";
    const PACKAGE: &'static str = "xray.proxy.vless";
}

/// `xray.app.proxyman.command.AddUserOperation`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AddUserOperation {
    #[prost(message, optional, tag = "1")]
    pub user: ::core::option::Option<User>,
}
impl ::prost::Name for AddUserOperation {
    const NAME: &'static str = "AddUserOperation";
    const PACKAGE: &'static str = "xray.app.proxyman.command";
}

/// `xray.app.proxyman.command.RemoveUserOperation`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoveUserOperation {
    #[prost(string, tag = "1")]
    pub email: ::prost::alloc::string::String,
}
impl ::prost::Name for RemoveUserOperation {
    const NAME: &'static str = "RemoveUserOperation";
    const PACKAGE: &'static str = "xray.app.proxyman.command";
}

/// `xray.app.proxyman.command.AlterInboundRequest`
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlterInboundRequest {
    #[prost(string, tag = "1")]
    pub tag: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub operation: ::core::option::Option<TypedMessage>,
}

/// `xray.app.proxyman.command.AlterInboundResponse`
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AlterInboundResponse {}

impl TypedMessage {
    /// Wrap `message` the way Xray's `serial.ToTypedMessage` does.
    pub fn pack<M: ::prost::Message + ::prost::Name>(message: &M) -> Self {
        Self {
            r#type: M::full_name(),
            value: message.encode_to_vec(),
        }
    }

    /// Decode the payload if it carries an `M`.
    pub fn unpack<M: ::prost::Message + ::prost::Name + Default>(&self) -> Option<M> {
        if self.r#type != M::full_name() {
            return None;
        }
        M::decode(self.value.as_slice()).ok()
    }
}

/// Generated client implementations.
pub mod handler_service_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    use tonic::codegen::http::Uri;
    #[derive(Debug, Clone)]
    pub struct HandlerServiceClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl HandlerServiceClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> HandlerServiceClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_origin(inner: T, origin: Uri) -> Self {
            let inner = tonic::client::Grpc::with_origin(inner, origin);
            Self { inner }
        }
        pub async fn alter_inbound(
            &mut self,
            request: impl tonic::IntoRequest<super::AlterInboundRequest>,
        ) -> std::result::Result<
            tonic::Response<super::AlterInboundResponse>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/xray.app.proxyman.command.HandlerService/AlterInbound",
            );
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(
                    GrpcMethod::new("xray.app.proxyman.command.HandlerService", "AlterInbound"),
                );
            self.inner.unary(req, path, codec).await
        }
    }
}
