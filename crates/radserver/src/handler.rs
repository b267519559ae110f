//! Request handler boundary
//!
//! The server decodes each datagram and passes the packet to a [`Handler`]
//! together with a [`ResponseWriter`] bound to the socket and the requester.

use crate::server::ServerError;
use async_trait::async_trait;
use radserver_proto::{Attribute, Code, Packet};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::debug;

/// Request handler
///
/// Implement this trait to provide the server's business logic. A handler
/// normally sends exactly one reply through the writer; sending none is legal
/// (the client will retransmit or give up), and when several are sent the
/// client acts on the first one it matches.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn serve_radius(&self, writer: ResponseWriter, packet: Packet);
}

/// Adapter turning an async closure into a [`Handler`], see [`handler_fn`]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Use an async closure as a request handler
///
/// ```rust
/// use radserver::{handler_fn, ResponseWriter};
/// use radserver_proto::Packet;
///
/// let handler = handler_fn(|writer: ResponseWriter, _packet: Packet| async move {
///     let _ = writer.access_reject(Vec::new()).await;
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(ResponseWriter, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(ResponseWriter, Packet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn serve_radius(&self, writer: ResponseWriter, packet: Packet) {
        (self.f)(writer, packet).await
    }
}

/// Sends replies for one request
///
/// Replies built through the writer carry the request's identifier,
/// authenticator, shared secret and dictionary, so the Response
/// Authenticator is computed against the right request. The writer does not
/// check that the reply code fits the request code.
#[derive(Clone)]
pub struct ResponseWriter {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
    /// Attribute-less copy of the request
    request: Packet,
}

impl fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .field("request_code", &self.request.code)
            .field("request_id", &self.request.identifier)
            .finish()
    }
}

impl ResponseWriter {
    pub(crate) fn new(
        socket: Arc<UdpSocket>,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
        request: &Packet,
    ) -> Self {
        ResponseWriter {
            socket,
            local_addr,
            remote_addr,
            request: request.response(request.code),
        }
    }

    /// Address of the server socket that received the request
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address of the client that sent the request
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Create an empty reply to the request
    pub fn response(&self, code: Code) -> Packet {
        self.request.response(code)
    }

    /// Encode `packet` and send it to the requester
    pub async fn write(&self, packet: &Packet) -> Result<(), ServerError> {
        let data = packet.encode()?;
        self.socket.send_to(&data, self.remote_addr).await?;

        debug!(
            response_type = %packet.code,
            client_addr = %self.remote_addr,
            request_id = packet.identifier,
            "Sent RADIUS response"
        );
        Ok(())
    }

    async fn reply(&self, code: Code, attributes: Vec<Attribute>) -> Result<(), ServerError> {
        let mut response = self.response(code);
        response.attributes = attributes;
        self.write(&response).await
    }

    pub async fn access_accept(&self, attributes: Vec<Attribute>) -> Result<(), ServerError> {
        self.reply(Code::AccessAccept, attributes).await
    }

    pub async fn access_reject(&self, attributes: Vec<Attribute>) -> Result<(), ServerError> {
        self.reply(Code::AccessReject, attributes).await
    }

    pub async fn access_challenge(&self, attributes: Vec<Attribute>) -> Result<(), ServerError> {
        self.reply(Code::AccessChallenge, attributes).await
    }

    pub async fn accounting_response(
        &self,
        attributes: Vec<Attribute>,
    ) -> Result<(), ServerError> {
        self.reply(Code::AccountingResponse, attributes).await
    }
}
