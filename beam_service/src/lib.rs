//! Request/response service dispatch atop `beam_protocol`: correlated
//! RPC and one-way messages over a `MessageTransport`
//! (`ServiceProtocolClient`), a per-endpoint handler table
//! (`ServiceSlots`), and a servlet container that turns accepted
//! channels into endpoints (`ServiceProtocolServletContainer`).

pub mod client;
pub mod error;
pub mod handler;
pub mod servlet;
pub mod session;
pub mod slots;

pub use client::ServiceProtocolClient;
pub use error::ServiceRequestException;
pub use handler::{BackoffFactory, ClientBuilder, ReconnectHandler, ServiceProtocolClientHandler, SlotsFactory};
pub use servlet::{ChannelAcceptor, QueueAcceptor, Servlet, ServiceProtocolServletContainer};
pub use session::Session;
pub use slots::{ClientHandle, RecordMessageType, RequestToken, Service, ServiceSlots};
