use std::net::{IpAddr, SocketAddr};

use sigcore_sip_core::{Message, DEFAULT_SIP_PORT};

use super::TransactionLayer;
use crate::error::{Error, Result};

impl TransactionLayer {
    /// Where an outbound request goes: the first Route if it is a loose
    /// router, the request-URI otherwise.
    ///
    /// No DNS resolution is done; the host must be an IP address.
    pub(crate) fn next_hop(&self, request: &Message) -> Result<SocketAddr> {
        let first_route = request
            .route_set()?
            .into_iter()
            .next()
            .filter(|route| route.uri.is_loose_router());
        let uri = match first_route {
            Some(route) => route.uri,
            None => request
                .request_uri()
                .cloned()
                .ok_or_else(|| Error::NoRoute("not a request".to_string()))?,
        };

        let ip: IpAddr = uri
            .host_str()
            .parse()
            .map_err(|_| Error::NoRoute(format!("{} is not an IP address", uri.host_str())))?;
        Ok(SocketAddr::new(ip, uri.port_or_default()))
    }

    /// Where replies to `request` go (RFC 3261 Section 18.2.2, RFC 3581).
    ///
    /// The source IP is used in place of the sent-by host. The port is the
    /// filled-in `rport`, the source port when `rport` was asked for or is
    /// forced by configuration, and the sent-by port otherwise.
    pub(crate) fn reply_destination(&self, request: &Message) -> Result<SocketAddr> {
        let source = request
            .source
            .ok_or_else(|| Error::NoRoute("request has no source address".to_string()))?;
        let via = &request.via1;
        let port = match via.rport_port() {
            Some(port) => port,
            None if via.rport.is_some() || self.config.force_rport => source.port(),
            None => via.port_or_default(),
        };
        Ok(SocketAddr::new(source.ip(), port))
    }

    /// sent-by written into the Via of generated requests
    pub(crate) fn local_sent_by(&self) -> String {
        let host = match &self.config.local_via_host {
            Some(host) => host.clone(),
            None => match self.local_addr.ip() {
                IpAddr::V6(ip) => format!("[{ip}]"),
                IpAddr::V4(ip) => ip.to_string(),
            },
        };
        let port = self.config.local_via_port.unwrap_or(self.local_addr.port());
        if port == DEFAULT_SIP_PORT {
            host
        } else {
            format!("{host}:{port}")
        }
    }
}
