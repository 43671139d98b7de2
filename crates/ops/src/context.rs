//! Operation context shared by one invocation

use remake_errors::Error;
use remake_events::EventSender;
use remake_net::NetClient;
use remake_types::ServerEndpoint;

/// Everything one build invocation needs, resolved up front
///
/// Components never read ambient state: the endpoint and credentials are
/// resolved once by the caller and passed in here.
#[derive(Clone)]
pub struct OpsCtx {
    /// Build server address for this invocation
    pub endpoint: ServerEndpoint,
    /// HTTP client
    pub net: NetClient,
    /// Event channel for all user-visible output
    pub tx: EventSender,
}

/// Builder for `OpsCtx`
#[derive(Default)]
pub struct OpsCtxBuilder {
    endpoint: Option<ServerEndpoint>,
    net: Option<NetClient>,
    tx: Option<EventSender>,
}

impl OpsCtxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: ServerEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_net(mut self, net: NetClient) -> Self {
        self.net = Some(net);
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Build the context
    ///
    /// # Errors
    ///
    /// Returns an error if a required component is missing.
    pub fn build(self) -> Result<OpsCtx, Error> {
        Ok(OpsCtx {
            endpoint: self
                .endpoint
                .ok_or_else(|| Error::internal("OpsCtx missing endpoint"))?,
            net: self.net.ok_or_else(|| Error::internal("OpsCtx missing net client"))?,
            tx: self
                .tx
                .ok_or_else(|| Error::internal("OpsCtx missing event sender"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remake_events::channel;

    #[test]
    fn test_builder_requires_all_components() {
        let (tx, _rx) = channel();
        let net = NetClient::with_defaults().unwrap();

        let full = OpsCtxBuilder::new()
            .with_endpoint(ServerEndpoint::new("localhost", 80))
            .with_net(net.clone())
            .with_event_sender(tx.clone())
            .build();
        assert!(full.is_ok());

        let partial = OpsCtxBuilder::new().with_net(net).build();
        assert!(partial.is_err());
    }
}
