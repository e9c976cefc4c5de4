//! Observable query client with builder pattern.
//!
//! The client holds everything a connection needs (host, reconnect policy,
//! timeouts, event handlers, transport) and hands out query descriptors
//! bound to it.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    error::{ObservableLinkError, Result},
    event_handlers::EventHandlers,
    models::{ConnectionOptions, HostContext},
    query::RoutedQuery,
    timeouts::LinkTimeouts,
    transport::{Transport, WebSocketTransport},
};

/// Shared connection settings captured by every query created from a client.
#[derive(Clone)]
pub struct LinkContext {
    pub host: HostContext,
    pub options: ConnectionOptions,
    pub timeouts: LinkTimeouts,
    pub handlers: EventHandlers,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for LinkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkContext")
            .field("host", &self.host)
            .field("options", &self.options)
            .field("timeouts", &self.timeouts)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

/// Entry point for observable queries.
///
/// Use [`ObservableLinkClientBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust,no_run
/// use observable_link::{ObservableLinkClient, ObservableQueryController, QueryArguments};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ObservableLinkClient::builder()
///     .base_url("http://localhost:5000")
///     .build()?;
///
/// let query = client
///     .query::<Vec<String>>("/api/accounts/{{accountId}}/items", Vec::new())?
///     .with_arguments(["accountId"]);
///
/// let args = QueryArguments::new().with("accountId", 42);
/// let (controller, mut rx) = ObservableQueryController::observe(query, &args)?;
/// while rx.changed().await.is_ok() {
///     println!("{:?}", rx.borrow().query_result.data);
/// }
/// # drop(controller);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ObservableLinkClient {
    context: Arc<LinkContext>,
}

impl ObservableLinkClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> ObservableLinkClientBuilder {
        ObservableLinkClientBuilder::new()
    }

    /// Create a query descriptor for `route` seeded with `default_value`.
    ///
    /// Fails when the route template cannot be parsed.
    pub fn query<T>(&self, route: &str, default_value: T) -> Result<RoutedQuery<T>>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        RoutedQuery::new(self.context.clone(), route, default_value)
    }

    pub fn host(&self) -> &HostContext {
        &self.context.host
    }

    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.context.options
    }

    /// Get the configured timeouts
    pub fn timeouts(&self) -> &LinkTimeouts {
        &self.context.timeouts
    }

    pub fn context(&self) -> Arc<LinkContext> {
        self.context.clone()
    }
}

/// Builder for configuring [`ObservableLinkClient`] instances.
pub struct ObservableLinkClientBuilder {
    base_url: Option<String>,
    host: Option<HostContext>,
    timeouts: LinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
    transport: Option<Arc<dyn Transport>>,
}

impl ObservableLinkClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            host: None,
            timeouts: LinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::default(),
            transport: None,
        }
    }

    /// Set the server base URL (`http`, `https`, `ws` or `wss`)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the host directly instead of parsing a base URL
    pub fn host(mut self, host: HostContext) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the connect and keepalive timeouts
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use observable_link::{ObservableLinkClient, LinkTimeouts};
    ///
    /// # fn example() -> observable_link::Result<()> {
    /// let client = ObservableLinkClient::builder()
    ///     .base_url("http://localhost:5000")
    ///     .timeouts(LinkTimeouts::fast())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn timeouts(mut self, timeouts: LinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set the reconnect policy
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Replace the socket transport. Defaults to [`WebSocketTransport`].
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ObservableLinkClient> {
        let host = match (self.host, self.base_url) {
            (Some(host), _) => host,
            (None, Some(url)) => HostContext::from_base_url(&url)?,
            (None, None) => {
                return Err(ObservableLinkError::ConfigurationError(
                    "base_url is required".into(),
                ))
            },
        };

        log::debug!(
            "[observable-link] Client configured for {}://{}",
            host.scheme(),
            host.host
        );

        Ok(ObservableLinkClient {
            context: Arc::new(LinkContext {
                host,
                options: self.connection_options,
                timeouts: self.timeouts,
                handlers: self.event_handlers,
                transport: self
                    .transport
                    .unwrap_or_else(|| Arc::new(WebSocketTransport::new())),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let client = ObservableLinkClient::builder()
            .base_url("https://api.example.com:8443")
            .timeouts(LinkTimeouts::fast())
            .connection_options(ConnectionOptions::new().with_max_reconnect_attempts(Some(3)))
            .build()
            .expect("client");

        assert_eq!(client.host().host, "api.example.com:8443");
        assert!(client.host().secure);
        assert_eq!(client.connection_options().max_reconnect_attempts, Some(3));
        assert_eq!(client.timeouts(), &LinkTimeouts::fast());
    }

    #[test]
    fn test_builder_missing_url() {
        let result = ObservableLinkClient::builder().build();
        assert!(matches!(result, Err(ObservableLinkError::ConfigurationError(_))));
    }

    #[test]
    fn test_builder_explicit_host() {
        let client = ObservableLinkClient::builder()
            .host(HostContext::new("127.0.0.1:9000", false))
            .build()
            .expect("client");
        assert_eq!(client.host().ws_url("/q"), "ws://127.0.0.1:9000/q");
    }

    #[test]
    fn test_query_rejects_bad_route() {
        let client = ObservableLinkClient::builder()
            .base_url("http://localhost:5000")
            .build()
            .expect("client");
        assert!(client.query::<String>("no-slash", String::new()).is_err());
        assert!(client.query::<String>("/api/{{id}}", String::new()).is_ok());
    }
}
