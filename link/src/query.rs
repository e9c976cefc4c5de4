//! Observable query descriptors.
//!
//! A descriptor knows its route template, its default value and the names
//! of the arguments it sends to the server.  `subscribe` turns a callback
//! and an argument set into a live [`ObservableQuerySubscription`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::client::LinkContext;
use crate::connection::{DataReceived, ObservableQueryConnection};
use crate::error::Result;
use crate::models::QueryArguments;
use crate::route::RouteTemplate;
use crate::subscription::ObservableQuerySubscription;

/// Callback invoked with every envelope pushed for a subscription.
pub type OnNextResult<T> = DataReceived<T>;

/// An observable query the controller can subscribe to.
///
/// Implementations are immutable after construction; the controller holds
/// one instance per query and builds a fresh subscription for every
/// argument set.
#[async_trait]
pub trait ObservableQueryFor: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;

    /// Route template, e.g. `/api/accounts/{{accountId}}`.
    fn route(&self) -> &str;

    /// Value shown before any data arrives.
    fn default_value(&self) -> Self::Data;

    /// Argument names sent to the server, in declaration order.
    fn request_arguments(&self) -> &[String] {
        &[]
    }

    fn resolve_route(&self, args: &QueryArguments) -> Result<String> {
        Ok(RouteTemplate::parse(self.route())?.resolve(args, self.request_arguments()))
    }

    /// Open a connection for `args` delivering envelopes to `callback`.
    ///
    /// Transport failures after this returns are handled by the connection
    /// (reconnect, abandon) and never surface here.
    async fn subscribe(
        &self,
        callback: OnNextResult<Self::Data>,
        args: QueryArguments,
    ) -> Result<ObservableQuerySubscription>;
}

/// Stock descriptor: one WebSocket per subscription at the resolved route.
pub struct RoutedQuery<T> {
    context: Arc<LinkContext>,
    template: RouteTemplate,
    default_value: T,
    request_arguments: Vec<String>,
}

impl<T> RoutedQuery<T> {
    pub fn new(context: Arc<LinkContext>, route: &str, default_value: T) -> Result<Self> {
        Ok(Self {
            context,
            template: RouteTemplate::parse(route)?,
            default_value,
            request_arguments: Vec::new(),
        })
    }

    /// Declare the argument names this query sends.
    pub fn with_arguments<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request_arguments = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }
}

impl<T: Clone> Clone for RoutedQuery<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            template: self.template.clone(),
            default_value: self.default_value.clone(),
            request_arguments: self.request_arguments.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RoutedQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedQuery")
            .field("route", &self.template.as_str())
            .field("request_arguments", &self.request_arguments)
            .field("default_value", &self.default_value)
            .finish()
    }
}

#[async_trait]
impl<T> ObservableQueryFor for RoutedQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Data = T;

    fn route(&self) -> &str {
        self.template.as_str()
    }

    fn default_value(&self) -> T {
        self.default_value.clone()
    }

    fn request_arguments(&self) -> &[String] {
        &self.request_arguments
    }

    fn resolve_route(&self, args: &QueryArguments) -> Result<String> {
        Ok(self.template.resolve(args, &self.request_arguments))
    }

    async fn subscribe(
        &self,
        callback: OnNextResult<T>,
        args: QueryArguments,
    ) -> Result<ObservableQuerySubscription> {
        let route = self.resolve_route(&args)?;
        log::debug!("[observable-link] Subscribing to '{}'", route);

        let connection = ObservableQueryConnection::<T>::new(route, self.context.clone())
            .with_fallback(self.default_value.clone());
        connection.connect(callback);
        Ok(ObservableQuerySubscription::new(connection))
    }
}
