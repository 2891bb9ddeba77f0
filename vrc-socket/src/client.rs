//! Public event stream client.
//!
//! [`StreamClient`] dials once on construction, spawns the read loop, and
//! exposes subscription management and the close/wait lifecycle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use vrc_core::auth::CredentialSupplier;
use vrc_core::config::StreamConfig;
use vrc_core::constants::WILDCARD_EVENT;
use vrc_core::error::{VrcError, VrcResult};

use crate::backoff::Backoff;
use crate::dispatcher::Dispatcher;
use crate::error::StreamError;
use crate::events::{
    EventPayload, FriendActiveEvent, FriendAddEvent, FriendDeleteEvent, FriendLocationEvent,
    FriendOfflineEvent, FriendOnlineEvent, GroupAnnouncementEvent, GroupJoinedEvent, GroupLeftEvent,
    NotificationEvent, NotificationV2Event, RawEvent, UserUpdateEvent,
};
use crate::manager::{Connector, ReadLoop};
use crate::registry::{HandlerRegistry, SubscriptionHandle};
use crate::state::{ConnectionState, NoopObserver, StateCell, StreamObserver};

/// Configures and opens a [`StreamClient`].
pub struct StreamClientBuilder {
    config: StreamConfig,
    observer: Arc<dyn StreamObserver>,
}

impl StreamClientBuilder {
    /// Receive state changes and internally handled errors.
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch the session token, dial, and start the read loop.
    ///
    /// Fails if the token cannot be obtained or the first dial fails; the
    /// first dial is never retried.
    pub async fn connect<S>(self, supplier: &S) -> VrcResult<StreamClient>
    where
        S: CredentialSupplier + ?Sized,
    {
        let Self { config, observer } = self;
        config.validate()?;

        let token = match supplier.session_token() {
            Ok(token) if !token.trim().is_empty() => token,
            Ok(_) => return Err(VrcError::MissingCredential("empty session token".into())),
            Err(e @ VrcError::MissingCredential(_)) => return Err(e),
            Err(e) => return Err(VrcError::MissingCredential(e.to_string())),
        };

        let state = Arc::new(StateCell::new(ConnectionState::Connecting, observer.clone()));
        let connector = Connector::new(&config);
        let socket = connector.dial(&token).await.map_err(VrcError::from)?;
        state.set(ConnectionState::Connected);
        info!("stream connected to {}", config.endpoint);

        let registry = Arc::new(HandlerRegistry::new());
        let shutdown = CancellationToken::new();
        let read_loop = ReadLoop {
            connector,
            token,
            backoff: Backoff::from_config(&config),
            dispatcher: Dispatcher::new(registry.clone(), &config, observer, shutdown.clone()),
            state: state.clone(),
            shutdown: shutdown.clone(),
            policy: config.auth_failure_policy,
        };
        let task = tokio::spawn(read_loop.run(socket));

        Ok(StreamClient {
            registry,
            state,
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }
}

/// A running pipeline subscription.
///
/// Dropping the client cancels the read loop without waiting for it; call
/// [`close`](Self::close) for an orderly shutdown.
pub struct StreamClient {
    registry: Arc<HandlerRegistry>,
    state: Arc<StateCell>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    pub fn builder(config: StreamConfig) -> StreamClientBuilder {
        StreamClientBuilder {
            config,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Connect with `config` and no observer.
    pub async fn connect<S>(supplier: &S, config: StreamConfig) -> VrcResult<Self>
    where
        S: CredentialSupplier + ?Sized,
    {
        Self::builder(config).connect(supplier).await
    }

    /// Subscribe to every event tagged `tag`.
    pub fn on<F>(&self, tag: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&RawEvent) + Send + Sync + 'static,
    {
        self.registry.register(tag, Arc::new(handler))
    }

    /// Subscribe to every event regardless of tag.
    pub fn on_any<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&RawEvent) + Send + Sync + 'static,
    {
        self.on(WILDCARD_EVENT, handler)
    }

    /// Subscribe to `tag` and decode each payload as `T`.
    ///
    /// Payloads that do not decode are skipped for this subscription and
    /// reported to the observer.
    pub fn on_typed<T, F>(&self, tag: &str, handler: F) -> SubscriptionHandle
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let observer = self.state.observer().clone();
        self.on(tag, move |raw: &RawEvent| match raw.decode::<T>() {
            Ok(payload) => handler(payload),
            Err(e) => {
                debug!("skipping subscriber: {e}");
                observer.on_error(&StreamError::Decode(e));
            }
        })
    }

    /// Subscribe to the tag bound to payload type `T`.
    pub fn subscribe<T, F>(&self, handler: F) -> SubscriptionHandle
    where
        T: EventPayload,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_typed::<T, F>(T::EVENT_TYPE.as_str(), handler)
    }

    pub fn on_notification<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(NotificationEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_notification_v2<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(NotificationV2Event) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_online<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendOnlineEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_offline<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendOfflineEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_location<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendLocationEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_active<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendActiveEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_add<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendAddEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_friend_delete<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(FriendDeleteEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_user_update<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(UserUpdateEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_group_joined<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(GroupJoinedEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_group_left<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(GroupLeftEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    pub fn on_group_announcement<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(GroupAnnouncementEvent) + Send + Sync + 'static,
    {
        self.subscribe(handler)
    }

    /// Remove a subscription. Returns false if it was already removed.
    pub fn off(&self, handle: &SubscriptionHandle) -> bool {
        self.registry.unregister(handle)
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Watch channel of state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Stop reconnecting, close the socket, and wait for the read loop to exit.
    ///
    /// Safe to call more than once and from several tasks at the same time.
    pub async fn close(&self) {
        if !self.state().is_shutting_down() {
            self.state.set(ConnectionState::Closing);
        }
        self.shutdown.cancel();

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("read task failed: {e}");
                self.state.set(ConnectionState::Closed);
            }
        }
        self.wait().await;
    }

    /// Block until the client is closed, either by [`close`](Self::close) or
    /// because the stream gave up after a fatal dial error.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ConnectionState::Closed).await;
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
