// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The polling loop of one device instance.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, StoreError};
use crate::event::{EventBus, InstanceEvents, PollEvent};
use crate::profile::ProfileRegistry;
use crate::reconcile::{Applied, Reconciler};
use crate::tree::{HistorySink, NodeHandle, ObjectStore};
use crate::unsupported::UnsupportedAddresses;

use super::{DynSource, InstanceStatus, PollerConfig, ValueSource};

/// Outcome of one completed polling cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of values produced by the sources.
    pub values: usize,
    /// Nodes touched while reconciling.
    pub applied: Applied,
    /// Addresses that failed during this cycle and are skipped from now on.
    pub newly_unsupported: Vec<u16>,
    /// When the cycle finished.
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    /// Returns the number of nodes created by the cycle.
    #[must_use]
    pub fn created(&self) -> usize {
        self.applied.created().count()
    }
}

struct SourceSlot {
    source: Box<dyn DynSource>,
    offset: i32,
}

/// Runs polling cycles for one device instance.
///
/// Each cycle reads every source in order, reconciles each source's values
/// below the instance container at the source's position offset, and
/// persists addresses that failed. Cycles never overlap: [`run`](Self::run)
/// waits for a cycle to finish before the next tick is serviced.
///
/// Sources of different types can be mixed, e.g. a [`RegisterSource`]
/// for device information and a `JsonHttpSource` for values.
///
/// [`RegisterSource`]: super::RegisterSource
pub struct Poller {
    store: Arc<dyn ObjectStore>,
    profiles: Arc<ProfileRegistry>,
    history: Option<Arc<dyn HistorySink>>,
    instance: NodeHandle,
    config: PollerConfig,
    sources: Vec<SourceSlot>,
    status: watch::Sender<InstanceStatus>,
    events: EventBus,
}

impl Poller {
    /// Creates a poller reconciling `source` below `instance`.
    ///
    /// The source's values start at the configured position offset.
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        profiles: Arc<ProfileRegistry>,
        instance: NodeHandle,
        config: PollerConfig,
        source: impl ValueSource + Send + 'static,
    ) -> Self {
        let offset = config.position_offset();
        let (status, _) = watch::channel(InstanceStatus::Creating);
        Self {
            store,
            profiles,
            history: None,
            instance,
            config,
            sources: vec![SourceSlot {
                source: Box::new(source),
                offset,
            }],
            status,
            events: EventBus::new(),
        }
    }

    /// Adds another source whose values start at `offset`.
    ///
    /// All sources share the instance's unsupported address list.
    #[must_use]
    pub fn with_source(mut self, source: impl ValueSource + Send + 'static, offset: i32) -> Self {
        self.sources.push(SourceSlot {
            source: Box::new(source),
            offset,
        });
        self
    }

    /// Sets the sink enabling history logging on archived variables.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    /// Publishes events on `events` instead of a private bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Returns the instance container.
    #[must_use]
    pub fn instance(&self) -> NodeHandle {
        self.instance
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> InstanceStatus {
        *self.status.borrow()
    }

    /// Creates a receiver notified on every status change.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<InstanceStatus> {
        self.status.subscribe()
    }

    /// Subscribes to this poller's events.
    ///
    /// Events other pollers publish on a shared bus are not received.
    #[must_use]
    pub fn subscribe(&self) -> InstanceEvents {
        self.events.subscribe_instance(self.instance)
    }

    fn set_status(&self, status: InstanceStatus, error: Option<String>) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            tracing::debug!(instance = %self.instance, status = %status, "Instance status changed");
            self.events.publish(PollEvent::StatusChanged {
                instance: self.instance,
                status,
                error,
            });
        }
    }

    /// Clears the persisted unsupported address list.
    ///
    /// This is the only way a failed address is ever read again.
    ///
    /// # Errors
    ///
    /// Returns a store error if the instance does not exist.
    pub fn reset_unsupported(&self) -> Result<(), StoreError> {
        let mut unsupported = UnsupportedAddresses::load(self.store.as_ref(), self.instance)?;
        unsupported.reset();
        unsupported.save(self.store.as_ref(), self.instance)?;
        tracing::info!(instance = %self.instance, "Unsupported addresses reset");
        Ok(())
    }

    fn persist_failures(
        &self,
        unsupported: &mut UnsupportedAddresses,
    ) -> Result<Vec<u16>, StoreError> {
        let added = unsupported.commit();
        if !added.is_empty() {
            unsupported.save(self.store.as_ref(), self.instance)?;
            tracing::warn!(
                instance = %self.instance,
                addresses = ?added,
                "Addresses marked unsupported"
            );
            self.events.publish(PollEvent::AddressesMarkedUnsupported {
                instance: self.instance,
                addresses: added.clone(),
            });
        }
        Ok(added)
    }

    /// Runs one read → decode → reconcile cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid; status becomes
    ///   [`InstanceStatus::ConfigInvalid`] and nothing is read
    /// - [`Error::Transport`] if a source cannot be read; status becomes
    ///   [`InstanceStatus::Unreachable`] and nothing is reconciled
    /// - [`Error::Store`] if the object store rejects an operation; addresses
    ///   that failed during the cycle are still persisted and the status
    ///   becomes [`InstanceStatus::Active`], since the device answered
    pub async fn run_once(&mut self) -> Result<CycleReport, Error> {
        if let Err(e) = self.config.validate() {
            tracing::warn!(instance = %self.instance, error = %e, "Invalid configuration");
            self.set_status(InstanceStatus::ConfigInvalid, Some(e.to_string()));
            return Err(e.into());
        }

        let mut unsupported = UnsupportedAddresses::load(self.store.as_ref(), self.instance)?;
        let read_timeout = self.config.read_timeout();

        let mut batches = Vec::with_capacity(self.sources.len());
        let mut failure = None;
        for slot in &mut self.sources {
            match slot.source.fetch_boxed(read_timeout, &mut unsupported).await {
                Ok(values) => batches.push((values, slot.offset, slot.source.source_hints())),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = failure {
            tracing::warn!(instance = %self.instance, error = %e, "Device unreachable");
            self.persist_failures(&mut unsupported)?;
            self.set_status(InstanceStatus::Unreachable, Some(e.to_string()));
            return Err(e.into());
        }

        let mut reconciler = Reconciler::new(self.store.as_ref(), &self.profiles);
        if let Some(history) = &self.history {
            reconciler = reconciler.with_history(history.as_ref());
        }

        let mut applied = Applied::default();
        let mut values = 0;
        let mut rejected = None;
        for (batch, offset, hints) in &batches {
            let mut config = self.config.reconcile().clone();
            for hint in hints {
                config.apply_hint(&hint.name, hint.profile.as_deref(), hint.archived);
            }
            values += batch.len();
            match reconciler.reconcile(self.instance, batch, *offset, &config) {
                Ok(batch_applied) => applied.extend(batch_applied),
                Err(e) => {
                    rejected = Some(e);
                    break;
                }
            }
        }

        // Failed addresses are kept even if the store rejected a write.
        let newly_unsupported = self.persist_failures(&mut unsupported)?;
        self.set_status(InstanceStatus::Active, None);

        if let Some(e) = rejected {
            tracing::warn!(instance = %self.instance, error = %e, "Reconciliation failed");
            return Err(e.into());
        }

        let report = CycleReport {
            values,
            applied,
            newly_unsupported,
            finished_at: Utc::now(),
        };
        tracing::info!(
            instance = %self.instance,
            values = report.values,
            created = report.created(),
            "Cycle completed"
        );
        self.events.publish(PollEvent::CycleCompleted {
            instance: self.instance,
            values: report.values,
            created: report.created(),
            finished_at: report.finished_at,
        });
        Ok(report)
    }

    /// Runs cycles on the configured interval until `shutdown` turns `true`.
    ///
    /// The first cycle starts immediately. Cycle errors are reflected in the
    /// status and do not stop the loop; the next tick is the retry. On
    /// return the status is [`InstanceStatus::Inactive`].
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        tracing::debug!(instance = %self.instance, error = %e, "Cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_status(InstanceStatus::Inactive, None);
        tracing::info!(instance = %self.instance, "Polling stopped");
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("instance", &self.instance)
            .field("config", &self.config)
            .field("sources", &self.sources.len())
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::profile::ProfileDefinition;
    use crate::tree::{MemoryStore, ProfileStore, VariableType};
    use crate::value::{NamedValueMap, Value};

    struct Fixed(Result<NamedValueMap, String>);

    impl ValueSource for Fixed {
        async fn fetch(
            &mut self,
            _read_timeout: Duration,
            _unsupported: &mut UnsupportedAddresses,
        ) -> Result<NamedValueMap, TransportError> {
            self.0.clone().map_err(TransportError::ConnectionFailed)
        }
    }

    fn poller(source: Fixed) -> (Arc<MemoryStore>, Poller) {
        let store = Arc::new(MemoryStore::new());
        let instance = store.create_container(NodeHandle::ROOT, "instance").unwrap();
        let poller = Poller::new(
            store.clone(),
            Arc::new(ProfileRegistry::new()),
            instance,
            PollerConfig::new("Test"),
            source,
        );
        (store, poller)
    }

    #[tokio::test]
    async fn successful_cycle_activates_instance() {
        let (store, mut poller) = poller(Fixed(Ok(NamedValueMap::new().with("a", 1))));
        assert_eq!(poller.status(), InstanceStatus::Creating);

        let report = poller.run_once().await.unwrap();

        assert_eq!(report.values, 1);
        assert_eq!(report.created(), 1);
        assert_eq!(poller.status(), InstanceStatus::Active);
        assert_eq!(store.children(poller.instance()).len(), 1);
    }

    #[tokio::test]
    async fn transport_error_marks_unreachable() {
        let (store, mut poller) = poller(Fixed(Err("refused".into())));
        let mut events = poller.subscribe();

        let err = poller.run_once().await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(poller.status(), InstanceStatus::Unreachable);
        assert!(store.children(poller.instance()).is_empty());

        let PollEvent::StatusChanged { status, error, .. } = events.recv().await.unwrap() else {
            panic!("expected status change");
        };
        assert_eq!(status, InstanceStatus::Unreachable);
        assert!(error.unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn invalid_config_reads_nothing() {
        let store = Arc::new(MemoryStore::new());
        let mut poller = Poller::new(
            store,
            Arc::new(ProfileRegistry::new()),
            NodeHandle::ROOT,
            PollerConfig::new("bad namespace"),
            Fixed(Ok(NamedValueMap::new().with("a", 1))),
        );

        let err = poller.run_once().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(poller.status(), InstanceStatus::ConfigInvalid);
        assert_eq!(poller.status().code(), 201);
    }

    #[tokio::test]
    async fn status_watch_sees_changes() {
        let (_store, mut poller) = poller(Fixed(Ok(NamedValueMap::new())));
        let mut rx = poller.watch_status();

        poller.run_once().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), InstanceStatus::Active);
    }

    #[tokio::test]
    async fn second_source_uses_its_offset() {
        let (store, poller) = poller(Fixed(Ok(NamedValueMap::new().with("Serial", "123"))));
        let mut poller = poller.with_source(Fixed(Ok(NamedValueMap::new().with("Power", 1.5))), 1);

        poller.run_once().await.unwrap();

        let children = store.children(poller.instance());
        assert_eq!(children[0].name, "Serial");
        assert_eq!(children[1].name, "Power");
        assert_eq!(children[1].position, 1);
    }

    #[tokio::test]
    async fn shared_bus_keeps_instances_apart() {
        let bus = EventBus::new();
        let (store, first) = poller(Fixed(Ok(NamedValueMap::new().with("a", 1))));
        let mut first = first.with_event_bus(bus.clone());
        let other = store.create_container(NodeHandle::ROOT, "other").unwrap();
        let mut second = Poller::new(
            store.clone(),
            Arc::new(ProfileRegistry::new()),
            other,
            PollerConfig::new("Test"),
            Fixed(Ok(NamedValueMap::new().with("b", 2))),
        )
        .with_event_bus(bus.clone());
        let mut all = bus.subscribe();
        let mut only_first = first.subscribe();

        second.run_once().await.unwrap();
        first.run_once().await.unwrap();

        let mut seen = 0;
        while let Ok(event) = only_first.try_recv() {
            assert_eq!(event.instance(), first.instance());
            seen += 1;
        }
        assert_eq!(seen, 2);

        let mut total = 0;
        while all.try_recv().is_ok() {
            total += 1;
        }
        assert_eq!(total, 4);
    }

    /// Marks address 2 as failed and answers anyway.
    struct Marking;

    impl ValueSource for Marking {
        async fn fetch(
            &mut self,
            _read_timeout: Duration,
            unsupported: &mut UnsupportedAddresses,
        ) -> Result<NamedValueMap, TransportError> {
            unsupported.mark_unsupported(2);
            Ok(NamedValueMap::new().with("Power", 1.5))
        }
    }

    #[tokio::test]
    async fn sources_of_different_types_mix() {
        let (store, poller) = poller(Fixed(Ok(NamedValueMap::new().with("Serial", "123"))));
        let mut poller = poller.with_source(Marking, 1);

        let report = poller.run_once().await.unwrap();

        assert_eq!(report.values, 2);
        assert_eq!(report.newly_unsupported, [2]);
        let names: Vec<_> = store
            .children(poller.instance())
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, ["Serial", "Power"]);
    }

    /// A memory store that refuses every value write.
    struct RejectingValues(MemoryStore);

    impl ProfileStore for RejectingValues {
        fn profile_exists(&self, id: &str) -> bool {
            self.0.profile_exists(id)
        }

        fn create_profile(&self, definition: &ProfileDefinition) -> Result<(), StoreError> {
            self.0.create_profile(definition)
        }
    }

    impl ObjectStore for RejectingValues {
        fn find_child(
            &self,
            parent: NodeHandle,
            ident: &str,
        ) -> Result<Option<NodeHandle>, StoreError> {
            self.0.find_child(parent, ident)
        }

        fn find_link(
            &self,
            parent: NodeHandle,
            target: NodeHandle,
        ) -> Result<Option<NodeHandle>, StoreError> {
            self.0.find_link(parent, target)
        }

        fn is_container(&self, handle: NodeHandle) -> Result<bool, StoreError> {
            self.0.is_container(handle)
        }

        fn create_container(
            &self,
            parent: NodeHandle,
            ident: &str,
        ) -> Result<NodeHandle, StoreError> {
            self.0.create_container(parent, ident)
        }

        fn create_variable(
            &self,
            parent: NodeHandle,
            ident: &str,
            value_type: VariableType,
        ) -> Result<NodeHandle, StoreError> {
            self.0.create_variable(parent, ident, value_type)
        }

        fn create_link(
            &self,
            parent: NodeHandle,
            target: NodeHandle,
        ) -> Result<NodeHandle, StoreError> {
            self.0.create_link(parent, target)
        }

        fn set_name(&self, handle: NodeHandle, name: &str) -> Result<(), StoreError> {
            self.0.set_name(handle, name)
        }

        fn set_position(&self, handle: NodeHandle, position: i32) -> Result<(), StoreError> {
            self.0.set_position(handle, position)
        }

        fn set_icon(&self, handle: NodeHandle, icon: &str) -> Result<(), StoreError> {
            self.0.set_icon(handle, icon)
        }

        fn set_hidden(&self, handle: NodeHandle, hidden: bool) -> Result<(), StoreError> {
            self.0.set_hidden(handle, hidden)
        }

        fn set_profile(&self, handle: NodeHandle, profile: &str) -> Result<(), StoreError> {
            self.0.set_profile(handle, profile)
        }

        fn set_value(&self, handle: NodeHandle, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::WrongKind {
                handle,
                expected: "variable",
            })
        }

        fn property(&self, handle: NodeHandle, key: &str) -> Result<Option<String>, StoreError> {
            self.0.property(handle, key)
        }

        fn set_property(
            &self,
            handle: NodeHandle,
            key: &str,
            value: String,
        ) -> Result<(), StoreError> {
            self.0.set_property(handle, key, value)
        }
    }

    #[tokio::test]
    async fn store_rejection_still_persists_failed_addresses() {
        let store = Arc::new(RejectingValues(MemoryStore::new()));
        let instance = store.0.create_container(NodeHandle::ROOT, "instance").unwrap();
        let mut poller = Poller::new(
            store.clone(),
            Arc::new(ProfileRegistry::new()),
            instance,
            PollerConfig::new("Test"),
            Marking,
        );

        let err = poller.run_once().await.unwrap_err();

        assert!(matches!(err, Error::Store(StoreError::WrongKind { .. })));
        assert_eq!(
            store.0.property(instance, crate::unsupported::PROPERTY_KEY).unwrap().as_deref(),
            Some("[2]")
        );
        assert_eq!(poller.status(), InstanceStatus::Active);

        // The persisted list is honoured on the next cycle.
        let mut events = poller.subscribe();
        poller.run_once().await.unwrap_err();
        assert!(events.try_recv().is_err());
    }
}
