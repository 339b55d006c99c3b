// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for reconciling named values into a memory store.

use std::collections::HashSet;

use polltree::profile::ProfileRegistry;
use polltree::reconcile::{LinkTarget, ReconcileConfig, Reconciler};
use polltree::tree::{MemoryStore, NodeHandle, ObjectStore};
use polltree::value::{NamedValueMap, Value};

fn variable_count(store: &MemoryStore) -> usize {
    store.snapshot().iter().filter(|n| n.is_variable()).count()
}

// ============================================================================
// Tree Shape Tests
// ============================================================================

mod shape {
    use super::*;

    #[test]
    fn two_cycles_update_in_place() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("SMA");

        let first = NamedValueMap::new()
            .with("Temperature", 21.5)
            .with("Power Today", 3.2);
        let second = NamedValueMap::new()
            .with("Temperature", 21.5)
            .with("Power Today", 4.1);

        let created = reconciler
            .reconcile(NodeHandle::ROOT, &first, 0, &config)
            .unwrap();
        assert_eq!(created.created().count(), 2);

        let updated = reconciler
            .reconcile(NodeHandle::ROOT, &second, 0, &config)
            .unwrap();
        assert_eq!(updated.created().count(), 0);

        let leaves = store.children(NodeHandle::ROOT);
        assert_eq!(leaves.len(), 2);

        assert_eq!(leaves[0].name, "Temperature");
        assert_eq!(leaves[0].ident.as_deref(), Some("SMA_Temperature"));
        assert_eq!(leaves[0].position, 0);
        assert_eq!(leaves[0].value(), Some(&Value::Float(21.5)));

        assert_eq!(leaves[1].name, "Power Today");
        assert_eq!(leaves[1].ident.as_deref(), Some("SMA_Power_Today"));
        assert_eq!(leaves[1].position, 1);
        assert_eq!(leaves[1].value(), Some(&Value::Float(4.1)));
    }

    #[test]
    fn repeated_reconciliation_is_idempotent() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("UniFi").with_profile("Latency", "Latency");

        let mut wan = NamedValueMap::new();
        wan.insert("Latency", 12);
        wan.insert("WAN IP", "1.2.3.4");
        let values = NamedValueMap::new().with("Clients", 7).with_group("WAN", wan);

        reconciler.reconcile(NodeHandle::ROOT, &values, 0, &config).unwrap();
        let before = store.snapshot();

        for _ in 0..3 {
            reconciler.reconcile(NodeHandle::ROOT, &values, 0, &config).unwrap();
        }

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.profile_count(), 1);
    }

    #[test]
    fn at_most_one_node_per_identifier() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("Test");

        // "A-B", "A B" and "A:B" all sanitize to the same identifier.
        let values = NamedValueMap::new()
            .with("A-B", 1)
            .with("A B", 2)
            .with("A:B", 3);

        let applied = reconciler
            .reconcile(NodeHandle::ROOT, &values, 0, &config)
            .unwrap();

        assert_eq!(applied.collisions.len(), 2);
        assert_eq!(variable_count(&store), 1);

        let mut seen = HashSet::new();
        for node in store.children(NodeHandle::ROOT) {
            assert!(seen.insert(node.ident.clone()), "duplicate {:?}", node.ident);
        }
        let node = store.find_child(NodeHandle::ROOT, "Test_A_B").unwrap().unwrap();
        assert_eq!(store.node(node).unwrap().value(), Some(&Value::Int(3)));
    }

    #[test]
    fn groups_become_containers() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("Netatmo");

        let outdoor = NamedValueMap::new().with("Temperature", 4.5).with("Humidity", 81);
        let values = NamedValueMap::new()
            .with("Station", "Home")
            .with_group("Outdoor", outdoor);

        reconciler.reconcile(NodeHandle::ROOT, &values, 10, &config).unwrap();

        let top = store.children(NodeHandle::ROOT);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].position, 10);
        assert!(top[1].is_container());
        assert_eq!(top[1].position, 11);

        let nested = store.children(top[1].handle);
        let positions: Vec<_> = nested.iter().map(|n| (n.name.as_str(), n.position)).collect();
        assert_eq!(positions, [("Temperature", 0), ("Humidity", 1)]);
    }

    #[test]
    fn group_turned_value_keeps_container_and_rest_of_batch() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("Cam");

        let first = NamedValueMap::new()
            .with_group("camera", NamedValueMap::new().with("alim", "on"))
            .with("temp", 1.0);
        let second = NamedValueMap::new().with("camera", "off").with("temp", 2.0);

        reconciler.reconcile(NodeHandle::ROOT, &first, 0, &config).unwrap();
        let applied = reconciler
            .reconcile(NodeHandle::ROOT, &second, 0, &config)
            .unwrap();

        assert_eq!(applied.collisions.len(), 1);
        assert!(applied.collisions[0].skipped);
        assert_eq!(applied.collisions[0].ident, "Cam_camera");

        let camera = store.find_child(NodeHandle::ROOT, "Cam_camera").unwrap().unwrap();
        assert!(store.node(camera).unwrap().is_container());
        assert_eq!(store.children(camera).len(), 1);

        let temp = store.find_child(NodeHandle::ROOT, "Cam_temp").unwrap().unwrap();
        assert_eq!(store.node(temp).unwrap().value(), Some(&Value::Float(2.0)));
    }
}

// ============================================================================
// Identity Tests
// ============================================================================

mod identity {
    use super::*;

    #[test]
    fn handles_survive_value_and_order_changes() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("SMA");

        let first = reconciler
            .reconcile(
                NodeHandle::ROOT,
                &NamedValueMap::new().with("Power", 1500).with("Voltage", 230.1),
                0,
                &config,
            )
            .unwrap();
        let second = reconciler
            .reconcile(
                NodeHandle::ROOT,
                &NamedValueMap::new().with("Voltage", 229.8).with("Power", 0),
                0,
                &config,
            )
            .unwrap();

        assert_eq!(first.handle("Power"), second.handle("Power"));
        assert_eq!(first.handle("Voltage"), second.handle("Voltage"));

        let power = store.node(second.handle("Power").unwrap()).unwrap();
        assert_eq!(power.position, 1);
        assert_eq!(power.value(), Some(&Value::Int(0)));
    }

    #[test]
    fn manual_rename_is_kept() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("SMA");
        let values = NamedValueMap::new().with("Power", 1500);

        let applied = reconciler.reconcile(NodeHandle::ROOT, &values, 0, &config).unwrap();
        let handle = applied.handle("Power").unwrap();
        store.set_name(handle, "Inverter output").unwrap();

        reconciler.reconcile(NodeHandle::ROOT, &values, 0, &config).unwrap();
        assert_eq!(store.node(handle).unwrap().name, "Inverter output");
    }

    #[test]
    fn explicit_identifier_keeps_node_across_renames() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("UniFi");

        let mut first = NamedValueMap::new();
        first.insert_with_ident("aa:bb:cc:dd:ee:ff", "Phone", true);
        let mut second = NamedValueMap::new();
        second.insert_with_ident("aa:bb:cc:dd:ee:ff", "Phone (Alice)", false);

        let a = reconciler.reconcile(NodeHandle::ROOT, &first, 0, &config).unwrap();
        let b = reconciler.reconcile(NodeHandle::ROOT, &second, 0, &config).unwrap();

        assert_eq!(a.handle("Phone"), b.handle("Phone (Alice)"));
        let node = store.node(b.handle("Phone (Alice)").unwrap()).unwrap();
        assert_eq!(node.ident.as_deref(), Some("UniFi_aa_bb_cc_dd_ee_ff"));
        assert_eq!(node.name, "Phone (Alice)");
        assert_eq!(node.value(), Some(&Value::Bool(false)));
    }

    #[test]
    fn separate_parents_do_not_share_nodes() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("SMA");
        let first = store.create_container(NodeHandle::ROOT, "inverter_1").unwrap();
        let second = store.create_container(NodeHandle::ROOT, "inverter_2").unwrap();
        let values = NamedValueMap::new().with("Power", 1500);

        reconciler.reconcile(first, &values, 0, &config).unwrap();
        reconciler.reconcile(second, &values, 0, &config).unwrap();

        assert_eq!(variable_count(&store), 2);
        assert_ne!(
            store.find_child(first, "SMA_Power").unwrap(),
            store.find_child(second, "SMA_Power").unwrap()
        );
    }
}

// ============================================================================
// Link Tests
// ============================================================================

mod links {
    use super::*;

    #[test]
    fn overview_links_follow_targets() {
        let store = MemoryStore::new();
        let profiles = ProfileRegistry::new();
        let reconciler = Reconciler::new(&store, &profiles);
        let config = ReconcileConfig::new("Netatmo");

        let values = NamedValueMap::new().with("Battery", 80).with("Signal", 3);
        let applied = reconciler.reconcile(NodeHandle::ROOT, &values, 0, &config).unwrap();
        let overview = reconciler
            .upsert_container(NodeHandle::ROOT, "Overview", Some("Database"), 10, &config)
            .unwrap();

        let targets = [
            LinkTarget::new(applied.handle("Battery").unwrap(), "Battery"),
            LinkTarget::new(applied.handle("Signal").unwrap(), "Signal").hidden(),
        ];
        let first = reconciler.reconcile_links(overview.handle, &targets, 0).unwrap();
        let second = reconciler.reconcile_links(overview.handle, &targets, 0).unwrap();

        assert_eq!(first.created().count(), 2);
        assert_eq!(second.created().count(), 0);

        let links = store.children(overview.handle);
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|n| n.is_link()));
        assert!(links[1].hidden);
        assert_eq!(links[0].link_target(), applied.handle("Battery"));
    }
}
