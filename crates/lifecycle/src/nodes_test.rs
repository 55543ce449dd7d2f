//! Unit tests for node reads, updates, listings and deletion

#[cfg(test)]
mod tests {
    use crate::test_utils::*;
    use crate::{Actor, LifecycleError, NodeQuery, NodeUpdate};
    use node_store::{MacAddress, NodeStatus, NodeStore};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_get_respects_visibility() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("bob"));
        h.seed("node-b", NodeStatus::Ready, None);
        let nodes = h.service.nodes();

        assert!(matches!(
            nodes.get("node-a", &alice()).await,
            Err(LifecycleError::PermissionDenied(_))
        ));
        assert_eq!(nodes.get("node-a", &bob()).await.unwrap().system_id, "node-a");
        assert_eq!(nodes.get("node-b", &alice()).await.unwrap().system_id, "node-b");
        assert!(matches!(
            nodes.get("node-z", &admin()).await,
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_owner_updates_descriptive_fields_only() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("alice"));

        let updated = h
            .service
            .nodes()
            .update(
                "node-a",
                NodeUpdate {
                    hostname: Some("web-1".to_string()),
                    netboot: Some(false),
                    ..Default::default()
                },
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(updated.hostname, "web-1");
        assert!(!updated.netboot);
        assert_eq!(updated.status, NodeStatus::Allocated);
        assert_eq!(updated.owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_power_settings_need_admin() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("alice"));
        let mut params = BTreeMap::new();
        params.insert("power_address".to_string(), "10.0.0.7".to_string());
        let update = NodeUpdate {
            power_type: Some("ipmi".to_string()),
            power_parameters: Some(params.clone()),
            ..Default::default()
        };

        assert!(matches!(
            h.service.nodes().update("node-a", update.clone(), &alice()).await,
            Err(LifecycleError::PermissionDenied(_))
        ));
        let updated = h
            .service
            .nodes()
            .update("node-a", update, &admin())
            .await
            .unwrap();
        assert_eq!(updated.power_type, "ipmi");
        assert_eq!(updated.power_parameters, params);
    }

    #[tokio::test]
    async fn test_update_validates_vocabulary() {
        let h = harness();
        h.seed("node-a", NodeStatus::Ready, None);
        let result = h
            .service
            .nodes()
            .update(
                "node-a",
                NodeUpdate {
                    architecture: Some("vax".to_string()),
                    ..Default::default()
                },
                &admin(),
            )
            .await;
        assert!(matches!(result, Err(LifecycleError::ValidationError(_))));
        assert_eq!(h.record("node-a").await.architecture, "amd64");
    }

    #[tokio::test]
    async fn test_delete_is_admin_only_and_drops_links() {
        let h = harness();
        h.seed_with_macs("node-a", NodeStatus::Ready, &["00:11:22:33:44:55"])
            .await;

        assert!(matches!(
            h.service.nodes().delete("node-a", &alice()).await,
            Err(LifecycleError::PermissionDenied(_))
        ));
        h.service.nodes().delete("node-a", &admin()).await.unwrap();

        assert!(h.store.get("node-a").await.unwrap().is_none());
        let mac = MacAddress::parse("00:11:22:33:44:55").unwrap();
        assert!(h.store.find_mac(&mac).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_visibility_ids_and_macs() {
        let h = harness();
        h.seed_with_macs("node-a", NodeStatus::Ready, &["00:00:00:00:00:0a"])
            .await;
        h.seed_with_macs("node-b", NodeStatus::Ready, &["00:00:00:00:00:0b"])
            .await;
        h.seed("node-c", NodeStatus::Allocated, Some("bob"));
        h.seed("node-d", NodeStatus::Allocated, Some("alice"));
        let nodes = h.service.nodes();

        let visible: Vec<String> = nodes
            .list(&alice(), &NodeQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.system_id)
            .collect();
        assert_eq!(visible.len(), 3);
        assert!(!visible.contains(&"node-c".to_string()));

        let by_mac = nodes
            .list(
                &admin(),
                &NodeQuery {
                    mac_addresses: Some(vec!["00-00-00-00-00-0B".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_mac.len(), 1);
        assert_eq!(by_mac[0].system_id, "node-b");

        let by_id = nodes
            .list(
                &admin(),
                &NodeQuery {
                    ids: Some(vec!["node-c".to_string(), "node-x".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);

        assert!(matches!(
            nodes
                .list(
                    &admin(),
                    &NodeQuery {
                        mac_addresses: Some(vec!["bogus".to_string()]),
                        ..Default::default()
                    },
                )
                .await,
            Err(LifecycleError::ValidationError(_))
        ));
        assert!(nodes.list(&Actor::anonymous(), &NodeQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_allocated() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("alice"));
        h.seed("node-b", NodeStatus::Allocated, Some("bob"));
        h.seed("node-c", NodeStatus::Reserved, Some("alice"));
        h.seed("node-d", NodeStatus::Ready, None);

        let mine = h
            .service
            .nodes()
            .list_allocated(&alice(), &NodeQuery::default())
            .await
            .unwrap();
        let ids: Vec<&str> = mine.iter().map(|n| n.system_id.as_str()).collect();
        assert_eq!(ids, vec!["node-a", "node-c"]);

        assert!(matches!(
            h.service
                .nodes()
                .list_allocated(&Actor::anonymous(), &NodeQuery::default())
                .await,
            Err(LifecycleError::PermissionDenied(_))
        ));
    }
}
