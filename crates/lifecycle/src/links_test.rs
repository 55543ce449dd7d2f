//! Unit tests for MAC link management

#[cfg(test)]
mod tests {
    use crate::LifecycleError;
    use crate::test_utils::*;
    use node_store::NodeStatus;

    #[tokio::test]
    async fn test_owner_adds_and_lists_macs_in_creation_order() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("alice"));
        let links = h.service.links();

        links.add_mac("node-a", "00:00:00:00:00:0B", &alice()).await.unwrap();
        links.add_mac("node-a", "00:00:00:00:00:0a", &alice()).await.unwrap();

        let listed = links.list_macs("node-a", &alice()).await.unwrap();
        let macs: Vec<&str> = listed.iter().map(|l| l.mac_address.as_str()).collect();
        assert_eq!(macs, vec!["00:00:00:00:00:0b", "00:00:00:00:00:0a"]);
        assert!(listed.iter().all(|l| l.system_id == "node-a"));
    }

    #[tokio::test]
    async fn test_mac_unique_across_fleet() {
        let h = harness();
        h.seed_with_macs("node-a", NodeStatus::Ready, &["aa:bb:cc:dd:ee:ff"])
            .await;
        h.seed("node-b", NodeStatus::Ready, None);

        let result = h
            .service
            .links()
            .add_mac("node-b", "AA:BB:CC:DD:EE:FF", &admin())
            .await;
        match result {
            Err(LifecycleError::ValidationError(msg)) => {
                assert_eq!(msg, "Mac address aa:bb:cc:dd:ee:ff already in use.")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_mac_rejected() {
        let h = harness();
        h.seed("node-a", NodeStatus::Ready, None);
        let links = h.service.links();
        assert!(matches!(
            links.add_mac("node-a", "00:11:22", &admin()).await,
            Err(LifecycleError::ValidationError(_))
        ));
        assert!(matches!(
            links.remove_mac("node-a", "nope", &admin()).await,
            Err(LifecycleError::ValidationError(_))
        ));
        assert!(matches!(
            links.get_mac("node-a", "nope", &admin()).await,
            Err(LifecycleError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_rights_required() {
        let h = harness();
        h.seed("node-a", NodeStatus::Allocated, Some("alice"));
        let result = h
            .service
            .links()
            .add_mac("node-a", "00:11:22:33:44:55", &bob())
            .await;
        assert!(matches!(result, Err(LifecycleError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_remove_and_get() {
        let h = harness();
        h.seed_with_macs("node-a", NodeStatus::Ready, &["00:11:22:33:44:55"])
            .await;
        h.seed_with_macs("node-b", NodeStatus::Ready, &["66:77:88:99:aa:bb"])
            .await;
        let links = h.service.links();

        let link = links
            .get_mac("node-a", "00-11-22-33-44-55", &alice())
            .await
            .unwrap();
        assert_eq!(link.system_id, "node-a");
        assert!(matches!(
            links.get_mac("node-a", "66:77:88:99:aa:bb", &alice()).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(matches!(
            links.remove_mac("node-a", "66:77:88:99:aa:bb", &admin()).await,
            Err(LifecycleError::NotFound(_))
        ));

        links
            .remove_mac("node-a", "00:11:22:33:44:55", &admin())
            .await
            .unwrap();
        assert!(links.list_macs("node-a", &admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let h = harness();
        let result = h.service.links().list_macs("node-missing", &admin()).await;
        assert!(matches!(result, Err(LifecycleError::NotFound(_))));
    }
}
