fn main() {
    println!("Run `cargo test -p routing-compat` to execute end-to-end routing tests.");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use hubroute_discovery::HubDiscovery;
    use hubroute_protocol::{
        Method, MessageCallback, Protocol, PubSubOptions, PubSubTransport, RequestExecutor,
        RequestSpec, Response, TransportError,
    };
    use hubroute_router::{HubSettings, PubSubRouter, TransportRouter};
    use hubroute_secure::{ClaimBinding, KeyManager};

    const HUB_ID: &str = "hub-1";
    const HUB_ADDRESS: &str = "192.168.1.20";
    const KEY_HEX: &str = "a1b2c3d4e5f6";
    const API_KEY: &str = "project-api-key";

    fn secure_settings() -> HubSettings {
        HubSettings::from_value(json!({
            "timeout": 200,
            "hub": {
                "id": HUB_ID,
                "address": HUB_ADDRESS,
                "security": {"requestEncrypted": true, "responseEncrypted": true},
                "keyMaterial": KEY_HEX
            }
        }))
        .unwrap()
    }

    fn hub_target() -> hubroute_protocol::HubTarget {
        secure_settings().hub.clone().unwrap()
    }

    /// Plays both targets of a routed call: the local leg behaves like a
    /// real hub agent holding the shared key material, the remote leg
    /// like the cloud. The hub decrypts the credential and body it
    /// receives and seals its answer under the request's own claims, so
    /// a passing test exercises the full envelope pipeline on both
    /// sides of the wire.
    struct HubAndCloud {
        keys: KeyManager,
        reachable: bool,
        calls: Mutex<Vec<RequestSpec>>,
    }

    impl HubAndCloud {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                keys: KeyManager::with_defaults(),
                reachable,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn remote_calls(&self) -> Vec<RequestSpec> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.api_url.is_none())
                .cloned()
                .collect()
        }

        async fn answer_as_hub(&self, spec: &RequestSpec) -> Result<Response, TransportError> {
            let key = self
                .keys
                .session_key(&hub_target())
                .await
                .expect("hub holds the shared key material");

            // The credential must arrive encrypted, never in the clear.
            assert_ne!(spec.authorization, API_KEY);
            let credential_binding =
                ClaimBinding::new(self.keys.principal(API_KEY), HUB_ID, "auth");
            let credential = self
                .keys
                .decrypt_payload(&key, &spec.authorization, &credential_binding)
                .expect("credential envelope opens under the shared key");
            assert_eq!(credential, json!(API_KEY));

            let binding =
                ClaimBinding::new(self.keys.principal(API_KEY), HUB_ID, spec.path());
            let body = match &spec.body {
                Some(serde_json::Value::String(opaque)) => Some(
                    self.keys
                        .decrypt_payload(&key, opaque, &binding)
                        .expect("request envelope opens under the shared key"),
                ),
                Some(other) => panic!("hub received a plaintext body: {other}"),
                None => None,
            };

            let answer = json!({"handled": spec.path(), "echo": body});
            let sealed = self
                .keys
                .encrypt_payload(&key, answer, &binding)
                .expect("hub can seal its answer");
            Ok(Response::new(200, Some(serde_json::Value::String(sealed))))
        }
    }

    #[async_trait]
    impl RequestExecutor for HubAndCloud {
        async fn execute(&self, spec: &RequestSpec) -> Result<Response, TransportError> {
            self.calls.lock().unwrap().push(spec.clone());
            match &spec.api_url {
                Some(_) if self.reachable => self.answer_as_hub(spec).await,
                Some(_) => Err(TransportError::Connectivity("connection refused".into())),
                None => Ok(Response::new(
                    200,
                    Some(json!({"from": "cloud", "url": spec.url})),
                )),
            }
        }
    }

    #[tokio::test]
    async fn secure_call_round_trips_through_the_hub() {
        let wire = HubAndCloud::new(true);
        let router = TransportRouter::new(
            secure_settings(),
            wire.clone(),
            Arc::new(KeyManager::with_defaults()),
        )
        .unwrap();

        let mut spec = RequestSpec::new("/thngs/123/properties", Method::Put, API_KEY);
        spec.body = Some(json!([{"key": "color", "value": "red"}]));

        let resp = router.execute(spec).await.unwrap();
        assert_eq!(resp.status, 200);
        let body = resp.body.unwrap();
        assert_eq!(body["handled"], "/thngs/123/properties");
        assert_eq!(body["echo"], json!([{"key": "color", "value": "red"}]));
        assert!(wire.remote_calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_hub_falls_back_with_plaintext_call() {
        let wire = HubAndCloud::new(false);
        let router = TransportRouter::new(
            secure_settings(),
            wire.clone(),
            Arc::new(KeyManager::with_defaults()),
        )
        .unwrap();

        let mut spec = RequestSpec::new("/thngs/123/properties", Method::Put, API_KEY);
        spec.body = Some(json!([{"key": "color", "value": "red"}]));

        let resp = router.execute(spec.clone()).await.unwrap();
        assert_eq!(resp.body.unwrap()["from"], "cloud");

        // Exactly one remote call, with the original credential and
        // body, never the hub-encrypted forms.
        let remote = wire.remote_calls();
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0].authorization, API_KEY);
        assert_eq!(remote[0].body, spec.body);
        assert_eq!(remote[0].timeout, None);
    }

    /// Minimal broker: one shared endpoint, captured subscriptions,
    /// recorded publishes.
    struct Broker {
        endpoint: Mutex<String>,
        published: Mutex<Vec<(String, String, serde_json::Value)>>,
        subscribers: Mutex<Vec<(String, MessageCallback)>>,
    }

    impl Broker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                endpoint: Mutex::new("mqtts://mqtt.cloud.example:8883/mqtt".into()),
                published: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PubSubTransport for Broker {
        async fn endpoint(&self) -> String {
            self.endpoint.lock().unwrap().clone()
        }

        async fn set_endpoint(&self, url: &str) {
            *self.endpoint.lock().unwrap() = url.to_string();
        }

        async fn subscribe(
            &self,
            resource: &str,
            callback: MessageCallback,
            _options: &PubSubOptions,
        ) -> Result<(), TransportError> {
            self.subscribers
                .lock()
                .unwrap()
                .push((resource.to_string(), callback));
            Ok(())
        }

        async fn publish(
            &self,
            resource: &str,
            message: serde_json::Value,
            options: &PubSubOptions,
        ) -> Result<(), TransportError> {
            self.published.lock().unwrap().push((
                self.endpoint.lock().unwrap().clone(),
                format!("{resource}|{}", options.authorization),
                message,
            ));
            Ok(())
        }
    }

    #[tokio::test]
    async fn published_message_is_sealed_for_the_hub() {
        let broker = Broker::new();
        let hub_keys = KeyManager::with_defaults();
        let router = PubSubRouter::new(
            secure_settings(),
            Some(broker.clone()),
            Arc::new(KeyManager::with_defaults()),
            Protocol::Mqtt,
        )
        .unwrap();

        let message = json!({"key": "color", "value": "blue"});
        router
            .publish(
                "/thngs/123/properties",
                message.clone(),
                &PubSubOptions::new(API_KEY),
            )
            .await
            .unwrap();

        let published = broker.published.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        let (endpoint, _, wire_message) = &published[0];
        // Sent through the hub's own broker endpoint, then restored.
        assert_eq!(endpoint, &format!("mqtt://{HUB_ADDRESS}:4001/mqtt"));
        assert_eq!(
            broker.endpoint().await,
            "mqtts://mqtt.cloud.example:8883/mqtt"
        );

        // The hub side can open what went over the wire.
        let serde_json::Value::String(opaque) = wire_message else {
            panic!("message left the router in plaintext");
        };
        let key = hub_keys.session_key(&hub_target()).await.unwrap();
        let binding = ClaimBinding::new(
            hub_keys.principal(API_KEY),
            HUB_ID,
            "/thngs/123/properties",
        );
        let opened = hub_keys.decrypt_payload(&key, opaque, &binding).unwrap();
        assert_eq!(opened, message);
    }

    #[tokio::test]
    async fn subscription_delivers_hub_sealed_messages_as_plaintext() {
        let broker = Broker::new();
        let hub_keys = KeyManager::with_defaults();
        let router = PubSubRouter::new(
            secure_settings(),
            Some(broker.clone()),
            Arc::new(KeyManager::with_defaults()),
            Protocol::Mqtt,
        )
        .unwrap();

        let received: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let callback: MessageCallback = Arc::new(move |msg| sink.lock().unwrap().push(msg));
        router
            .subscribe(
                "/thngs/123/properties",
                callback,
                &PubSubOptions::new(API_KEY),
            )
            .await
            .unwrap();

        let (_, wire_callback) = broker.subscribers.lock().unwrap().pop().unwrap();

        // The hub seals outbound updates under the inbound binding.
        let key = hub_keys.session_key(&hub_target()).await.unwrap();
        let binding = ClaimBinding::new(
            HUB_ID,
            hub_keys.principal(API_KEY),
            "/thngs/123/properties",
        );
        let sealed = hub_keys
            .encrypt_payload(&key, json!({"value": 42}), &binding)
            .unwrap();
        wire_callback(serde_json::Value::String(sealed));

        // A tampered message never reaches the subscriber.
        wire_callback(serde_json::Value::String("garbage".into()));

        assert_eq!(received.lock().unwrap().clone(), vec![json!({"value": 42})]);
    }

    #[tokio::test]
    async fn discovered_hub_drives_local_routing() {
        struct DiscoveryCloud;

        #[async_trait]
        impl RequestExecutor for DiscoveryCloud {
            async fn execute(&self, spec: &RequestSpec) -> Result<Response, TransportError> {
                let body = if spec.url.starts_with("/collections?") {
                    json!([{"id": "dist-1"}])
                } else {
                    json!([{
                        "id": HUB_ID,
                        "properties": {"connected": true},
                        "customFields": {
                            "address": HUB_ADDRESS,
                            "security": {"requestEncrypted": true, "responseEncrypted": true},
                            "key": KEY_HEX
                        }
                    }])
                };
                Ok(Response::new(200, Some(body)))
            }
        }

        let hubs = HubDiscovery::new(Arc::new(DiscoveryCloud))
            .list_connected_hubs(API_KEY)
            .await
            .unwrap();
        assert_eq!(hubs.len(), 1);

        let mut settings = HubSettings {
            timeout: Duration::from_millis(200),
            ..HubSettings::default()
        };
        settings.hub = Some(hubs.into_iter().next().unwrap());

        let wire = HubAndCloud::new(true);
        let router = TransportRouter::new(
            settings,
            wire.clone(),
            Arc::new(KeyManager::with_defaults()),
        )
        .unwrap();

        let resp = router
            .execute(RequestSpec::new("/thngs/123", Method::Get, API_KEY))
            .await
            .unwrap();
        assert_eq!(resp.body.unwrap()["handled"], "/thngs/123");

        // The local leg targeted the discovered address.
        let calls = wire.calls.lock().unwrap().clone();
        assert_eq!(
            calls[0].api_url.as_deref(),
            Some(&*format!("http://{HUB_ADDRESS}:8787"))
        );
    }
}
