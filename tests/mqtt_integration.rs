// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT path using mockforge-mqtt.

use std::time::Duration;

use http_lightbulb::protocol::{
    InboundMessage, MqttClient, MqttClientBuilder, MqttTopic, MqttTransport,
};
use http_lightbulb::{Characteristic, ColorMode, ConnectedLightbulb, LightbulbConfig};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18850);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

async fn connect_client(port: u16) -> (MqttClient, mpsc::Receiver<InboundMessage>) {
    MqttClientBuilder::new()
        .broker(format!("mqtt://127.0.0.1:{port}"))
        .subscribe(MqttTopic::new("lamp/power"), Characteristic::On)
        .build()
        .await
        .unwrap()
}

// ============================================================================
// MqttClient Tests
// ============================================================================

mod mqtt_client {
    use super::*;

    #[tokio::test]
    async fn connect_and_publish() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (client, _inbound) = connect_client(port).await;
        let result = client
            .publish(&MqttTopic::new("lamp/power/set"), "true".to_string())
            .await;
        assert!(result.is_ok(), "Failed to publish: {:?}", result.err());
    }

    #[tokio::test]
    async fn publish_with_qos_and_retain() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let (client, _inbound) = connect_client(port).await;
        let topic = MqttTopic::new("lamp/hue/set").with_qos(1).with_retain(true);
        assert!(client.publish(&topic, "180".to_string()).await.is_ok());
        assert!(client.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn connect_with_tcp_scheme_and_options() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let result = MqttClientBuilder::new()
            .broker(format!("tcp://127.0.0.1:{port}"))
            .client_id("lightbulb_test")
            .keep_alive(Duration::from_secs(10))
            .subscribe(MqttTopic::new("lamp/brightness"), Characteristic::Brightness)
            .build()
            .await;
        assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
    }

    #[tokio::test]
    async fn client_reconnects_when_broker_comes_up_late() {
        let port = get_test_port();

        // Nothing listens yet: the first connection attempts fail
        let (client, _inbound) = connect_client(port).await;
        start_mock_broker(port).await;

        // More messages than the request queue holds, so they only all go
        // through once the connection task has reconnected
        let publishes = async {
            for i in 0..25 {
                client
                    .publish(&MqttTopic::new("lamp/brightness/set"), i.to_string())
                    .await?;
            }
            Ok::<_, http_lightbulb::TransportError>(())
        };
        let result = timeout(Duration::from_secs(15), publishes).await;
        assert!(matches!(result, Ok(Ok(()))), "publishes stalled: {result:?}");
    }

    #[tokio::test]
    async fn build_missing_broker_fails() {
        let result = MqttClientBuilder::new()
            .subscribe(MqttTopic::new("lamp/power"), Characteristic::On)
            .build()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn build_invalid_port_fails() {
        let result = MqttClientBuilder::new()
            .broker("mqtt://127.0.0.1:notaport")
            .build()
            .await;
        assert!(result.is_err());
    }
}

// ============================================================================
// Connected accessory
// ============================================================================

mod connected_accessory {
    use super::*;

    fn mqtt_config(port: u16) -> http_lightbulb::ResolvedConfig {
        LightbulbConfig::from_json(&format!(
            r#"{{
                "name": "MQTT lamp",
                "setPowerTopic": "lamp/power/set",
                "getPowerTopic": "lamp/power",
                "hue": {{
                    "setTopic": "lamp/hue/set",
                    "getTopic": "lamp/hue",
                    "unit": "zigbee"
                }},
                "mqtt": {{ "host": "127.0.0.1", "port": {port} }}
            }}"#
        ))
        .unwrap()
        .resolve()
        .unwrap()
    }

    #[tokio::test]
    async fn mqtt_driven_power_is_served_from_state() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let lamp = ConnectedLightbulb::connect(mqtt_config(port)).await.unwrap();

        lamp.set_power(true).await.unwrap();
        // No status endpoint: reads never leave the process
        assert!(lamp.get_power().await.unwrap());
    }

    #[tokio::test]
    async fn mqtt_driven_hue_write_selects_color_mode() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let lamp = ConnectedLightbulb::connect(mqtt_config(port)).await.unwrap();

        lamp.set_value(Characteristic::Hue, 180.0).await.unwrap();
        assert_eq!(lamp.color_mode(), ColorMode::Color);
        let hue = lamp.get_value(Characteristic::Hue).await.unwrap();
        assert!((hue - 180.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn connect_without_broker_options_uses_http_only() {
        let config = LightbulbConfig::from_json(
            r#"{
                "name": "HTTP lamp",
                "onUrl": "http://127.0.0.1:9/on",
                "offUrl": "http://127.0.0.1:9/off",
                "statusUrl": "http://127.0.0.1:9/status",
                "statusCache": -1
            }"#,
        )
        .unwrap()
        .resolve()
        .unwrap();

        let lamp = ConnectedLightbulb::connect(config).await.unwrap();
        assert!(!lamp.get_power().await.unwrap());
    }
}

// NOTE: The mockforge-mqtt broker doesn't fully support pub/sub message
// forwarding between clients. Inbound get-topic handling is covered by the
// reconciler unit tests in src/accessory/reconcile.rs.
