//! Bridge statistics pub/sub feed settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Settings of the pub/sub feed carrying bridge statistics.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct PubSub {
    /// Pub/sub service to subscribe to for bridge statistics.
    /// Statistics ingestion is disabled when empty.
    pub service: String,

    /// Pub/sub node carrying bridge statistics items.
    /// Defaults to `videobridge`.
    #[default(String::from("videobridge"))]
    pub node: String,

    /// Delay before the subscription request is issued at startup, giving
    /// hosts time to initialize. Defaults to `10s`.
    #[default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub subscription_delay: Duration,
}

#[cfg(test)]
mod pubsub_conf_specs {
    use std::{env, time::Duration};

    use serial_test::serial;

    use crate::conf::Conf;

    #[test]
    #[serial]
    fn overrides_defaults() {
        let default_conf = Conf::default();
        assert_eq!(default_conf.pubsub.node, "videobridge");

        env::set_var("FOCUS_PUBSUB__SERVICE", "pubsub.example.com");
        env::set_var("FOCUS_PUBSUB__NODE", "jvb-stats");
        env::set_var("FOCUS_PUBSUB__SUBSCRIPTION_DELAY", "1s");
        let env_conf = Conf::parse().unwrap();
        env::remove_var("FOCUS_PUBSUB__SERVICE");
        env::remove_var("FOCUS_PUBSUB__NODE");
        env::remove_var("FOCUS_PUBSUB__SUBSCRIPTION_DELAY");

        assert_eq!(env_conf.pubsub.service, "pubsub.example.com");
        assert_eq!(env_conf.pubsub.node, "jvb-stats");
        assert_eq!(
            env_conf.pubsub.subscription_delay,
            Duration::from_secs(1)
        );
    }
}
