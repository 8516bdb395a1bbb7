//! MQTT client for remote blast triggers
//!
//! Connects to a broker and subscribes to a topic. Payloads are either JSON
//! `{"x": 10, "y": 20}` or any text command understood by
//! `command::parse_command` (`"10,20"`, `"random"`, `"reset"`, ...).

use crate::command::{parse_command, Command};
use crate::config::MqttConfig;
use crate::error::{BlastError, Result};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const CLIENT_ID: &str = "blastfield";

/// JSON format for fire messages
#[derive(Deserialize)]
struct FireMessage {
    x: i32,
    y: i32,
}

/// Turn one payload into a command
pub fn decode_payload(payload: &[u8]) -> Option<Command> {
    let text = std::str::from_utf8(payload).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(msg) = serde_json::from_str::<FireMessage>(text) {
        return Some(Command::Fire { x: msg.x, y: msg.y });
    }
    parse_command(text)
}

/// MQTT client that receives commands in a background thread
pub struct MqttClient {
    receiver: Receiver<Command>,
    _thread: thread::JoinHandle<()>,
}

impl MqttClient {
    /// Connect and subscribe. Fails immediately if the broker is unreachable.
    pub fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(CLIENT_ID, config.host.as_str(), config.port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut connection) = Client::new(options, 10);

        client
            .subscribe(config.topic.as_str(), QoS::AtMostOnce)
            .map_err(|e| {
                BlastError::Mqtt(format!("failed to subscribe to '{}': {}", config.topic, e))
            })?;

        // Poll once so an unreachable broker fails fast
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(BlastError::Mqtt(format!(
                    "failed to connect to {}:{} - {}",
                    config.host, config.port, e
                )));
            },
            None => {
                return Err(BlastError::Mqtt(format!(
                    "failed to connect to {}:{} - connection closed",
                    config.host, config.port
                )));
            },
        }

        let (sender, receiver) = mpsc::channel();
        let topic = config.topic.clone();

        let handle = thread::Builder::new()
            .name("blast-mqtt".into())
            .spawn(move || Self::message_loop(connection, sender, &topic))?;

        info!(host = %config.host, port = config.port, topic = %config.topic, "mqtt subscribed");

        Ok(Self {
            receiver,
            _thread: handle,
        })
    }

    fn message_loop(mut connection: rumqttc::Connection, sender: Sender<Command>, topic: &str) {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                    match decode_payload(&publish.payload) {
                        Some(cmd) => {
                            if sender.send(cmd).is_err() {
                                // Front-end gone
                                break;
                            }
                        },
                        None => debug!("ignoring undecodable mqtt payload"),
                    }
                },
                Ok(_) => {},
                Err(e) => {
                    // Keep iterating, the connection may recover
                    warn!(error = %e, "mqtt connection error");
                },
            }
        }
    }

    /// Get any pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_json_fire() {
        assert_eq!(
            decode_payload(br#"{"x": 12, "y": 34}"#),
            Some(Command::Fire { x: 12, y: 34 })
        );
    }

    #[test]
    fn test_decode_text_forms() {
        assert_eq!(decode_payload(b"7,8"), Some(Command::Fire { x: 7, y: 8 }));
        assert_eq!(decode_payload(b" reset \n"), Some(Command::Reset));
        assert_eq!(decode_payload(b""), None);
        assert_eq!(decode_payload(&[0xFF, 0xFE]), None);
    }
}
