// Protocol engine interface - The collaborator probes use to talk to the target
//
// The engine itself (record layer, handshakes, cryptography) lives outside
// this crate. Probes describe what they want to send and receive as a
// `MessagePlan`; the engine reports which steps actually happened.

use crate::Result;
use crate::protocols::ProtocolVersion;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Handshake and record-layer messages a plan can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    ClientHello,
    ServerHello,
    HelloVerifyRequest,
    Certificate,
    ServerKeyExchange,
    ServerHelloDone,
    ClientKeyExchange,
    ChangeCipherSpec,
    Finished,
    NewSessionTicket,
    EncryptedExtensions,
    ApplicationData,
    Heartbeat,
    Alert,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One step of a message sequence plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStep {
    Send(MessageKind),
    Receive(MessageKind),
    /// Accept whatever the peer sends next
    ReceiveAny,
    ResetConnection,
}

/// Ordered list of steps the engine should attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePlan {
    steps: Vec<MessageStep>,
}

impl MessagePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(mut self, kind: MessageKind) -> Self {
        self.steps.push(MessageStep::Send(kind));
        self
    }

    pub fn receive(mut self, kind: MessageKind) -> Self {
        self.steps.push(MessageStep::Receive(kind));
        self
    }

    pub fn receive_any(mut self) -> Self {
        self.steps.push(MessageStep::ReceiveAny);
        self
    }

    pub fn reset_connection(mut self) -> Self {
        self.steps.push(MessageStep::ResetConnection);
        self
    }

    pub fn steps(&self) -> &[MessageStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Connection parameters for one engine execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub version: ProtocolVersion,
    /// IANA cipher suite value, None lets the engine offer its defaults
    pub cipher_suite: Option<u16>,
    pub sni_name: Option<String>,
    /// Extra time to wait for the peer on top of the engine default
    pub additional_timeout: Duration,
    /// Grow the timeout on every retry
    pub increasing_timeout: bool,
}

impl ProtocolConfig {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            cipher_suite: None,
            sni_name: None,
            additional_timeout: Duration::ZERO,
            increasing_timeout: false,
        }
    }

    pub fn with_cipher_suite(mut self, suite: u16) -> Self {
        self.cipher_suite = Some(suite);
        self
    }

    pub fn with_sni_name(mut self, name: impl Into<String>) -> Self {
        self.sni_name = Some(name.into());
        self
    }
}

/// Transport state after the plan ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SocketState {
    Up,
    Closed,
    PeerWriteClosed,
    Timeout,
    IoException,
}

/// Message observed from the peer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub kind: MessageKind,
    /// Extra discriminator, e.g. the alert description
    pub detail: Option<String>,
}

impl ReceivedMessage {
    pub fn new(kind: MessageKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn alert(description: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Alert,
            detail: Some(description.into()),
        }
    }
}

/// What happened when the engine ran a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Number of plan steps that took place as planned
    pub executed_steps: usize,
    pub received: Vec<ReceivedMessage>,
    pub socket_state: SocketState,
}

impl ExecutionOutcome {
    pub fn executed_as_planned(&self, plan: &MessagePlan) -> bool {
        self.executed_steps >= plan.len()
    }

    pub fn did_receive(&self, kind: MessageKind) -> bool {
        self.received.iter().any(|m| m.kind == kind)
    }

    pub fn last_received(&self) -> Option<&ReceivedMessage> {
        self.received.last()
    }
}

/// External protocol engine consumed by probe run operations
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    async fn execute(&self, config: &ProtocolConfig, plan: &MessagePlan) -> Result<ExecutionOutcome>;
}
