//! Event-type dispatch table.
//!
//! Maps a log's topic0 signature hash to the handler for that event type.

use std::collections::HashMap;

use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use alloy_primitives::B256;
use tracing::debug;

use crate::error::{IndexerError, IndexerResult};
use crate::events::{
    ApprovalEvent, EventContext, IKeepToken, TransferEvent, decode_approval_event,
    decode_transfer_event,
};
use crate::projector::{ProjectionOutcome, SupplySource, handle_approval, handle_transfer};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transfer,
    Approval,
}

impl EventKind {
    /// Whether the handler needs block and transaction context.
    pub fn needs_context(&self) -> bool {
        matches!(self, EventKind::Transfer)
    }
}

pub struct HandlerTable {
    handlers: HashMap<B256, EventKind>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Table with the Transfer and Approval handlers of the token contract.
    pub fn token_handlers() -> Self {
        let mut table = Self::new();
        table.register(IKeepToken::Transfer::SIGNATURE_HASH, EventKind::Transfer);
        table.register(IKeepToken::Approval::SIGNATURE_HASH, EventKind::Approval);
        table
    }

    pub fn register(&mut self, signature: B256, kind: EventKind) {
        self.handlers.insert(signature, kind);
    }

    /// Signature hashes to subscribe to.
    pub fn topics(&self) -> Vec<B256> {
        let mut topics: Vec<B256> = self.handlers.keys().copied().collect();
        topics.sort();
        topics
    }

    pub fn kind_of(&self, log: &Log) -> Option<EventKind> {
        log.topics()
            .first()
            .and_then(|topic| self.handlers.get(topic).copied())
    }

    /// Decode `log` and run its handler.
    ///
    /// Returns `Ok(None)` for unregistered topics and for handlers that do not
    /// project anything.
    pub async fn dispatch<S, Q>(
        &self,
        log: &Log,
        ctx: Option<&EventContext>,
        store: &S,
        supply: &Q,
    ) -> IndexerResult<Option<ProjectionOutcome>>
    where
        S: EntityStore + ?Sized,
        Q: SupplySource + ?Sized,
    {
        let Some(kind) = self.kind_of(log) else {
            debug!(topic = ?log.topics().first(), "No handler registered, skipping log");
            return Ok(None);
        };

        match kind {
            EventKind::Transfer => {
                let ctx = ctx.ok_or_else(|| {
                    IndexerError::Decode("Transfer log without transaction context".to_string())
                })?;
                let decoded = decode_transfer_event(log)?;
                let event = TransferEvent::new(&decoded, log.address(), ctx);
                handle_transfer(store, supply, &event).await.map(Some)
            }
            EventKind::Approval => {
                let decoded = decode_approval_event(log)?;
                handle_approval(&ApprovalEvent::new(&decoded, log.address()))?;
                Ok(None)
            }
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
