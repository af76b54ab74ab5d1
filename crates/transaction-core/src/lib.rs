//! SIP transaction layer
//!
//! This crate implements the client and server transaction state machines
//! of RFC 3261 Section 17 over an unreliable transport: request and reply
//! retransmission, matching of inbound messages to transactions, the ACK
//! for non-2xx final replies and the transaction timers.
//!
//! The pieces, bottom up:
//!
//! * [`timer`]: a hierarchical timing wheel and a tokio task ticking it
//! * [`transaction`]: the transaction record, the bucketed
//!   [`TransactionTable`] and the matching rules
//! * [`TransactionLayer`]: the state machines, fed by a transport and
//!   reporting to a [`TransactionUser`]
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sigcore_sip_transport::bind_udp;
//! use sigcore_transaction_core::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let (transport, events) = bind_udp("0.0.0.0:5060".parse()?).await?;
//! let (user, mut rx) = ChannelUser::new();
//! let (layer, wheel) = TransactionLayer::new(
//!     TransactionConfig::default(),
//!     Arc::new(transport),
//!     Arc::new(user),
//! )?;
//! let driver = layer.start(wheel);
//! tokio::spawn(layer.clone().process_transport_events(events));
//!
//! while let Some(event) = rx.recv().await {
//!     if let TransactionEvent::Request { transaction: Some(id), request } = event {
//!         if !matches!(request.method(), Method::Ack) {
//!             layer.send_reply(id, ReplyBuilder::new(200, "OK"))?;
//!         }
//!     }
//! }
//! driver.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod layer;
pub mod logging;
pub mod timer;
pub mod transaction;
pub mod user;

pub use config::{TimerSettings, TransactionConfig};
pub use error::{Error, Result};
pub use layer::TransactionLayer;
pub use transaction::{
    TimerPayload, Transaction, TransactionId, TransactionState, TransactionTable, TransactionType,
};
pub use user::{ChannelUser, TimeoutKind, TransactionEvent, TransactionUser};

/// Re-export of common types
pub mod prelude {
    pub use crate::config::{TimerSettings, TransactionConfig};
    pub use crate::error::{Error, Result};
    pub use crate::layer::TransactionLayer;
    pub use crate::logging::{setup_logging, LoggingConfig};
    pub use crate::timer::{TimerDriver, TimerKind, TimerWheel};
    pub use crate::transaction::{TransactionId, TransactionState, TransactionType};
    pub use crate::user::{ChannelUser, TimeoutKind, TransactionEvent, TransactionUser};
    pub use sigcore_sip_core::builder::{ReplyBuilder, RequestBuilder};
    pub use sigcore_sip_core::{Message, Method};
}
