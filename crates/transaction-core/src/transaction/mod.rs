//! Transactions, the table holding them and the rules matching messages
//! to them
//!
//! A [`Transaction`] lives in exactly one bucket of the
//! [`TransactionTable`]; the bucket is chosen by hashing the Call-ID and
//! the CSeq number, so that a request, its retransmissions, its replies
//! and its ACK or CANCEL all land in the same bucket. Every access to a
//! transaction happens with its bucket locked.

mod matching;
mod table;
#[allow(clippy::module_inception)]
mod transaction;

pub use matching::{match_prack, match_reply, match_request};
pub use table::{Bucket, TransactionTable};
pub use transaction::{ArmedTimer, TimerPayload, Transaction};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque handle of a transaction, handed to the transaction user.
///
/// It names the owning bucket and a serial number unique for the lifetime
/// of the table. Its string form round-trips through [`FromStr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    pub bucket: u32,
    pub serial: u64,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.bucket, self.serial)
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidTransactionId(s.to_string());
        let (bucket, serial) = s.split_once(':').ok_or_else(invalid)?;
        Ok(TransactionId {
            bucket: u32::from_str_radix(bucket, 16).map_err(|_| invalid())?,
            serial: u64::from_str_radix(serial, 16).map_err(|_| invalid())?,
        })
    }
}

/// Client or server side of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Created by sending a request
    Uac,
    /// Created by receiving a request
    Uas,
}

/// State of a transaction (RFC 3261 Section 17).
///
/// Which states a transaction goes through depends on its type and on
/// whether its request is an INVITE:
///
/// ```text
/// UAC INVITE      Calling -> Proceeding -> Completed | Terminated200 -> Terminated
/// UAC non-INVITE  Trying -> Proceeding -> Completed -> Terminated
/// UAS INVITE      Proceeding -> Completed -> Confirmed -> Terminated
///                 Proceeding -> Terminated200 -> Terminated
///                 Proceeding <-> ProceedingRel (reliable 1xx, PRACK)
/// UAS non-INVITE  Trying -> Proceeding -> Completed -> Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    /// UAC INVITE sent, nothing received yet
    Calling,
    /// Non-INVITE request sent or received, no reply yet
    Trying,
    /// Provisional reply received (UAC) or sent (UAS)
    Proceeding,
    /// UAS INVITE: reliable provisional reply sent, retransmitted on
    /// Timer G until its PRACK arrives (RFC 3262)
    ProceedingRel,
    /// Final non-2xx reply received or sent; non-INVITE final reply
    Completed,
    /// UAS INVITE: ACK received for a non-2xx final reply
    Confirmed,
    /// INVITE answered with a 2xx, kept around to handle its ACK and
    /// retransmissions of the 2xx
    Terminated200,
    /// Finished; the transaction is about to be removed
    Terminated,
}

impl TransactionState {
    /// Initial state of a new transaction
    pub fn initial(kind: TransactionType, invite: bool) -> Self {
        match (kind, invite) {
            (TransactionType::Uac, true) => TransactionState::Calling,
            (TransactionType::Uas, true) => TransactionState::Proceeding,
            (_, false) => TransactionState::Trying,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, TransactionState::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_string_form() {
        let id = TransactionId {
            bucket: 0x3ff,
            serial: 42,
        };
        assert_eq!(id.to_string(), "3ff:2a");
        assert_eq!("3ff:2a".parse::<TransactionId>().unwrap(), id);
        assert!(matches!(
            "3ff".parse::<TransactionId>(),
            Err(Error::InvalidTransactionId(_))
        ));
        assert!(matches!(
            "zz:1".parse::<TransactionId>(),
            Err(Error::InvalidTransactionId(_))
        ));
    }

    #[test]
    fn test_initial_states() {
        assert_eq!(
            TransactionState::initial(TransactionType::Uac, true),
            TransactionState::Calling
        );
        assert_eq!(
            TransactionState::initial(TransactionType::Uas, true),
            TransactionState::Proceeding
        );
        assert_eq!(
            TransactionState::initial(TransactionType::Uac, false),
            TransactionState::Trying
        );
        assert_eq!(
            TransactionState::initial(TransactionType::Uas, false),
            TransactionState::Trying
        );
    }
}
