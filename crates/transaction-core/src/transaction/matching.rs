//! Matching of inbound messages to transactions
//! ([RFC 3261 Section 17.1.3 and 17.2.3](https://datatracker.ietf.org/doc/html/rfc3261#section-17.2.3))
//!
//! Requests whose top Via branch carries the magic cookie are matched by
//! branch, sent-by and method. Older requests fall back to comparing the
//! dialog identifiers, the CSeq and the request-URI. In both cases an ACK
//! may match an INVITE transaction it was not sent within: the ACK for a
//! 2xx carries a branch of its own, so it is recognised by the To-tag the
//! transaction put into its reply.

use sigcore_sip_core::{Message, Method, RAck};

use super::{Transaction, TransactionState, TransactionType};

/// `true` if the request `msg` belongs to the server transaction `t`
pub fn match_request(t: &Transaction, msg: &Message) -> bool {
    if t.kind != TransactionType::Uas || !msg.is_request() {
        return false;
    }
    if msg.via1.has_magic_cookie() {
        match_by_branch(t, msg)
    } else {
        match_legacy(t, msg)
    }
}

/// `true` if the reply `msg` belongs to the client transaction `t`
pub fn match_reply(t: &Transaction, msg: &Message) -> bool {
    t.kind == TransactionType::Uac
        && msg.is_reply()
        && msg.via1.has_magic_cookie()
        && t.request.via1.branch == msg.via1.branch
        && t.request.cseq.num_str == msg.cseq.num_str
        && t.request.cseq.method_str == msg.cseq.method_str
}

/// `true` if the PRACK `msg` with RAck `rack` acknowledges the reliable
/// provisional reply pending on the INVITE server transaction `t`
/// (RFC 3262 Section 3)
pub fn match_prack(t: &Transaction, msg: &Message, rack: &RAck) -> bool {
    t.kind == TransactionType::Uas
        && t.state == TransactionState::ProceedingRel
        && t.last_rseq != 0
        && rack.rseq == t.last_rseq
        && rack.cseq == t.request.cseq.num
        && rack.method == *t.request.method()
        && t.request.call_id == msg.call_id
        && t.request.from.tag == msg.from.tag
        && msg.to.tag.is_some()
        && msg.to.tag == t.to_tag
}

fn is_ack_for_invite(t: &Transaction, msg: &Message) -> bool {
    *msg.method() == Method::Ack && t.is_invite()
}

fn match_by_branch(t: &Transaction, msg: &Message) -> bool {
    if t.request.method() == msg.method() {
        return same_branch(t, msg);
    }
    // ACK for a non-2xx final reply shares the INVITE's branch
    is_ack_for_invite(t, msg) && (same_branch(t, msg) || match_2xx_ack(t, msg))
}

/// Branch, sent-by host and sent-by port of the top Via are equal
fn same_branch(t: &Transaction, msg: &Message) -> bool {
    let (ours, theirs) = (&t.request.via1, &msg.via1);
    ours.branch_suffix().is_some()
        && ours.branch_suffix() == theirs.branch_suffix()
        && ours.host.as_bytes().eq_ignore_ascii_case(theirs.host.as_bytes())
        && ours.port_str == theirs.port_str
}

fn match_2xx_ack(t: &Transaction, msg: &Message) -> bool {
    let Some(to_tag) = t.to_tag.as_ref() else {
        return false;
    };
    msg.to.tag.as_ref() == Some(to_tag)
        && t.request.from.tag == msg.from.tag
        && t.request.call_id == msg.call_id
        && t.request.cseq.num == msg.cseq.num
}

fn match_legacy(t: &Transaction, msg: &Message) -> bool {
    let ack = is_ack_for_invite(t, msg);
    if t.request.method() != msg.method() && !ack {
        return false;
    }
    if t.request.from.tag != msg.from.tag
        || t.request.call_id != msg.call_id
        || t.request.cseq.num_str != msg.cseq.num_str
    {
        return false;
    }

    if ack {
        // the ACK carries the tag of the reply, not of the request
        if t.to_tag.as_ref() != msg.to.tag.as_ref() {
            return false;
        }
        if t.reply_status < 300 {
            // 2xx ACK may be sent to the Contact
            return true;
        }
    } else if t.request.to.tag != msg.to.tag {
        return false;
    }

    match (t.request.request_uri(), msg.request_uri()) {
        (Some(ours), Some(theirs)) => ours.as_span() == theirs.as_span(),
        _ => false,
    }
}
