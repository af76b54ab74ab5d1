use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{thread_rng, Rng};
use uuid::Uuid;

use crate::message::Message;

/// Random branch value, to be prefixed with the magic cookie
pub fn generate_branch() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Random From/To tag
pub fn generate_tag() -> String {
    format!("{:08x}", thread_rng().gen::<u32>())
}

/// Globally unique Call-ID
pub fn generate_call_id(host: &str) -> String {
    format!("{}@{host}", Uuid::new_v4().simple())
}

/// To-tag for a stateless reply.
///
/// Derived from the request alone, so a retransmission of the same request
/// is answered with the same tag.
pub fn stateless_to_tag(request: &Message) -> String {
    let mut hasher = DefaultHasher::new();
    request.call_id.hash(&mut hasher);
    request.from.tag.hash(&mut hasher);
    request.cseq.num_str.hash(&mut hasher);
    request.via1.branch.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}
