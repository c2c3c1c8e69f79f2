// Relay: outbound email and push delivery, plus the new-application trigger.
// All outbound HTTP to mail and push providers goes through `email` and `push`.

pub mod email;
pub mod handlers;
pub mod push;
pub mod trigger;
