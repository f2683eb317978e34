// Payment provider intake: signature verification, event parsing and the
// webhook handler. This is the only trust boundary of the order lifecycle.

pub mod event;
pub mod handlers;
pub mod signature;
