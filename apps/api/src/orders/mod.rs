// Order intake and lifecycle persistence.
// Status changes go through `OrderStore::transition` so the graph in
// `models::order::OrderStatus` is enforced at the storage boundary.

pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod store;
pub mod validation;
