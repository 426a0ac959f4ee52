//! Identifier and confirmation-code generation.
//!
//! The codes are short shared secrets, not cryptographic material. They are only ever compared against a single
//! task's own columns, so cross-task uniqueness is not required; what matters is that neither the seller nor the
//! courier can predict the other party's code.

use rand::{thread_rng, Rng};

use crate::db_types::{OrderId, TaskId};

const PICKUP_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PICKUP_CODE_LEN: usize = 6;

/// Pre-allocates an order id so the gateway handshake can reference it before anything is persisted.
pub fn new_order_id() -> OrderId {
    let n: u128 = thread_rng().gen();
    OrderId(format!("ord-{n:032x}"))
}

pub fn new_task_id() -> TaskId {
    let n: u128 = thread_rng().gen();
    TaskId(format!("task-{n:032x}"))
}

/// A 6-character uppercase alphanumeric code, displayed as a QR at the seller's premises.
pub fn new_pickup_code() -> String {
    let mut rng = thread_rng();
    (0..PICKUP_CODE_LEN).map(|_| PICKUP_CHARSET[rng.gen_range(0..PICKUP_CHARSET.len())] as char).collect()
}

/// A 6-digit numeric code the buyer reads out (or shows) to the courier at handoff.
pub fn new_delivery_code() -> String {
    thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pickup_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..100 {
            let code = new_pickup_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| PICKUP_CHARSET.contains(&b)));
        }
    }

    #[test]
    fn delivery_codes_are_six_digits() {
        for _ in 0..100 {
            let code = new_delivery_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn ids_carry_their_prefix() {
        assert!(new_order_id().as_str().starts_with("ord-"));
        assert!(new_task_id().as_str().starts_with("task-"));
    }
}
