mod codes;

pub use codes::{new_delivery_code, new_order_id, new_pickup_code, new_task_id};
