mod helpers;

mod dispatch;
mod orders;
