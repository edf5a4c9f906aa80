pub mod classifier;
pub mod notification;
pub mod operator;
pub mod order;
pub mod ports;
pub mod route;
pub mod session;
pub mod transaction;
