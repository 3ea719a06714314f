//! Request/response data transfer objects

pub mod payment;
pub mod purchase;
