// Data models for upstream and gateway payloads

pub mod classroom;
pub mod responses;
