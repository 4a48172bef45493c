pub mod sniff;
pub mod storage;
pub mod units;
