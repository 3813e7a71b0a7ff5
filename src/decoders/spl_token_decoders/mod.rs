pub mod account;

pub use account::{TokenAccountRecord, decode_account};
