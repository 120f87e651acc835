mod store;

pub use store::{BlackBox, SearchField, TableDump, WriteTxn};
