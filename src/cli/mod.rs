pub mod outputformatter;

pub use outputformatter::print_records;
