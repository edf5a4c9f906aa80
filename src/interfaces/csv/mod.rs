pub mod checkout_reader;
pub mod outcome_writer;
