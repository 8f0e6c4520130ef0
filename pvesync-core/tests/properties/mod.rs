mod filter_tests;
mod parse_tests;
