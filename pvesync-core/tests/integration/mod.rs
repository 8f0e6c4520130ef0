mod extract_tests;
mod pipeline_tests;
mod reconcile_tests;
