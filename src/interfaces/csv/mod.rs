//! CSV rendering for the list views.

pub mod report_writer;
