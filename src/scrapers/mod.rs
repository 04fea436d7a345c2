pub mod ocr;
pub mod slip_parser;
