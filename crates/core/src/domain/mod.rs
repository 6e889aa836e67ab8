pub mod matching;
pub mod platform;
pub mod pricing;
pub mod product;
pub mod report;
