pub mod comparator;
pub mod excel;
