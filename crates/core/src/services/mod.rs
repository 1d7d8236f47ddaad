pub mod amortization;
pub mod family;
pub mod generator;
pub mod mutation;
