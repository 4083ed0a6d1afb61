pub mod api;
pub mod columns;
pub mod config;
pub mod dates;
pub mod error;
pub mod estimation;
pub mod forecast;
pub mod imputation;
pub mod insights;
pub mod state;
