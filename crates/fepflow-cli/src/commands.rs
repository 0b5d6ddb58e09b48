pub mod fetch;
pub mod plan;
pub mod run;
