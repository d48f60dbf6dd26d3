pub mod assign;
pub mod decompose;
pub mod demand;
pub mod error;
pub mod evaluate;
pub mod flow;
pub mod problem;
pub mod route;
pub mod solution;
pub mod solver;
pub mod validate;
