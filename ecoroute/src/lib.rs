pub mod pipeline;

pub use ecoroute_flow as flow;
pub use ecoroute_network as network;
pub use ecoroute_polyscip as polyscip;
