pub mod octopus_consumption;
pub mod octopus_page;
pub mod octopus_rates;
pub mod point;
