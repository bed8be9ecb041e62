pub mod config;
pub mod extract;
pub mod http_client;
pub mod load;
pub mod match_record;
pub mod page;
pub mod pipeline;
pub mod season;
pub mod staging;
pub mod store;
