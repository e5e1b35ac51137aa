pub mod migrate;
pub mod openapi;
pub mod routes;
pub mod serve;
