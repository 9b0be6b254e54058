// External surfaces: wire DTOs and the JSON-lines API server.

pub mod dto;
pub mod server;
