pub mod dto;
pub mod ports;
pub mod services;

#[cfg(test)]
pub mod testing;
