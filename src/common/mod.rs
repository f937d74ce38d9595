pub mod error;
pub mod logging;
pub mod net;

#[cfg(test)]
pub mod assertions;
