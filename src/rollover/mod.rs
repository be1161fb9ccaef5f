pub mod archive;
pub mod audit;
pub mod clock;
pub mod config;
pub mod gate;
pub mod paths;
pub mod pipeline;
pub mod retention;
pub mod roller;
pub mod util;
pub mod warn;
