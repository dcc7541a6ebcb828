pub use anstream::eprintln;
pub use anstream::println;
pub use color_eyre::eyre::Result;
