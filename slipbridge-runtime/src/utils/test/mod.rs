
pub use self::harness::*;
pub use self::packet_collectors::*;
pub use self::packet_generators::*;
