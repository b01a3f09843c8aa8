//! Test matrix: declarative axes, case descriptors and the generator that
//! expands one into the other.

pub mod axes;
pub mod case;
pub mod filter;
pub mod generator;

pub use axes::{
    BurstAxis, ClockPairAxis, ExplicitCase, MatrixAxes, SizePolicy, SpeedClass, StaticAxis,
};
pub use case::{case_id, format_frequency, ChannelConfig, ClockPair, TestCase};
pub use filter::CaseFilter;
pub use generator::MatrixGenerator;
