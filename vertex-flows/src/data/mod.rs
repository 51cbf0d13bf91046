pub mod loader;
pub mod types;

pub use loader::{load_bars, load_chain, parse_bars, parse_chain, LoaderError, RawOptionRecord};
pub use types::{
    AnnotatedContract, Greeks, OptionContract, OptionType, OptionsChain, PriceBar, Timeframe,
};
