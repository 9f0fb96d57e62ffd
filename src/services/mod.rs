// Address management
pub mod addresses;

// Geographic reference data
pub mod regions;

pub use addresses::{AddressInput, AddressOption, AddressService};
pub use regions::RegionService;
