pub mod active_state;
pub mod address;
pub mod country;
pub mod locality;
pub mod region;

pub use active_state::ActiveState;
pub use address::{AddressScopes, Entity as Address, Model as AddressModel};
pub use country::{Entity as Country, Model as CountryModel};
pub use locality::{Entity as Locality, Model as LocalityModel};
pub use region::{Entity as Region, Model as RegionModel};
